//! Partition resolution over the mutual reachability graph.
//!
//! Enumerates maximal cliques with an iterative Bron-Kerbosch (pivoting on
//! the candidate-richest vertex) and keeps the largest one: its members stay
//! active, everything outside it is marked for quarantine. Worst-case clique
//! enumeration is exponential, so a frame-expansion cutoff bounds each run;
//! hitting the cutoff yields no decision for the cycle instead of a partial
//! answer.

use tracing::{debug, warn};

use super::graph::ReachabilityGraph;

pub struct PartitionResolver {
    max_expansions: u64,
}

/// One suspended Bron-Kerbosch call.
///
/// `branches` is the fixed iteration set `P \ N(pivot)` captured at frame
/// creation; `candidates` and `excluded` mutate as branches complete, exactly
/// as the recursive formulation updates P and X after each inner call.
struct Frame {
    clique: Vec<usize>,
    candidates: Vec<usize>,
    excluded: Vec<usize>,
    branches: Vec<usize>,
    next: usize,
}

impl Frame {
    fn new(
        clique: Vec<usize>,
        candidates: Vec<usize>,
        excluded: Vec<usize>,
        graph: &ReachabilityGraph,
    ) -> Self {
        let pivot = candidates
            .iter()
            .chain(excluded.iter())
            .copied()
            .max_by_key(|&u| candidates.iter().filter(|&&w| graph.mutual(u, w)).count());
        let branches = match pivot {
            Some(u) => candidates
                .iter()
                .copied()
                .filter(|&v| !graph.mutual(u, v))
                .collect(),
            None => Vec::new(),
        };
        Self {
            clique,
            candidates,
            excluded,
            branches,
            next: 0,
        }
    }
}

impl PartitionResolver {
    pub fn new(max_expansions: u64) -> Self {
        Self { max_expansions }
    }

    /// Resolve the set of nodes allowed to keep running workloads.
    ///
    /// Returns `None` when there is nothing to decide: an empty node list, a
    /// graph with no mutual edges, a maximum clique smaller than two nodes
    /// (total disconnection), or an enumeration cutoff. The enforcer treats
    /// `None` as "touch nothing" - failing open is deliberate, since the
    /// alternative quarantines the entire cluster whenever the store goes
    /// stale.
    pub fn resolve(&self, graph: &ReachabilityGraph) -> Option<Vec<String>> {
        if graph.is_empty() {
            debug!("Empty node list, no partition decision");
            return None;
        }
        if graph.mutual_edge_count() == 0 {
            debug!("No mutual reachability edges, declining to quarantine");
            return None;
        }

        let cliques = self.enumerate_maximal_cliques(graph)?;
        let best = select_clique(cliques)?;
        if best.len() < 2 {
            debug!("Largest clique is a single node, declining to quarantine");
            return None;
        }

        Some(best.iter().map(|&i| graph.names()[i].clone()).collect())
    }

    /// Enumerate every maximal clique of the mutual graph, or `None` if the
    /// expansion cutoff fires first.
    ///
    /// The excluded set is threaded independently of the candidate set: a
    /// child receives `X intersect N(v)` from its parent's excluded set as it
    /// stood when the branch was taken, and `v` moves from P to X in the
    /// parent afterwards. Collapsing X into P would report some cliques twice
    /// and miss maximality checks entirely.
    pub fn enumerate_maximal_cliques(
        &self,
        graph: &ReachabilityGraph,
    ) -> Option<Vec<Vec<usize>>> {
        let n = graph.len();
        let mut cliques = Vec::new();
        let mut expansions: u64 = 0;
        let mut stack = vec![Frame::new(
            Vec::new(),
            (0..n).collect(),
            Vec::new(),
            graph,
        )];

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.branches.len() {
                stack.pop();
                continue;
            }
            let v = frame.branches[frame.next];
            frame.next += 1;

            expansions += 1;
            if expansions > self.max_expansions {
                warn!(
                    max_expansions = self.max_expansions,
                    "Clique enumeration cutoff reached, yielding no decision this cycle"
                );
                return None;
            }

            let child_candidates: Vec<usize> = frame
                .candidates
                .iter()
                .copied()
                .filter(|&u| graph.mutual(u, v))
                .collect();
            let child_excluded: Vec<usize> = frame
                .excluded
                .iter()
                .copied()
                .filter(|&u| graph.mutual(u, v))
                .collect();
            let mut child_clique = frame.clique.clone();
            child_clique.push(v);

            frame.candidates.retain(|&u| u != v);
            frame.excluded.push(v);

            if child_candidates.is_empty() && child_excluded.is_empty() {
                child_clique.sort_unstable();
                cliques.push(child_clique);
                continue;
            }
            stack.push(Frame::new(
                child_clique,
                child_candidates,
                child_excluded,
                graph,
            ));
        }

        Some(cliques)
    }
}

/// Maximum cardinality; ties broken by the lexicographically smallest sorted
/// index set so every agent picks the same winner from the same graph
fn select_clique(cliques: Vec<Vec<usize>>) -> Option<Vec<usize>> {
    let mut best: Option<Vec<usize>> = None;
    for clique in cliques {
        let better = match &best {
            None => true,
            Some(current) => {
                clique.len() > current.len()
                    || (clique.len() == current.len() && clique < *current)
            }
        };
        if better {
            best = Some(clique);
        }
    }
    best
}
