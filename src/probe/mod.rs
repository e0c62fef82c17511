pub mod command;
pub mod ping;

pub use command::{CommandError, CommandExecutor, CommandOutput, TokioCommandExecutor};
pub use ping::{PingProber, ProbeReport, Prober};
