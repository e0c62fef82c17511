pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::RegistryError;
pub use fs::FileRegistry;
pub use memory::InMemoryRegistry;
pub use traits::NodeRegistry;
pub use types::{
    annotation_key, NodeRecord, AVAILABLE_METRIC, DELAY_METRIC, PACKET_LOSS_METRIC,
};
