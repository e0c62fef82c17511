use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("node not found: {name}")]
    NodeNotFound { name: String },
    #[error("invalid node name {name:?}: {message}")]
    InvalidName { name: String, message: String },
    #[error("malformed record for node {name}: {message}")]
    MalformedRecord { name: String, message: String },
    #[error("store io error: {message}")]
    Io { message: String },
}

impl RegistryError {
    pub fn io(err: std::io::Error) -> Self {
        RegistryError::Io {
            message: err.to_string(),
        }
    }
}
