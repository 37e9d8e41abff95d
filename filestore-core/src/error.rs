use thiserror::Error;

/// Unified error type for Filestore.
#[derive(Error, Debug)]
pub enum FilestoreError {
    /// The logging endpoint descriptor could not be understood. The message
    /// always quotes the offending descriptor so operators can spot the typo.
    #[error("invalid logging endpoint \"{0}\"")]
    InvalidEndpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("internal: {0}")]
    Internal(String),
}
