pub mod config;
pub mod endpoint;
pub mod error;

pub use config::FilestoreConfig;
pub use endpoint::{LoggingEndpoint, RenderMode};
pub use error::FilestoreError;
