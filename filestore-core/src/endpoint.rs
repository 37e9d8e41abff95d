//! Logging endpoint descriptors.
//!
//! A descriptor is a URL-like string that selects where structured events go:
//!
//! - `file:///dev/stdout`, `file:///dev/stderr`, `file://./some.log` — a local
//!   stream, rendered as key-value or JSON text.
//! - `fluent://host[:port]/tag` — a fluentd collector reached over the fluent
//!   forward protocol (msgpack over TCP). The port defaults to 24224 and the
//!   path (minus the leading slash) becomes the namespace tag.
//!
//! Parsing happens once at startup; a bad descriptor is fatal before the
//! server ever binds its socket.

use serde::{Deserialize, Serialize};

use crate::error::FilestoreError;

/// Default fluentd forward-protocol port.
pub const DEFAULT_FLUENT_PORT: u16 = 24224;

/// How a local stream sink renders an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    #[serde(rename = "kv")]
    KeyValue,
    #[serde(rename = "json")]
    Json,
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::KeyValue
    }
}

/// A parsed logging endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingEndpoint {
    /// Local stream destination. `/dev/stdout` and `/dev/stderr` are bound to
    /// the process's standard streams; anything else is opened for writing.
    File { path: String },
    /// Remote fluentd collector.
    Fluent { host: String, port: u16, tag: String },
}

impl LoggingEndpoint {
    /// Parse a descriptor string.
    ///
    /// Fluent descriptors carry no query string or fragment; their presence
    /// is an error.
    pub fn parse(descriptor: &str) -> Result<Self, FilestoreError> {
        let invalid = || FilestoreError::InvalidEndpoint(descriptor.to_string());

        if let Some(path) = descriptor.strip_prefix("file://") {
            if path.is_empty() {
                return Err(invalid());
            }
            return Ok(LoggingEndpoint::File {
                path: path.to_string(),
            });
        }

        if let Some(rest) = descriptor.strip_prefix("fluent://") {
            if rest.contains('?') || rest.contains('#') {
                return Err(invalid());
            }
            let (authority, tag) = match rest.split_once('/') {
                Some((authority, tag)) => (authority, tag),
                None => (rest, ""),
            };
            let (host, port) = match authority.rsplit_once(':') {
                Some((host, port)) => {
                    let port: u16 = port.parse().map_err(|_| invalid())?;
                    (host, port)
                }
                None => (authority, DEFAULT_FLUENT_PORT),
            };
            if host.is_empty() {
                return Err(invalid());
            }
            return Ok(LoggingEndpoint::Fluent {
                host: host.to_string(),
                port,
                tag: tag.to_string(),
            });
        }

        Err(invalid())
    }
}
