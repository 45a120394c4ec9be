//! Error taxonomy for the server
//!
//! Fatal errors (configuration, endpoint parsing, binding) terminate the
//! process with exit code 1 after a single-line diagnostic. Stream errors
//! propagate to the request pipeline instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    /// Unreadable, unparsable, or structurally invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed listen endpoint string
    #[error("invalid listen endpoint `{input}`: {reason}")]
    EndpointParse { input: String, reason: String },

    /// Network or IPC bind failure that was not recoverable
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    /// I/O failure while hashing file content for an ETag
    #[error("failed to read {path} while computing fingerprint: {source}")]
    Stream {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<config::ConfigError> for ServeError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
