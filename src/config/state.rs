//! Runtime state module
//!
//! Immutable view of the configuration shared by every request task.

use std::path::PathBuf;

use super::types::{Config, RouteRule};
use crate::error::ServeError;
use crate::http::fingerprint::FingerprintCache;

/// Shared server state, constructed once at startup and passed by
/// reference to all listeners
pub struct ServerState {
    pub config: Config,
    /// Canonicalized public root; every served path must stay under it
    pub public_root: PathBuf,
    /// Rewrite rules with the `single` catch-all prepended when enabled
    pub rewrites: Vec<RouteRule>,
    /// Process-wide ETag fingerprint cache
    pub fingerprints: FingerprintCache,
}

impl ServerState {
    pub fn new(config: Config) -> Result<Self, ServeError> {
        let public_root = std::fs::canonicalize(&config.public).map_err(|e| {
            ServeError::Config(format!(
                "public directory `{}` is not accessible: {e}",
                config.public
            ))
        })?;

        let mut rewrites = Vec::with_capacity(config.rewrites.len() + 1);
        if config.single {
            // Same catch-all the original `--single` mode installs
            rewrites.push(RouteRule {
                source: "**".to_string(),
                destination: "/index.html".to_string(),
            });
        }
        rewrites.extend(config.rewrites.iter().cloned());

        Ok(Self {
            config,
            public_root,
            rewrites,
            fingerprints: FingerprintCache::new(),
        })
    }
}
