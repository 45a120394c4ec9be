//! Configuration module entry point
//!
//! Loads and validates the serving rule set.

mod state;
mod types;

// Re-export public types
pub use state::ServerState;
pub use types::{Config, HeaderRule, HeaderValue, LoggingConfig, RouteRule, ServerConfig};

use crate::error::ServeError;

impl Config {
    /// Load configuration from the given file path (without extension).
    /// The file is optional; environment variables with a `SERVE` prefix
    /// override it, and built-in defaults fill the rest.
    pub fn load_from(config_path: &str) -> Result<Self, ServeError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVE"))
            .set_default("server.listen", vec!["5000".to_string()])?
            .set_default("logging.access_log", true)?
            .set_default("public", ".")?
            .set_default("etag", true)?
            .set_default("single", false)?
            .set_default("symlinks", false)?
            .build()?;

        let cfg: Self = settings.try_deserialize().map_err(ServeError::from)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
