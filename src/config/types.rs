//! Configuration types module
//!
//! Defines the serving rule set and server/logging sections.

use serde::Deserialize;
use std::sync::OnceLock;

use crate::error::ServeError;

/// Upper bound on configured header rules, from the canonical schema
pub const MAX_HEADER_RULES: usize = 50;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Directory served as the site root
    pub public: String,
    /// `true` sends `ETag`, `false` sends `Last-Modified`
    pub etag: bool,
    /// Rewrite all not-found requests to `/index.html`
    pub single: bool,
    /// Follow symlinks out of the public directory instead of rejecting them
    pub symlinks: bool,
    #[serde(default)]
    pub headers: Vec<HeaderRule>,
    #[serde(default)]
    pub rewrites: Vec<RouteRule>,
    #[serde(default)]
    pub redirects: Vec<RouteRule>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Listen endpoint strings: `<port>`, `tcp://host:port`, `unix:/path`, `pipe:\\.\pipe\Name`
    pub listen: Vec<String>,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Conditional header rule: applies its pairs to every request path
/// matching `source`
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub source: String,
    pub headers: Vec<HeaderValue>,
}

/// A single header pair; a `None` value suppresses the header entirely
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderValue {
    pub key: String,
    pub value: Option<String>,
}

/// Rewrite or redirect rule, evaluated in configuration order,
/// first match wins
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub source: String,
    pub destination: String,
}

impl Default for Config {
    /// Built-in defaults, identical to the loader's fallback values
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen: vec!["5000".to_string()],
                workers: None,
            },
            logging: LoggingConfig {
                access_log: true,
                access_log_file: None,
                error_log_file: None,
            },
            public: ".".to_string(),
            etag: true,
            single: false,
            symlinks: false,
            headers: Vec::new(),
            rewrites: Vec::new(),
            redirects: Vec::new(),
        }
    }
}

fn header_key_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z0-9_!#$%&'*+.^`|~-]+$").expect("valid header key pattern")
    })
}

fn header_value_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z0-9_!#$%&'*+.;/:, =^`|~-]+$")
            .expect("valid header value pattern")
    })
}

impl Config {
    /// Structural validation of the rule set, replacing the schema layer
    /// of the configuration format
    pub fn validate(&self) -> Result<(), ServeError> {
        if self.headers.len() > MAX_HEADER_RULES {
            return Err(ServeError::Config(format!(
                "too many header rules: {} (maximum {MAX_HEADER_RULES})",
                self.headers.len()
            )));
        }

        for rule in &self.headers {
            if rule.source.is_empty() {
                return Err(ServeError::Config(
                    "header rule with empty source pattern".to_string(),
                ));
            }
            if rule.headers.is_empty() {
                return Err(ServeError::Config(format!(
                    "header rule `{}` has no key/value pairs",
                    rule.source
                )));
            }
            for pair in &rule.headers {
                if !header_key_pattern().is_match(&pair.key) {
                    return Err(ServeError::Config(format!(
                        "invalid header key `{}` in rule `{}`",
                        pair.key, rule.source
                    )));
                }
                if let Some(value) = &pair.value {
                    if !header_value_pattern().is_match(value) {
                        return Err(ServeError::Config(format!(
                            "invalid header value for `{}` in rule `{}`",
                            pair.key, rule.source
                        )));
                    }
                }
            }
        }

        for rule in self.rewrites.iter().chain(&self.redirects) {
            if rule.source.is_empty() || rule.destination.is_empty() {
                return Err(ServeError::Config(
                    "rewrite/redirect rules need both a source and a destination".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::default()
    }

    fn header_rule(key: &str, value: Option<&str>) -> HeaderRule {
        HeaderRule {
            source: "**".to_string(),
            headers: vec![HeaderValue {
                key: key.to_string(),
                value: value.map(String::from),
            }],
        }
    }

    #[test]
    fn test_valid_rules() {
        let mut cfg = base_config();
        cfg.headers = vec![header_rule("Cache-Control", Some("public, max-age=604800"))];
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_null_value_is_allowed() {
        let mut cfg = base_config();
        cfg.headers = vec![header_rule("Content-Type", None)];
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_key() {
        let mut cfg = base_config();
        cfg.headers = vec![header_rule("X-Bad Key", Some("x"))];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_pairs() {
        let mut cfg = base_config();
        cfg.headers = vec![HeaderRule {
            source: "*.html".to_string(),
            headers: Vec::new(),
        }];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_too_many_rules() {
        let mut cfg = base_config();
        cfg.headers = (0..=MAX_HEADER_RULES)
            .map(|_| header_rule("X-Custom", Some("1")))
            .collect();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_rewrite_without_destination() {
        let mut cfg = base_config();
        cfg.rewrites = vec![RouteRule {
            source: "/old/**".to_string(),
            destination: String::new(),
        }];
        assert!(cfg.validate().is_err());
    }
}
