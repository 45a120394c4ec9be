//! Listen endpoint module
//!
//! Parses the endpoint strings accepted by `server.listen`:
//! `<port>` | `tcp://host[:port]` | `unix:/path` | `pipe:\\.\pipe\Name`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ServeError;

/// Port used when a `tcp://` endpoint omits one
pub const DEFAULT_TCP_PORT: u16 = 5000;

const PIPE_PREFIX: &str = r"\\.\pipe\";

/// A bind target, constructed once from configuration and immutable
/// thereafter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP port, optionally restricted to one host. `host: None` comes
    /// from a bare numeric endpoint and binds all interfaces.
    Tcp { host: Option<String>, port: u16 },
    /// UNIX domain socket path
    Unix(PathBuf),
    /// Windows named pipe path, including the `\\.\pipe\` namespace
    Pipe(String),
}

impl Endpoint {
    /// Whether this endpoint is a single bare numeric port, the only
    /// form eligible for the ephemeral-port bind retry
    pub fn is_bare_port(&self) -> bool {
        matches!(self, Self::Tcp { host: None, .. })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp {
                host: Some(host),
                port,
            } => write!(f, "tcp://{host}:{port}"),
            Self::Tcp { host: None, port } => write!(f, "port {port}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Pipe(name) => write!(f, "pipe:{name}"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = ServeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: &str| ServeError::EndpointParse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u16>()
                .map(|port| Self::Tcp { host: None, port })
                .map_err(|_| parse_err("port out of range"));
        }

        if let Some(rest) = s.strip_prefix("pipe:") {
            if !rest.starts_with(PIPE_PREFIX) {
                return Err(parse_err(r"named pipe paths must start with \\.\pipe\"));
            }
            return Ok(Self::Pipe(rest.to_string()));
        }

        if let Some(rest) = s.strip_prefix("unix:") {
            if rest.is_empty() {
                return Err(parse_err("missing socket path"));
            }
            return Ok(Self::Unix(PathBuf::from(rest)));
        }

        if let Some(rest) = s.strip_prefix("tcp://") {
            return parse_tcp(rest).ok_or_else(|| parse_err("expected tcp://host[:port]"));
        }

        Err(parse_err("unknown endpoint scheme"))
    }
}

fn parse_tcp(rest: &str) -> Option<Endpoint> {
    if rest.is_empty() {
        return None;
    }

    // bracketed IPv6 literal, e.g. tcp://[::1]:8080
    if let Some(after) = rest.strip_prefix('[') {
        let (host, tail) = after.split_once(']')?;
        let port = match tail.strip_prefix(':') {
            Some(p) => p.parse().ok()?,
            None if tail.is_empty() => DEFAULT_TCP_PORT,
            None => return None,
        };
        return Some(Endpoint::Tcp {
            host: Some(host.to_string()),
            port,
        });
    }

    match rest.split_once(':') {
        Some((host, port)) if !host.is_empty() && !port.contains(':') => {
            Some(Endpoint::Tcp {
                host: Some(host.to_string()),
                port: port.parse().ok()?,
            })
        }
        Some(_) => None,
        None => Some(Endpoint::Tcp {
            host: Some(rest.to_string()),
            port: DEFAULT_TCP_PORT,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_port() {
        let endpoint: Endpoint = "5000".parse().expect("parse");
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: None,
                port: 5000
            }
        );
        assert!(endpoint.is_bare_port());
    }

    #[test]
    fn test_tcp_host_without_port_defaults_to_5000() {
        let endpoint: Endpoint = "tcp://example.com".parse().expect("parse");
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: Some("example.com".to_string()),
                port: DEFAULT_TCP_PORT
            }
        );
        assert!(!endpoint.is_bare_port());
    }

    #[test]
    fn test_tcp_host_and_port() {
        let endpoint: Endpoint = "tcp://127.0.0.1:8080".parse().expect("parse");
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: Some("127.0.0.1".to_string()),
                port: 8080
            }
        );
    }

    #[test]
    fn test_tcp_bracketed_ipv6() {
        let endpoint: Endpoint = "tcp://[::1]:8080".parse().expect("parse");
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: Some("::1".to_string()),
                port: 8080
            }
        );
    }

    #[test]
    fn test_unix_socket() {
        let endpoint: Endpoint = "unix:/tmp/s.sock".parse().expect("parse");
        assert_eq!(endpoint, Endpoint::Unix(PathBuf::from("/tmp/s.sock")));
    }

    #[test]
    fn test_named_pipe() {
        let endpoint: Endpoint = r"pipe:\\.\pipe\Foo".parse().expect("parse");
        assert_eq!(endpoint, Endpoint::Pipe(r"\\.\pipe\Foo".to_string()));
    }

    #[test]
    fn test_named_pipe_requires_namespace_prefix() {
        assert!(r"pipe:Foo".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        assert!("ftp://x".parse::<Endpoint>().is_err());
        assert!("unix:".parse::<Endpoint>().is_err());
        assert!(String::new().parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_out_of_range_port_is_rejected() {
        assert!("70000".parse::<Endpoint>().is_err());
    }
}
