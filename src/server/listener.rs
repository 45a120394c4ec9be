//! Listener module
//!
//! Binds one listener per configured endpoint and runs its accept loop
//! until the shutdown channel fires. A bare numeric port that turns out
//! to be in use is retried once on a system-assigned port.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerState;
use crate::error::ServeError;
use crate::handler;
use crate::logger;
use crate::server::endpoint::Endpoint;
use crate::server::signal::ShutdownReceiver;

/// Bind an endpoint and serve requests on it until shutdown
pub async fn serve_endpoint(
    endpoint: Endpoint,
    state: Arc<ServerState>,
    shutdown: ShutdownReceiver,
) -> Result<(), ServeError> {
    match endpoint {
        Endpoint::Tcp { .. } => serve_tcp(&endpoint, state, shutdown).await,
        Endpoint::Unix(path) => serve_unix(path, state, shutdown).await,
        Endpoint::Pipe(name) => serve_pipe(name, state, shutdown).await,
    }
}

async fn serve_tcp(
    endpoint: &Endpoint,
    state: Arc<ServerState>,
    mut shutdown: ShutdownReceiver,
) -> Result<(), ServeError> {
    let (listener, previous_port) = bind_with_retry(endpoint)?;
    let local = listener.local_addr().map_err(|source| ServeError::Bind {
        endpoint: endpoint.to_string(),
        source,
    })?;
    announce_tcp(local, previous_port);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _peer)) => spawn_connection(stream, Arc::clone(&state)),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    Ok(())
}

/// Bind a TCP endpoint. Only the bare-port form falls back to an
/// ephemeral port when the requested one is taken; the original port is
/// carried along for the user-facing notice.
fn bind_with_retry(endpoint: &Endpoint) -> Result<(TcpListener, Option<u16>), ServeError> {
    let bind_err = |source| ServeError::Bind {
        endpoint: endpoint.to_string(),
        source,
    };
    let (host, port) = match endpoint {
        Endpoint::Tcp { host, port } => (host.as_deref(), *port),
        Endpoint::Unix(_) | Endpoint::Pipe(_) => {
            return Err(bind_err(io::Error::other("not a TCP endpoint")));
        }
    };

    let addr = tcp_bind_addr(host, port).map_err(bind_err)?;
    match bind_tcp(addr) {
        Ok(listener) => Ok((listener, None)),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse && endpoint.is_bare_port() => {
            let fallback = SocketAddr::new(addr.ip(), 0);
            let listener = bind_tcp(fallback).map_err(bind_err)?;
            Ok((listener, Some(port)))
        }
        Err(source) => Err(bind_err(source)),
    }
}

fn tcp_bind_addr(host: Option<&str>, port: u16) -> io::Result<SocketAddr> {
    let host = host.unwrap_or("0.0.0.0");
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::other("host resolved to no addresses"))
}

/// Create a bound, listening TCP socket in non-blocking mode
fn bind_tcp(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Allow rebinding a port that is still in TIME_WAIT
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

fn announce_tcp(local: SocketAddr, previous_port: Option<u16>) {
    let host = if local.ip().is_unspecified() {
        "localhost".to_string()
    } else {
        local.ip().to_string()
    };
    let local_url = format!("http://{host}:{}", local.port());
    let network_url = network_address().map(|ip| format!("http://{ip}:{}", local.port()));
    logger::log_serving(&local_url, network_url.as_deref(), previous_port);
}

/// Best-effort LAN-visible address of this machine. The UDP connect only
/// selects a route; no packets are sent.
fn network_address() -> Option<IpAddr> {
    let probe = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    probe.connect(("192.0.2.1", 80)).ok()?;
    let ip = probe.local_addr().ok()?.ip();
    if ip.is_loopback() || ip.is_unspecified() {
        None
    } else {
        Some(ip)
    }
}

/// Serve a single accepted connection in its own task
fn spawn_connection<S>(stream: S, state: Arc<ServerState>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| {
            let state = Arc::clone(&state);
            async move { handler::handle_request(req, state).await }
        });

        if let Err(err) = http1::Builder::new()
            .keep_alive(true)
            .serve_connection(io, service)
            .await
        {
            logger::log_error(&format!("Failed to serve connection: {err:?}"));
        }
    });
}

#[cfg(unix)]
async fn serve_unix(
    path: PathBuf,
    state: Arc<ServerState>,
    mut shutdown: ShutdownReceiver,
) -> Result<(), ServeError> {
    // An earlier run may have left the socket file behind
    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }

    let listener = tokio::net::UnixListener::bind(&path).map_err(|source| ServeError::Bind {
        endpoint: format!("unix:{}", path.display()),
        source,
    })?;
    logger::log_serving(&format!("unix:{}", path.display()), None, None);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _peer)) => spawn_connection(stream, Arc::clone(&state)),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[cfg(not(unix))]
async fn serve_unix(
    path: PathBuf,
    _state: Arc<ServerState>,
    _shutdown: ShutdownReceiver,
) -> Result<(), ServeError> {
    Err(ServeError::Bind {
        endpoint: format!("unix:{}", path.display()),
        source: io::Error::other("UNIX domain sockets are not supported on this platform"),
    })
}

#[cfg(windows)]
async fn serve_pipe(
    name: String,
    state: Arc<ServerState>,
    mut shutdown: ShutdownReceiver,
) -> Result<(), ServeError> {
    use tokio::net::windows::named_pipe::ServerOptions;

    let bind_err = |source| ServeError::Bind {
        endpoint: format!("pipe:{name}"),
        source,
    };

    let mut server = ServerOptions::new()
        .first_pipe_instance(true)
        .create(&name)
        .map_err(bind_err)?;
    logger::log_serving(&format!("pipe:{name}"), None, None);

    loop {
        tokio::select! {
            connected = server.connect() => {
                if let Err(e) = connected {
                    logger::log_error(&format!("Failed to accept pipe client: {e}"));
                    continue;
                }
                // Hand the connected instance off and open the next one
                let next = ServerOptions::new().create(&name).map_err(bind_err)?;
                let stream = std::mem::replace(&mut server, next);
                spawn_connection(stream, Arc::clone(&state));
            }
            _ = shutdown.changed() => break,
        }
    }

    Ok(())
}

#[cfg(not(windows))]
async fn serve_pipe(
    name: String,
    _state: Arc<ServerState>,
    _shutdown: ShutdownReceiver,
) -> Result<(), ServeError> {
    Err(ServeError::Bind {
        endpoint: format!("pipe:{name}"),
        source: io::Error::other("named pipes are only supported on Windows"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(port: u16) -> Endpoint {
        Endpoint::Tcp { host: None, port }
    }

    #[tokio::test]
    async fn test_bare_port_falls_back_to_ephemeral() {
        let occupier = std::net::TcpListener::bind(("0.0.0.0", 0)).expect("occupy a port");
        let taken = occupier.local_addr().expect("local addr").port();

        let (listener, previous) = bind_with_retry(&bare(taken)).expect("fallback bind");
        let local = listener.local_addr().expect("local addr");

        // The notice payload carries the originally requested port
        assert_eq!(previous, Some(taken));
        assert_ne!(local.port(), taken);
    }

    #[tokio::test]
    async fn test_host_bound_endpoint_does_not_retry() {
        let occupier = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("occupy a port");
        let taken = occupier.local_addr().expect("local addr").port();

        let endpoint = Endpoint::Tcp {
            host: Some("127.0.0.1".to_string()),
            port: taken,
        };
        assert!(matches!(
            bind_with_retry(&endpoint),
            Err(ServeError::Bind { .. })
        ));
    }

    #[tokio::test]
    async fn test_free_port_binds_without_notice() {
        let (listener, previous) = bind_with_retry(&bare(0)).expect("bind");
        assert!(previous.is_none());
        assert_ne!(listener.local_addr().expect("local addr").port(), 0);
    }
}
