//! Server module
//!
//! Endpoint parsing, listener setup and signal-driven shutdown.

mod endpoint;
mod listener;
mod signal;

pub use endpoint::Endpoint;
pub use listener::serve_endpoint;
pub use signal::{spawn_shutdown_listener, ShutdownReceiver};
