//! Logger module
//!
//! Single-line prefixed diagnostics (INFO / WARNING / ERROR), the serving
//! banner, and per-request access logging. Falls back to stdout/stderr
//! until the writer is initialized.

pub mod writer;

use crate::config::Config;

/// Initialize the logger with configuration.
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_info(message: &str) {
    write_info(&format!("INFO: {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("WARNING: {message}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("ERROR: {message}"));
}

/// One access log line per handled request
pub fn log_access(method: &str, path: &str, status: u16) {
    write_info(&format!("{method} {path} {status}"));
}

/// Connection banner printed once per successfully bound endpoint
pub fn log_serving(local: &str, network: Option<&str>, previous_port: Option<u16>) {
    write_info("Serving!");
    write_info(&format!("- Local:            {local}"));
    if let Some(network) = network {
        write_info(&format!("- On Your Network:  {network}"));
    }
    if let Some(port) = previous_port {
        write_info(&format!(
            "This port was picked because {port} is in use."
        ));
    }
}

pub fn log_shutdown() {
    write_info("INFO: Gracefully shutting down. Please wait...");
}

pub fn log_force_close() {
    write_error("WARNING: Force-closing all open sockets...");
}
