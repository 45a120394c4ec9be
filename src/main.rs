//! quickserve: a static file server.
//!
//! Loads the configuration, binds every configured endpoint and serves
//! the public directory until a shutdown signal arrives.

use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod routing;
mod server;

use error::ServeError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServeError> {
    let config_name =
        std::env::var("SERVE_CONFIG").unwrap_or_else(|_| "serve".to_string());
    let cfg = config::Config::load_from(&config_name)?;

    if let Err(e) = logger::init(&cfg) {
        return Err(ServeError::Config(format!("failed to open log file: {e}")));
    }

    // Endpoint strings are validated before any socket work starts
    let endpoints = cfg
        .server
        .listen
        .iter()
        .map(|raw| raw.parse::<server::Endpoint>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    }
    let runtime = runtime_builder
        .build()
        .map_err(|e| ServeError::Config(format!("failed to start runtime: {e}")))?;

    runtime.block_on(async_main(cfg, endpoints))
}

async fn async_main(
    cfg: config::Config,
    endpoints: Vec<server::Endpoint>,
) -> Result<(), ServeError> {
    let state = Arc::new(config::ServerState::new(cfg)?);
    let shutdown = server::spawn_shutdown_listener();

    let mut tasks = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        let state = Arc::clone(&state);
        let shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            server::serve_endpoint(endpoint, state, shutdown).await
        }));
    }

    for task in tasks {
        match task.await {
            Ok(result) => result?,
            Err(e) => logger::log_error(&format!("Listener task failed: {e}")),
        }
    }

    Ok(())
}
