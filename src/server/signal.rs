//! Shutdown signal module
//!
//! SIGINT and SIGTERM trigger one graceful shutdown through an explicit
//! channel; the guard makes repeated signals of the same kind no-ops. A
//! second SIGINT while shutdown is in progress force-exits the process.

use tokio::sync::watch;

use crate::logger;

/// Channel every listener watches for the shutdown notice
pub type ShutdownReceiver = watch::Receiver<bool>;

/// Spawn the signal listener and return its shutdown channel
pub fn spawn_shutdown_listener() -> ShutdownReceiver {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(wait_for_signals(tx));
    rx
}

#[cfg(unix)]
async fn wait_for_signals(tx: watch::Sender<bool>) {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
        logger::log_error("Failed to register SIGINT handler");
        return;
    };
    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        logger::log_error("Failed to register SIGTERM handler");
        return;
    };

    let mut shutting_down = false;
    loop {
        let interrupt = tokio::select! {
            _ = sigint.recv() => true,
            _ = sigterm.recv() => false,
        };

        if shutting_down {
            // A second Ctrl+C forces the exit; repeated SIGTERM is a no-op
            if interrupt {
                logger::log_force_close();
                std::process::exit(0);
            }
            continue;
        }

        shutting_down = true;
        logger::log_shutdown();
        let _ = tx.send(true);
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(tx: watch::Sender<bool>) {
    let mut shutting_down = false;
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        if shutting_down {
            logger::log_force_close();
            std::process::exit(0);
        }
        shutting_down = true;
        logger::log_shutdown();
        let _ = tx.send(true);
    }
}
