//! Background run scheduler and shutdown handling for the worker daemon.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::main_lib::AppState;

/// Starts the schedule poll loop. It stops once `cancel` fires; an import in
/// flight at that moment is abandoned and left unrecorded.
pub fn start_run_scheduler(state: Arc<AppState>, cancel: CancellationToken) -> JoinHandle<()> {
    let poll_interval = state.config.poll_interval;
    let scheduler = state.run_scheduler();

    tokio::spawn(async move {
        scheduler.run(cancel, poll_interval).await;
    })
}

/// Wait for Ctrl+C or SIGTERM, then cancel `shutdown`.
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
}
