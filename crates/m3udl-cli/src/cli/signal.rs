//! Ctrl-C / SIGTERM wiring for cooperative cancellation.

use m3udl_core::control::AbortToken;
use tokio::task::JoinHandle;

/// Resolves on the first Ctrl-C (or SIGTERM on Unix).
async fn interrupted() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

/// Trips `abort` when the process is interrupted.
pub(super) fn spawn_interrupt_listener(abort: AbortToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        interrupted().await;
        abort.abort();
    })
}
