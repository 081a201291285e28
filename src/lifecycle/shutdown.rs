//! Signal handling
//!
//! Turns SIGINT, SIGTERM and SIGQUIT into cancellation of the run token.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Create a future that completes when a shutdown signal is received
///
/// Listens for Ctrl+C everywhere, and for SIGTERM and SIGQUIT on unix. A
/// handler that cannot be installed is logged and never fires.
///
/// # Example
///
/// ```rust,ignore
/// use weaver::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => {
///         println!("Shutdown signal received");
///     }
///     _ = server.serve() => {}
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = unix_signal(signal::unix::SignalKind::terminate(), "SIGTERM");
    #[cfg(unix)]
    let quit = unix_signal(signal::unix::SignalKind::quit(), "SIGQUIT");

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    #[cfg(not(unix))]
    let quit = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
        _ = quit => {
            tracing::info!("Received SIGQUIT signal");
        },
    }
}

#[cfg(unix)]
async fn unix_signal(kind: signal::unix::SignalKind, name: &'static str) {
    match signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install {name} handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Cancel `token` on the first shutdown signal.
///
/// The returned task ends on its own once the token is cancelled by
/// anything else.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("Cancelling run");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
