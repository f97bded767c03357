//! Signal handling for graceful cancellation
//!
//! Ctrl+C (and SIGTERM on Unix) trips the fetch cache's cancel token. The
//! download in flight stops at its next chunk and extraction stops before
//! its next member; the command then reports the cancelled keys and exits.

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::CancelToken;

/// Spawn a task that cancels `token` on the first shutdown signal
pub fn cancel_on_signal(token: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C signal received"),
                Err(e) => {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("SIGTERM signal received");
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        eprintln!("Cancelling, waiting for in-flight work to stop...");
        token.cancel();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_does_not_cancel_without_signal() {
        let token = CancelToken::new();
        let handle = cancel_on_signal(token.clone());

        tokio::task::yield_now().await;
        assert!(!token.is_cancelled());
        handle.abort();
    }
}
