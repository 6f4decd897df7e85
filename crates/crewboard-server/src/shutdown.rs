//! Graceful shutdown driven by a `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Signals the HTTP server to stop accepting connections and waits for
/// in-flight requests to drain.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token the serve loop waits on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait up to `timeout` for the server task to finish.
    ///
    /// Returns `false` if the task had to be aborted.
    pub async fn drain(&self, server: JoinHandle<()>, timeout: Duration) -> bool {
        self.shutdown();
        info!(timeout_secs = timeout.as_secs(), "draining in-flight requests");

        let abort = server.abort_handle();
        match tokio::time::timeout(timeout, server).await {
            Ok(_) => {
                info!("server stopped");
                true
            }
            Err(_) => {
                warn!("shutdown timed out after {timeout:?}, aborting server task");
                abort.abort();
                false
            }
        }
    }
}
