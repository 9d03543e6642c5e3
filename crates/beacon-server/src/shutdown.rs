//! Coordinated shutdown across the acceptor, sessions, and sweeper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Owns the cancellation token every long-running task listens on.
///
/// `shutdown` is idempotent; the first call wins and later calls are
/// no-ops.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    shutting_down: AtomicBool,
}

impl ShutdownCoordinator {
    /// Create a coordinator with a fresh token.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// A clone of the token for a task to select on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    /// Request shutdown: cancel the token, waking everything.
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::Relaxed) {
            return;
        }
        debug!("shutdown requested");
        self.token.cancel();
    }

    /// Request shutdown and wait up to `grace` for the given tasks to
    /// finish. Returns `false` if the deadline passed with tasks still
    /// running.
    pub async fn graceful_shutdown(&self, tasks: Vec<JoinHandle<()>>, grace: Duration) -> bool {
        self.shutdown();
        match tokio::time::timeout(grace, join_all(tasks)).await {
            Ok(results) => {
                for result in results {
                    if let Err(err) = result {
                        warn!(%err, "task ended abnormally during shutdown");
                    }
                }
                true
            }
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "shutdown grace period elapsed");
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
