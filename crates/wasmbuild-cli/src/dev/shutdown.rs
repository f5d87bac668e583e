//! Process-wide cancellation.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation signal shared by every long-running task.
///
/// Cancelling any clone cancels all of them. Cancellation is permanent.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request shutdown.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any token, so this only ends on cancel
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancel on Ctrl+C (SIGINT).
    pub fn cancel_on_interrupt(&self) {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => tracing::info!("Interrupt received, shutting down"),
                        Err(e) => tracing::warn!(error = %e, "Failed to listen for interrupt"),
                    }
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}
