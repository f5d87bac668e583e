//! Shared state for the development server.
//!
//! Holds the current artefact, the build status and the broadcaster. The
//! artefact slot is a single pointer swapped under a short write lock, so a
//! request always sees either the previous or the next artefact in full.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::BuildContext;
use crate::dev::{Broadcaster, ShutdownToken};
use crate::file::File;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No build has been performed yet
    NotStarted,
    /// Build is currently in progress
    InProgress { started_at: Instant },
    /// Build completed successfully
    Success { duration: Duration },
    /// Build failed with error
    Failed { error: String },
}

impl BuildStatus {
    /// Check if build is currently running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildStatus::InProgress { .. })
    }

    /// Check if last build succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Get error message if failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Shared development server state.
pub struct DevServerState {
    context: Arc<BuildContext>,
    artefact: RwLock<Option<Arc<File>>>,
    status: RwLock<BuildStatus>,
    broadcaster: Broadcaster,
    shutdown: ShutdownToken,
}

impl DevServerState {
    pub fn new(context: Arc<BuildContext>, shutdown: ShutdownToken) -> Self {
        Self {
            context,
            artefact: RwLock::new(None),
            status: RwLock::new(BuildStatus::NotStarted),
            broadcaster: Broadcaster::new(),
            shutdown,
        }
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn shutdown(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// The artefact currently served, if any build has succeeded.
    pub fn artefact(&self) -> Option<Arc<File>> {
        self.artefact.read().clone()
    }

    /// Replace the served artefact.
    pub fn install_artefact(&self, artefact: File) {
        *self.artefact.write() = Some(Arc::new(artefact));
    }

    /// Update build status to in-progress.
    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
    }

    /// Update build status to success.
    pub fn complete_build(&self, duration: Duration) {
        *self.status.write() = BuildStatus::Success { duration };
    }

    /// Update build status to failed.
    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    /// Get current build status.
    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_status_is_in_progress() {
        let status = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
        assert!(status.is_in_progress());
        assert!(!status.is_success());
        assert!(status.error().is_none());
    }

    #[test]
    fn test_build_status_success() {
        let status = BuildStatus::Success {
            duration: Duration::from_millis(100),
        };
        assert!(!status.is_in_progress());
        assert!(status.is_success());
        assert!(status.error().is_none());
    }

    #[test]
    fn test_build_status_failed() {
        let status = BuildStatus::Failed {
            error: "undefined: main".to_string(),
        };
        assert!(!status.is_in_progress());
        assert!(!status.is_success());
        assert_eq!(status.error(), Some("undefined: main"));
    }
}
