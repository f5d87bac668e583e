//! Serialized compiles for the development server.
//!
//! At most one compile runs per context. A successful compile installs the
//! new artefact in the shared state and mirrors the runtime files into the
//! output directory; a failed one leaves the previous artefact in place.

use crate::compiler;
use crate::dev::SharedState;
use crate::error::Result;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Development builder wrapping the compiler driver.
pub struct DevBuilder {
    state: SharedState,
    gate: Mutex<()>,
}

impl DevBuilder {
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            gate: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Compile and install the artefact. Returns the compile duration.
    ///
    /// The artefact is installed before this returns, so a caller that
    /// publishes `reload` afterwards never points a browser at stale bytes.
    pub async fn rebuild(&self) -> Result<Duration> {
        let _guard = self.gate.lock().await;
        let ctx = self.state.context();

        self.state.start_build();
        let start = Instant::now();

        let artefact = match compiler::compile(ctx).await {
            Ok(artefact) => artefact,
            Err(e) => {
                self.state.fail_build(e.describe());
                return Err(e);
            }
        };
        let duration = start.elapsed();

        if let Err(e) = crate::commands::build::write_output(ctx, &artefact) {
            tracing::warn!(error = %e, "Failed to mirror build output");
        }

        tracing::debug!(bytes = artefact.len(), ?duration, "Artefact installed");
        self.state.install_artefact(artefact);
        self.state.complete_build(duration);

        Ok(duration)
    }
}
