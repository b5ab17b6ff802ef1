//! Waiting for runs and controller shutdown.

use crate::types::SessionState;

use super::SessionController;

impl SessionController {
    /// Wait until the current run has published its terminal event
    ///
    /// Returns immediately when no run is active. The returned state is the
    /// session state right after the run finished (Completed, Failed, Stopped
    /// or Paused), or the current state if nothing was running.
    pub async fn wait(&self) -> SessionState {
        let done = {
            let inner = self.inner.lock().await;
            inner.active.as_ref().map(|active| active.done.clone())
        };

        if let Some(done) = done {
            done.cancelled().await;
        }
        self.state().await
    }

    /// Stop the current run and wait for it to finish
    ///
    /// The wait is bounded by `session.shutdown_timeout`; on timeout the
    /// supervisor keeps reaping the process in the background.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down download session");

        if !self.stop().await {
            tracing::debug!("no running download at shutdown");
        }

        let timeout = self.config.session.shutdown_timeout;
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(state) => tracing::info!(%state, "Download session shut down"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timed out waiting for the downloader to exit"
            ),
        }
    }
}
