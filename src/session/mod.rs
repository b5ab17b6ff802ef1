//! Download session controller split into focused submodules.
//!
//! The `SessionController` struct and its methods are organized by domain:
//! - [`control`] - start, stop, pause and resume
//! - [`supervisor`] - per-run task owning the child process and publishing run events
//! - [`lifecycle`] - waiting for runs and shutdown

mod control;
mod lifecycle;
mod supervisor;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests;

use crate::config::Config;
use crate::types::{DownloadRequest, Event, RunId, SessionSnapshot, SessionState};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Tokens of the run that currently owns a subprocess
pub(crate) struct ActiveRun {
    pub(crate) id: RunId,
    /// Cancelled by `pause()`/`stop()` to make the supervisor kill the process
    pub(crate) cancel: CancellationToken,
    /// Cancelled by the supervisor after the terminal event was published
    pub(crate) done: CancellationToken,
    /// Set by the supervisor once the process was reaped; from then on
    /// `pause()`/`stop()` have nothing to terminate
    pub(crate) exited: bool,
}

/// Mutable session state, only touched by controller methods and supervisors
#[derive(Default)]
pub(crate) struct SessionInner {
    pub(crate) state: SessionState,
    pub(crate) request: Option<DownloadRequest>,
    pub(crate) archive_path: Option<PathBuf>,
    pub(crate) run: Option<RunId>,
    pub(crate) active: Option<ActiveRun>,
    pub(crate) last_exit_code: Option<i32>,
    pub(crate) percent: Option<u8>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) last_run: RunId,
}

/// Controller of one download session (cloneable - all fields are Arc-wrapped)
///
/// At most one subprocess is alive per controller. Every state transition
/// happens inside controller methods or the controller's own supervisor task.
#[derive(Clone)]
pub struct SessionController {
    pub(crate) config: Arc<Config>,
    pub(crate) inner: Arc<Mutex<SessionInner>>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Unbounded per-observer queues that never drop events
    pub(crate) observers: Arc<std::sync::Mutex<Vec<mpsc::UnboundedSender<Event>>>>,
    pub(crate) state_tx: Arc<watch::Sender<SessionState>>,
}

impl SessionController {
    /// Create a new controller in the Idle state
    pub fn new(config: Config) -> Self {
        let (event_tx, _rx) = broadcast::channel(config.events.channel_capacity.max(1));
        let (state_tx, _state_rx) = watch::channel(SessionState::Idle);

        Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(SessionInner::default())),
            event_tx,
            observers: Arc::new(std::sync::Mutex::new(Vec::new())),
            state_tx: Arc::new(state_tx),
        }
    }

    /// Subscribe to session events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently. If a subscriber falls behind by more than the configured
    /// channel capacity it receives `RecvError::Lagged`; use
    /// [`subscribe_lossless`](Self::subscribe_lossless) when every log line
    /// matters.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, SessionController};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let controller = SessionController::new(Config::default());
    ///
    ///     let mut events = controller.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{:?}", event);
    ///         }
    ///     });
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Subscribe to session events without loss
    ///
    /// The returned queue is unbounded: a slow consumer sees every event of
    /// every run, in publication order, at the cost of buffering them. The
    /// receiver yields `None` once every controller handle is dropped.
    pub fn subscribe_lossless(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(tx);
        }
        rx
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Current session state
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Point-in-time copy of the session
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            state: inner.state,
            request: inner.request.clone(),
            archive_path: inner.archive_path.clone(),
            run: inner.run,
            last_exit_code: inner.last_exit_code,
            percent: inner.percent,
            started_at: inner.started_at,
        }
    }

    /// Get the configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Send an event to all subscribers
    ///
    /// Events are dropped silently when nobody is subscribed. Lossless
    /// queues whose receiver is gone are unregistered.
    pub(crate) fn emit_event(&self, event: Event) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.retain(|tx| tx.send(event.clone()).is_ok());
        }
        self.event_tx.send(event).ok();
    }

    /// Record a transition and notify state watchers
    pub(crate) fn set_state(&self, inner: &mut SessionInner, state: SessionState) {
        if inner.state != state {
            tracing::debug!(from = %inner.state, to = %state, "session state transition");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }
}
