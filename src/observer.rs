//! Observer interface for UI adapters
//!
//! The controller publishes every [`Event`] to two kinds of subscriber.
//! Adapters consume them in one of three ways:
//! - [`SessionController::subscribe`] for a raw, bounded `broadcast::Receiver`
//!   that reports `Lagged` when it falls behind
//! - [`SessionController::events`] for a `Stream` that sees every event
//! - [`spawn_observer`] to push every event into a [`SessionObserver`] callback
//!
//! The last two sit on [`SessionController::subscribe_lossless`], so a slow
//! UI never misses a log line or the terminal event.

use crate::session::SessionController;
use crate::types::Event;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Receives session events
///
/// Called from a background task, so implementations must not block for long.
/// Events queue up while a call is in progress.
pub trait SessionObserver: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &Event);
}

impl<F> SessionObserver for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

impl SessionController {
    /// Stream of session events
    ///
    /// Every event published after this call is yielded in order. The stream
    /// ends once every controller handle is dropped.
    pub fn events(&self) -> impl Stream<Item = Event> + Send + 'static {
        UnboundedReceiverStream::new(self.subscribe_lossless())
    }
}

/// Forward every event of `controller` to `observer`
///
/// The task runs until every controller handle is dropped and the queued
/// events have been delivered.
pub fn spawn_observer(
    controller: &SessionController,
    observer: Arc<dyn SessionObserver>,
) -> JoinHandle<()> {
    let mut events = controller.subscribe_lossless();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            observer.on_event(&event);
        }
        tracing::debug!("observer task exiting");
    })
}
