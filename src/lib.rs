//! # media-dl
//!
//! Session controller for supervising an external media download tool
//! (`yt-dlp`).
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Supervised** - One controller owns the subprocess and every state transition
//! - **Resumable** - Pause kills the tool; resume restarts it against the same archive file
//! - **Library-first** - No CLI or UI, adapters subscribe to events
//! - **Event-driven** - Log lines, progress and one terminal event per run
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, DownloadRequest, Format, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = SessionController::new(Config::default());
//!
//!     // Subscribe to events
//!     let mut events = controller.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let Some(status) = event.status_message() {
//!                 println!("{}", status);
//!             }
//!         }
//!     });
//!
//!     controller
//!         .start(DownloadRequest::new(
//!             "https://example.com/watch?v=abc",
//!             "downloads",
//!             Format::BestQuality,
//!         ))
//!         .await?;
//!     controller.wait().await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive file location
pub mod archive;
/// Command line construction for the download tool
pub mod command;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Observer interface for UI adapters
pub mod observer;
/// Progress extraction from tool output
pub mod progress;
/// Download session controller (decomposed into focused submodules)
pub mod session;
/// Concurrent output stream capture
pub mod stream;
/// Download tool discovery
pub mod tool;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use command::build_args;
pub use config::{Accelerator, Config, DownloadConfig, EventConfig, SessionConfig, ToolsConfig};
pub use error::{Error, Result};
pub use observer::{SessionObserver, spawn_observer};
pub use progress::parse_percent;
pub use session::SessionController;
pub use types::{
    DownloadRequest, Event, Format, LogLine, RunId, SessionSnapshot, SessionState, StreamSource,
};

/// Helper function to run the controller with graceful signal handling.
///
/// Waits for a termination signal and then calls the controller's `shutdown()`
/// method, which stops any running download.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, DownloadRequest, Format, SessionController, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let controller = SessionController::new(Config::default());
///     controller
///         .start(DownloadRequest::new("https://example.com/v", "downloads", Format::Mp4))
///         .await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(controller).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(controller: SessionController) {
    wait_for_signal().await;
    controller.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    fn listen(kind: SignalKind, name: &'static str) -> Option<(Signal, &'static str)> {
        signal(kind)
            .inspect_err(|e| tracing::warn!(signal = name, error = %e, "signal handler unavailable"))
            .ok()
            .map(|handler| (handler, name))
    }

    let mut handlers: Vec<(Signal, &'static str)> = [
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::interrupt(), "SIGINT"),
    ]
    .into_iter()
    .filter_map(|(kind, name)| listen(kind, name))
    .collect();

    if handlers.is_empty() {
        tracing::warn!("no unix signal handler registered, falling back to ctrl_c");
        tokio::signal::ctrl_c().await.ok();
        tracing::info!(signal = "ctrl_c", "shutdown signal received");
        return;
    }

    let first = handlers.iter_mut().map(|(handler, name)| {
        Box::pin(async move {
            handler.recv().await;
            *name
        })
    });
    let (name, _, _) = futures::future::select_all(first).await;
    tracing::info!(signal = name, "shutdown signal received");
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "ctrl_c listener failed, stopping session");
        return;
    }
    tracing::info!(signal = "ctrl_c", "shutdown signal received");
}
