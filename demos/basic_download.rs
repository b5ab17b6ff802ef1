//! Basic download example
//!
//! This example demonstrates the core functionality of media-dl:
//! - Creating a session controller
//! - Subscribing to events
//! - Starting a download
//! - Pausing and resuming it
//! - Waiting for the outcome, with Ctrl+C stopping the download
//!
//! Usage: `cargo run --example basic_download -- <url> [format]`

use media_dl::{Config, DownloadRequest, Event, Format, SessionController, SessionState};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string());
    let format: Option<Format> = args.next().map(|name| name.parse()).transpose()?;

    // Default configuration: yt-dlp from PATH, aria2c as accelerator
    let controller = SessionController::new(Config::default());

    // Subscribe to events
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                Event::Log { line, .. } => println!("  {}", line),
                Event::Started { run, archive_path } => {
                    println!("▶ Run #{} started (archive: {})", run, archive_path.display());
                }
                _ => {}
            }
            if let Some(status) = event.status_message() {
                println!("{}", status);
            }
        }
    });

    // Without a format argument the configured default applies
    let request = match format {
        Some(format) => DownloadRequest::new(url, "downloads", format),
        None => controller.get_config().download.request(url, "downloads"),
    };
    controller.start(request).await?;

    // Pause after a few seconds and pick up where the tool left off
    tokio::time::sleep(Duration::from_secs(5)).await;
    if controller.pause().await {
        controller.wait().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        controller.resume().await?;
    }

    let stopper = controller.clone();
    let outcome = tokio::select! {
        state = controller.wait() => state,
        _ = tokio::signal::ctrl_c() => {
            stopper.shutdown().await;
            SessionState::Stopped
        }
    };

    println!("Session finished: {}", outcome);
    Ok(())
}
