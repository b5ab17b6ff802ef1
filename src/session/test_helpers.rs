//! Shared test helpers: fake downloader scripts and event collection.

use crate::config::Config;
use crate::session::SessionController;
use crate::types::{DownloadRequest, Event, Format};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use tokio::sync::broadcast;

/// Generous upper bound for a scripted run to finish
pub(crate) const RUN_TIMEOUT: Duration = Duration::from_secs(10);

/// Script that reports some progress and then blocks until killed
pub(crate) const LONG_RUNNING: &str = r#"
echo "[download] Destination: clip.mp4"
echo "[download]   5.0% of 10.00MiB at 1.00MiB/s ETA 00:09"
sleep 30
echo "[download] 100.0% of 10.00MiB"
"#;

/// Write an executable `/bin/sh` script into `dir`
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Helper to create a controller whose downloader is a shell script.
/// Returns the controller and the tempdir (which must be kept alive).
pub(crate) fn create_test_controller(body: &str) -> (SessionController, TempDir) {
    let temp_dir = tempdir().unwrap();
    let script = write_script(temp_dir.path(), "fake-yt-dlp", body);

    let mut config = Config::default();
    config.tools.downloader_path = Some(script);
    config.session.drain_timeout = Duration::from_millis(500);
    config.session.shutdown_timeout = Duration::from_secs(5);

    (SessionController::new(config), temp_dir)
}

/// Request targeting a `downloads` directory inside the tempdir
pub(crate) fn test_request(temp_dir: &TempDir) -> DownloadRequest {
    DownloadRequest::new(
        "https://example.com/watch?v=test",
        temp_dir.path().join("downloads"),
        Format::P720,
    )
}

/// Receive the next event, failing the test on timeout or a closed channel
pub(crate) async fn next_event(rx: &mut broadcast::Receiver<Event>) -> Event {
    tokio::time::timeout(RUN_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Receive events until (and including) the next terminal event
pub(crate) async fn collect_run(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = next_event(rx).await;
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// Receive events until one matches `predicate`
pub(crate) async fn wait_for_event(
    rx: &mut broadcast::Receiver<Event>,
    predicate: impl Fn(&Event) -> bool,
) -> Event {
    loop {
        let event = next_event(rx).await;
        if predicate(&event) {
            return event;
        }
    }
}
