//! Custom test assertions for session tests

use media_dl::{Event, RunId, StreamSource};
use std::time::Duration;
use tokio::sync::broadcast;

/// Upper bound for a scripted run to finish
pub const RUN_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of waiting for a run to end
#[derive(Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// Run completed with the exit code
    Completed(i32),
    /// Run failed with error
    Failed(String, Option<i32>),
    /// Run was stopped
    Stopped,
    /// Run was paused
    Paused,
    /// Timeout waiting for the terminal event
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the terminal event of `run`
///
/// `events` must have been subscribed before the run started.
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<Event>,
    run: RunId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed { run: r, exit_code }) if r == run => {
                    return WaitResult::Completed(exit_code);
                }
                Ok(Event::Failed {
                    run: r,
                    error,
                    exit_code,
                }) if r == run => {
                    return WaitResult::Failed(error, exit_code);
                }
                Ok(Event::Stopped { run: r }) if r == run => return WaitResult::Stopped,
                Ok(Event::Paused { run: r }) if r == run => return WaitResult::Paused,
                Ok(_) => {
                    // Other events, continue waiting
                    continue;
                }
                Err(_) => {
                    return WaitResult::ChannelClosed;
                }
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Wait for a specific event
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    predicate: F,
) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => {
                    return Some(event);
                }
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    })
    .await;

    result.ok().flatten()
}

/// Collect all events until timeout or a terminal event
pub async fn collect_run(events: &mut broadcast::Receiver<Event>, timeout: Duration) -> Vec<Event> {
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let terminal = event.is_terminal();
            collected.push(event);
            if terminal {
                break;
            }
        }
    })
    .await;

    collected
}

/// Text of every logged line from `source`
pub fn log_texts(events: &[Event], source: StreamSource) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Log { line, .. } if line.source == source => Some(line.text.clone()),
            _ => None,
        })
        .collect()
}

/// Assert that a run completed with exit code 0
pub async fn assert_run_completed(events: &mut broadcast::Receiver<Event>, run: RunId) {
    match wait_for_terminal(events, run, RUN_TIMEOUT).await {
        WaitResult::Completed(0) => {}
        other => panic!("Expected run {} to complete, got {:?}", run, other),
    }
}
