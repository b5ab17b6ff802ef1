//! Per-run supervisor task
//!
//! The supervisor owns the child process of one run. It consumes the reader
//! queue, races the process exit against the run's cancellation token, and
//! publishes the single terminal event once the process has exited and both
//! streams are drained.

use crate::error::Error;
use crate::progress::parse_percent;
use crate::stream::{StreamMessage, StreamReaders};
use crate::types::{Event, RunId, SessionState};
use std::process::ExitStatus;
use tokio::process::Child;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionController;

/// Everything a supervisor needs for one run
pub(crate) struct RunHandles {
    pub(crate) run: RunId,
    pub(crate) child: Child,
    pub(crate) messages: UnboundedReceiver<StreamMessage>,
    pub(crate) readers: StreamReaders,
    pub(crate) cancel: CancellationToken,
    pub(crate) done: CancellationToken,
}

impl SessionController {
    pub(crate) async fn supervise(self, handles: RunHandles) {
        let RunHandles {
            run,
            mut child,
            mut messages,
            readers,
            cancel,
            done,
        } = handles;

        let drain_timeout = self.config.session.drain_timeout;
        let mut exit: Option<std::io::Result<ExitStatus>> = None;
        let mut kill_sent = false;
        let mut drained = false;
        let mut aborted = false;
        let mut drain_deadline: Option<Instant> = None;
        let mut last_percent: Option<u8> = None;

        while exit.is_none() || !drained {
            tokio::select! {
                status = child.wait(), if exit.is_none() => {
                    debug!(run_id = run.0, ?status, "downloader exited");
                    exit = Some(status);
                    drain_deadline = Some(Instant::now() + drain_timeout);
                    self.mark_exited(run).await;
                }
                _ = cancel.cancelled(), if exit.is_none() && !kill_sent => {
                    kill_sent = true;
                    terminate(&mut child, run);
                }
                message = messages.recv(), if !drained => {
                    match message {
                        Some(message) => self.publish(run, message, &mut last_percent).await,
                        None => drained = true,
                    }
                }
                _ = tokio::time::sleep_until(drain_deadline.unwrap_or_else(Instant::now)),
                    if drain_deadline.is_some() && !drained && !aborted =>
                {
                    warn!(
                        run_id = run.0,
                        timeout_secs = drain_timeout.as_secs_f64(),
                        "output streams still open after exit, aborting readers"
                    );
                    readers.abort();
                    aborted = true;
                }
            }
        }

        readers.join().await;

        // Loop only ends once the process was reaped
        if let Some(exit) = exit {
            self.finish(run, exit, kill_sent).await;
        }
        done.cancel();
    }

    async fn mark_exited(&self, run: RunId) {
        let mut inner = self.inner.lock().await;
        if let Some(active) = inner.active.as_mut()
            && active.id == run
        {
            active.exited = true;
        }
    }

    async fn publish(&self, run: RunId, message: StreamMessage, last_percent: &mut Option<u8>) {
        match message {
            StreamMessage::Line(line) => {
                debug!(run_id = run.0, source = %line.source, line = %line.text, "tool output");
                let percent = parse_percent(&line.text);
                self.emit_event(Event::Log { run, line });

                if let Some(percent) = percent
                    && last_percent.is_none_or(|last| percent > last)
                {
                    *last_percent = Some(percent);
                    {
                        let mut inner = self.inner.lock().await;
                        if inner.run == Some(run) {
                            inner.percent = Some(percent);
                        }
                    }
                    self.emit_event(Event::Progress { run, percent });
                }
            }
            StreamMessage::Error { source, error } => {
                let err = Error::Stream {
                    stream: source,
                    reason: error.clone(),
                };
                warn!(run_id = run.0, %source, error = %err, "output stream failed");
                self.emit_event(Event::StreamError { run, source, error });
            }
        }
    }

    /// Record the outcome of a run and publish its terminal event
    ///
    /// A Paused or Stopped state only stands when this run actually killed
    /// the process; an exit the tool reached on its own is reported as is.
    async fn finish(&self, run: RunId, exit: std::io::Result<ExitStatus>, kill_sent: bool) {
        let mut inner = self.inner.lock().await;
        let is_current = inner.active.as_ref().is_some_and(|active| active.id == run);
        if !is_current {
            debug!(run_id = run.0, "stale run finished, session untouched");
            return;
        }

        let exit_code = exit.as_ref().ok().and_then(|status| status.code());
        inner.last_exit_code = exit_code;
        inner.active = None;

        let state = inner.state;
        let event = match state {
            SessionState::Paused if kill_sent => Event::Paused { run },
            SessionState::Stopped if kill_sent => Event::Stopped { run },
            _ => {
                let (state, event) = outcome(run, exit);
                self.set_state(&mut inner, state);
                event
            }
        };

        info!(
            run_id = run.0,
            state = %inner.state,
            exit_code = ?exit_code,
            "Download run finished"
        );
        self.emit_event(event);
    }
}

/// Map a process exit to the session state and terminal event it produces
fn outcome(run: RunId, exit: std::io::Result<ExitStatus>) -> (SessionState, Event) {
    match exit {
        Ok(status) if status.success() => (
            SessionState::Completed,
            Event::Completed {
                run,
                exit_code: status.code().unwrap_or(0),
            },
        ),
        Ok(status) => {
            let exit_code = status.code();
            (
                SessionState::Failed,
                Event::Failed {
                    run,
                    error: Error::Process { exit_code }.to_string(),
                    exit_code,
                },
            )
        }
        Err(e) => (
            SessionState::Failed,
            Event::Failed {
                run,
                error: format!("failed to wait for downloader: {}", e),
                exit_code: None,
            },
        ),
    }
}

/// Forcibly kill the downloader
///
/// On Unix the whole process group is killed, so the accelerator the tool
/// spawned dies with it. Killing a process that already exited is a no-op.
fn terminate(child: &mut Child, run: RunId) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: kill() only sends a signal. The child was spawned with
        // process_group(0), so -pid names the group it leads.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc == 0 {
            debug!(run_id = run.0, pid, "killed downloader process group");
            return;
        }
        debug!(
            run_id = run.0,
            pid,
            error = %std::io::Error::last_os_error(),
            "process group kill failed, killing the process directly"
        );
    }

    if let Err(e) = child.start_kill() {
        debug!(run_id = run.0, error = %e, "kill failed (process may have exited)");
    }
}
