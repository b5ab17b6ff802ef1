//! Session control: start, stop, pause and resume.

use crate::archive::archive_path;
use crate::command::build_args;
use crate::error::{Error, Result};
use crate::stream::StreamReaders;
use crate::tool::resolve_downloader;
use crate::types::{DownloadRequest, Event, RunId, SessionState};
use chrono::Utc;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::supervisor::RunHandles;
use super::{ActiveRun, SessionController};

impl SessionController {
    /// Start downloading a request
    ///
    /// Validates the request, spawns the downloader and returns as soon as the
    /// process is running; the outcome arrives later as a terminal event. A
    /// session that is Paused, Stopped, Completed or Failed is replaced by the
    /// new request.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the url or output directory is empty
    /// - [`Error::InvalidState`] if a download is already running
    /// - [`Error::Io`] if the output directory cannot be created
    /// - [`Error::Spawn`] if the downloader cannot be found or launched; the
    ///   session is then Failed and a `Failed` event has been published
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(controller: SessionController) -> Result<()> {
    /// let run = controller
    ///     .start(DownloadRequest::new("https://example.com/watch?v=abc", "downloads", Format::P720))
    ///     .await?;
    /// println!("started run {}", run);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&self, request: DownloadRequest) -> Result<RunId> {
        let request = request.validated()?;
        self.launch(request, None, "start").await
    }

    /// Kill the running download and mark the session Stopped
    ///
    /// Returns false (and does nothing) when no download is running, including
    /// when the tool already exited and only its output is still draining.
    pub async fn stop(&self) -> bool {
        self.interrupt(SessionState::Stopped).await
    }

    /// Kill the running download and mark the session Paused
    ///
    /// The process is killed outright; there is no cooperative pause. Partial
    /// files and the archive let [`resume`](Self::resume) continue later.
    /// Returns false (and does nothing) when no download is running, including
    /// when the tool already exited and only its output is still draining.
    pub async fn pause(&self) -> bool {
        self.interrupt(SessionState::Paused).await
    }

    /// Restart a paused download with the same request and archive file
    ///
    /// Returns `Ok(None)` if the download is already running.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if nothing was started yet, or the session
    ///   already ended (Completed, Failed or Stopped need a fresh `start()`)
    /// - any error of [`start`](Self::start)
    pub async fn resume(&self) -> Result<Option<RunId>> {
        let (request, archive) = {
            let inner = self.inner.lock().await;
            match (inner.state, &inner.request) {
                (SessionState::Running, _) => return Ok(None),
                (SessionState::Paused, Some(request)) => {
                    (request.clone(), inner.archive_path.clone())
                }
                (state, _) => {
                    return Err(Error::InvalidState {
                        operation: "resume",
                        current_state: state.to_string(),
                    });
                }
            }
        };

        tracing::info!(url = %request.url, "Resuming paused download");
        self.launch(request, archive, "resume").await.map(Some)
    }

    async fn interrupt(&self, target: SessionState) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Running {
            tracing::debug!(state = %inner.state, requested = %target, "no running download to interrupt");
            return false;
        }

        if let Some(active) = &inner.active
            && active.exited
        {
            tracing::debug!(run_id = active.id.0, requested = %target, "downloader already exited, nothing to interrupt");
            return false;
        }

        self.set_state(&mut inner, target);
        if let Some(active) = &inner.active {
            tracing::info!(run_id = active.id.0, state = %target, "Terminating downloader");
            active.cancel.cancel();
        }
        true
    }

    async fn launch(
        &self,
        request: DownloadRequest,
        archive: Option<PathBuf>,
        operation: &'static str,
    ) -> Result<RunId> {
        // A paused or stopped run may still be reaping its process; the next
        // one must not spawn before it is gone.
        let mut inner = loop {
            let inner = self.inner.lock().await;
            if inner.state == SessionState::Running {
                return Err(Error::InvalidState {
                    operation,
                    current_state: inner.state.to_string(),
                });
            }
            let pending = inner.active.as_ref().map(|run| run.done.clone());
            match pending {
                None => break inner,
                Some(done) => {
                    drop(inner);
                    done.cancelled().await;
                }
            }
        };

        let archive = archive.unwrap_or_else(|| {
            archive_path(
                &request.output_directory,
                &self.config.download.archive_file_name,
            )
        });

        if self.config.download.create_output_dir {
            tokio::fs::create_dir_all(&request.output_directory)
                .await
                .map_err(|e| {
                    Error::Io(std::io::Error::new(
                        e.kind(),
                        format!(
                            "Failed to create output directory '{}': {}",
                            request.output_directory.display(),
                            e
                        ),
                    ))
                })?;
        }

        let run = inner.last_run.next();
        inner.last_run = run;
        inner.run = Some(run);
        inner.request = Some(request.clone());
        inner.archive_path = Some(archive.clone());
        inner.percent = None;
        inner.started_at = Some(Utc::now());

        let spawned = resolve_downloader(&self.config.tools).and_then(|binary| {
            let args = build_args(&request, &archive, self.config.tools.accelerator.as_ref());
            tracing::debug!(run_id = run.0, binary = %binary.display(), ?args, "Spawning downloader");

            let mut command = Command::new(&binary);
            command
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            // Own process group so a kill also reaches the accelerator
            #[cfg(unix)]
            command.process_group(0);

            command.spawn().map_err(|e| Error::Spawn {
                binary: binary.clone(),
                reason: e.to_string(),
            })
        });

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(run_id = run.0, error = %e, "Failed to start downloader");
                inner.last_exit_code = None;
                self.set_state(&mut inner, SessionState::Failed);
                self.emit_event(Event::Failed {
                    run,
                    error: e.to_string(),
                    exit_code: None,
                });
                return Err(e);
            }
        };

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let readers = StreamReaders::attach(&mut child, line_tx);

        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        inner.active = Some(ActiveRun {
            id: run,
            cancel: cancel.clone(),
            done: done.clone(),
            exited: false,
        });
        self.set_state(&mut inner, SessionState::Running);

        tracing::info!(
            run_id = run.0,
            url = %request.url,
            format = %request.format,
            archive = %archive.display(),
            pid = ?child.id(),
            "Download started"
        );
        self.emit_event(Event::Started {
            run,
            archive_path: archive,
        });
        drop(inner);

        let handles = RunHandles {
            run,
            child,
            messages: line_rx,
            readers,
            cancel,
            done,
        };
        tokio::spawn(self.clone().supervise(handles));

        Ok(run)
    }
}
