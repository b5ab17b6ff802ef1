//! Concurrent capture of the downloader's output streams
//!
//! Each stream gets its own reader task; both feed one unbounded queue whose
//! single consumer is the session supervisor. Lines keep their per-stream
//! order, while stdout and stderr interleave freely.
//!
//! Lines are read as bytes and decoded lossily: the tool and its accelerator
//! may print non-UTF-8 titles, and `BufReader::lines()` would end the reader on
//! the first invalid byte.

use crate::types::{LogLine, StreamSource};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Message from a reader task to the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// A complete line
    Line(LogLine),
    /// The stream failed; its reader has exited
    Error {
        /// Stream that failed
        source: StreamSource,
        /// Error message
        error: String,
    },
}

/// Spawn a task reading `stream` line by line into `sink`
///
/// The task ends at end of stream, on a read error (reported as
/// [`StreamMessage::Error`]), or when the sink is closed.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    source: StreamSource,
    sink: UnboundedSender<StreamMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    let text = String::from_utf8_lossy(&buf).into_owned();
                    if sink.send(StreamMessage::Line(LogLine::new(source, text))).is_err() {
                        debug!(%source, "line sink closed, reader exiting");
                        break;
                    }
                }
                Err(e) => {
                    warn!(%source, error = %e, "output stream read failed");
                    sink.send(StreamMessage::Error {
                        source,
                        error: e.to_string(),
                    })
                    .ok();
                    break;
                }
            }
        }

        debug!(%source, "stream reader task exiting");
    })
}

/// The reader tasks attached to one child process
pub struct StreamReaders {
    handles: Vec<JoinHandle<()>>,
}

impl StreamReaders {
    /// Take the child's piped stdout and stderr and spawn one reader for each
    ///
    /// Streams that were not piped are skipped. `sink` is moved into the
    /// readers, so the receiving side closes once every reader has exited.
    pub fn attach(child: &mut Child, sink: UnboundedSender<StreamMessage>) -> Self {
        let mut handles = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            handles.push(spawn_stream_reader(
                stdout,
                StreamSource::Stdout,
                sink.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            handles.push(spawn_stream_reader(stderr, StreamSource::Stderr, sink));
        }

        Self { handles }
    }

    /// Number of attached readers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no stream was attached
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Abort readers that are still blocked on their stream
    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }

    /// Wait for every reader to exit
    pub async fn join(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result
                && !e.is_cancelled()
            {
                warn!(error = %e, "stream reader task panicked");
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;
    use tokio::sync::mpsc;

    async fn collect(mut rx: mpsc::UnboundedReceiver<StreamMessage>) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        messages
    }

    fn line(source: StreamSource, text: &str) -> StreamMessage {
        StreamMessage::Line(LogLine::new(source, text))
    }

    #[tokio::test]
    async fn test_reads_lines_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"first\nsecond\r\nthird";
        spawn_stream_reader(input, StreamSource::Stdout, tx)
            .await
            .unwrap();

        assert_eq!(
            collect(rx).await,
            vec![
                line(StreamSource::Stdout, "first"),
                line(StreamSource::Stdout, "second"),
                line(StreamSource::Stdout, "third"),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_stop_reader() {
        let (tx, rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"bad \xff byte\nstill reading\n";
        spawn_stream_reader(input, StreamSource::Stderr, tx)
            .await
            .unwrap();

        let messages = collect(rx).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], line(StreamSource::Stderr, "still reading"));
        match &messages[0] {
            StreamMessage::Line(l) => assert!(l.text.starts_with("bad ")),
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_lines_are_kept() {
        let (tx, rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"a\n\nb\n";
        spawn_stream_reader(input, StreamSource::Stdout, tx)
            .await
            .unwrap();
        assert_eq!(collect(rx).await.len(), 3);
    }

    /// Reader that yields one line and then fails
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
            } else {
                self.sent = true;
                buf.put_slice(b"partial output\n");
                Poll::Ready(Ok(()))
            }
        }
    }

    #[tokio::test]
    async fn test_read_error_is_reported_and_ends_reader() {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_stream_reader(FailingReader { sent: false }, StreamSource::Stderr, tx)
            .await
            .unwrap();

        let messages = collect(rx).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], line(StreamSource::Stderr, "partial output"));
        match &messages[1] {
            StreamMessage::Error { source, error } => {
                assert_eq!(*source, StreamSource::Stderr);
                assert!(error.contains("pipe closed"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_stream_does_not_block_other_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        let ok: &[u8] = b"one\ntwo\n";
        let a = spawn_stream_reader(FailingReader { sent: false }, StreamSource::Stderr, tx.clone());
        let b = spawn_stream_reader(ok, StreamSource::Stdout, tx);
        a.await.unwrap();
        b.await.unwrap();

        let stdout: Vec<_> = collect(rx)
            .await
            .into_iter()
            .filter_map(|m| match m {
                StreamMessage::Line(l) if l.source == StreamSource::Stdout => Some(l.text),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, vec!["one", "two"]);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_attach_reads_both_streams_of_child() {
        use std::process::Stdio;
        use tokio::process::Command;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg("echo out1; echo err1 >&2; echo out2; echo err2 >&2")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let readers = StreamReaders::attach(&mut child, tx);
        assert_eq!(readers.len(), 2);

        let status = child.wait().await.unwrap();
        readers.join().await;
        assert!(status.success());

        let messages = collect(rx).await;
        let texts = |source: StreamSource| -> Vec<String> {
            messages
                .iter()
                .filter_map(|m| match m {
                    StreamMessage::Line(l) if l.source == source => Some(l.text.clone()),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(texts(StreamSource::Stdout), vec!["out1", "out2"]);
        assert_eq!(texts(StreamSource::Stderr), vec!["err1", "err2"]);
    }
}
