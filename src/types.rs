//! Core types and events for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Identifier of one subprocess run inside a session
///
/// A session spans several runs when it is paused and resumed; every event
/// carries the run it belongs to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The id following this one
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media format selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Best available single-file quality
    #[default]
    BestQuality,
    /// MP4 container
    Mp4,
    /// WEBM container
    Webm,
    /// Best video up to 720p merged with best audio
    P720,
    /// Best video up to 1080p merged with best audio
    P1080,
    /// Audio track only
    AudioOnly,
}

impl Format {
    /// Every format, in the order they are offered to users
    pub const ALL: [Format; 6] = [
        Format::BestQuality,
        Format::Mp4,
        Format::Webm,
        Format::P720,
        Format::P1080,
        Format::AudioOnly,
    ];

    /// User-facing label
    pub fn label(&self) -> &'static str {
        match self {
            Format::BestQuality => "Best Quality",
            Format::Mp4 => "MP4",
            Format::Webm => "WEBM",
            Format::P720 => "720p",
            Format::P1080 => "1080p",
            Format::AudioOnly => "Audio Only",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Format {
    type Err = Error;

    /// Accepts the user-facing labels ("720p", "Audio Only") as well as the
    /// snake_case names ("p720", "audio_only"), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|format| {
                format.label().to_ascii_lowercase() == wanted || format.snake_name() == wanted
            })
            .ok_or_else(|| Error::validation("format", format!("unknown format '{}'", s.trim())))
    }
}

impl Format {
    fn snake_name(&self) -> &'static str {
        match self {
            Format::BestQuality => "best_quality",
            Format::Mp4 => "mp4",
            Format::Webm => "webm",
            Format::P720 => "p720",
            Format::P1080 => "p1080",
            Format::AudioOnly => "audio_only",
        }
    }
}

/// A request to download one url into a directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Url handed to the external tool
    pub url: String,
    /// Directory receiving the media files and the archive file
    pub output_directory: PathBuf,
    /// Format selection
    #[serde(default)]
    pub format: Format,
}

impl DownloadRequest {
    /// Create a new request
    pub fn new(url: impl Into<String>, output_directory: impl Into<PathBuf>, format: Format) -> Self {
        Self {
            url: url.into(),
            output_directory: output_directory.into(),
            format,
        }
    }

    /// Check that the url and output directory are present
    ///
    /// Returns a copy with the url trimmed.
    pub fn validated(&self) -> crate::Result<Self> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(Error::validation("url", "url must not be empty"));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(Error::validation(
                "output_directory",
                "output directory must not be empty",
            ));
        }
        Ok(Self {
            url: url.to_string(),
            output_directory: self.output_directory.clone(),
            format: self.format,
        })
    }
}

/// Session state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Nothing has been started yet
    #[default]
    Idle,
    /// A subprocess is running
    Running,
    /// The subprocess was killed by `pause()`; `resume()` restarts it
    Paused,
    /// The tool exited with code 0
    Completed,
    /// The tool failed to start or exited unsuccessfully
    Failed,
    /// The subprocess was killed by `stop()`
    Stopped,
}

impl SessionState {
    /// Whether the state ends a session and requires a fresh `start()`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Stopped
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Output stream of the external tool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamSource::Stdout => f.write_str("stdout"),
            StreamSource::Stderr => f.write_str("stderr"),
        }
    }
}

/// One line read from the tool's output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Stream the line was read from
    pub source: StreamSource,
    /// Line text without the trailing newline
    pub text: String,
}

impl LogLine {
    /// Create a new log line
    pub fn new(source: StreamSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.source {
            StreamSource::Stdout => f.write_str(&self.text),
            StreamSource::Stderr => write!(f, "ERROR: {}", self.text),
        }
    }
}

/// Event emitted during a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A subprocess run was spawned
    Started {
        /// Run ID
        run: RunId,
        /// Archive file handed to the tool
        archive_path: PathBuf,
    },

    /// A line of tool output
    Log {
        /// Run ID
        run: RunId,
        /// The line
        line: LogLine,
    },

    /// Progress reported by the tool
    Progress {
        /// Run ID
        run: RunId,
        /// Percent complete (0 to 100)
        percent: u8,
    },

    /// Reading one output stream failed; the other stream and the process continue
    StreamError {
        /// Run ID
        run: RunId,
        /// Stream that failed
        source: StreamSource,
        /// Error message
        error: String,
    },

    /// The tool exited with code 0
    Completed {
        /// Run ID
        run: RunId,
        /// Exit code
        exit_code: i32,
    },

    /// The tool failed to start or exited unsuccessfully
    Failed {
        /// Run ID
        run: RunId,
        /// Error message
        error: String,
        /// Exit code (None when the tool never started or was killed by a signal)
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    /// The run was killed by `stop()`
    Stopped {
        /// Run ID
        run: RunId,
    },

    /// The run was killed by `pause()`
    Paused {
        /// Run ID
        run: RunId,
    },
}

impl Event {
    /// Run the event belongs to
    pub fn run(&self) -> RunId {
        match self {
            Event::Started { run, .. }
            | Event::Log { run, .. }
            | Event::Progress { run, .. }
            | Event::StreamError { run, .. }
            | Event::Completed { run, .. }
            | Event::Failed { run, .. }
            | Event::Stopped { run }
            | Event::Paused { run } => *run,
        }
    }

    /// Short name of the event kind, matching its serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Started { .. } => "started",
            Event::Log { .. } => "log",
            Event::Progress { .. } => "progress",
            Event::StreamError { .. } => "stream_error",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Stopped { .. } => "stopped",
            Event::Paused { .. } => "paused",
        }
    }

    /// Whether this event ends its run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::Completed { .. }
                | Event::Failed { .. }
                | Event::Stopped { .. }
                | Event::Paused { .. }
        )
    }

    /// Human-readable status line for the event, if it changes the status
    pub fn status_message(&self) -> Option<String> {
        match self {
            Event::Started { .. } => Some("Downloading...".to_string()),
            Event::Progress { percent, .. } => {
                Some(format!("Downloading... {}% Complete", percent))
            }
            Event::Completed { .. } => Some("Download Complete".to_string()),
            Event::Failed { error, .. } => Some(format!("Download Failed: {}", error)),
            Event::Stopped { .. } => Some("Download Stopped".to_string()),
            Event::Paused { .. } => Some("Download Paused".to_string()),
            Event::Log { .. } | Event::StreamError { .. } => None,
        }
    }
}

/// Point-in-time view of a session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current state
    pub state: SessionState,
    /// Request of the session (kept across pause/resume)
    pub request: Option<DownloadRequest>,
    /// Archive file of the session
    pub archive_path: Option<PathBuf>,
    /// Most recent run
    pub run: Option<RunId>,
    /// Exit code of the last finished run (None when killed by a signal)
    pub last_exit_code: Option<i32>,
    /// Last reported progress of the current run
    pub percent: Option<u8>,
    /// When the most recent run was spawned
    pub started_at: Option<DateTime<Utc>>,
}
