//! Configuration types for media-dl

use crate::error::{Error, Result};
use crate::types::{DownloadRequest, Format};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// External downloader the tool delegates transfers to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accelerator {
    /// Name or path of the accelerator binary (default: "aria2c")
    #[serde(default = "default_accelerator_name")]
    pub name: String,

    /// Argument string passed through `--external-downloader-args`
    #[serde(default = "default_accelerator_args")]
    pub args: String,
}

impl Default for Accelerator {
    fn default() -> Self {
        Self {
            name: default_accelerator_name(),
            args: default_accelerator_args(),
        }
    }
}

/// External tool paths and discovery
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the downloader executable (auto-detected if None)
    #[serde(default)]
    pub downloader_path: Option<PathBuf>,

    /// Binary name searched on PATH when no explicit path is set (default: "yt-dlp")
    #[serde(default = "default_downloader_name")]
    pub downloader_name: String,

    /// Whether to search PATH for the downloader if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Accelerator handed to the downloader (None disables it)
    #[serde(default = "default_accelerator")]
    pub accelerator: Option<Accelerator>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader_path: None,
            downloader_name: default_downloader_name(),
            search_path: true,
            accelerator: default_accelerator(),
        }
    }
}

/// Download behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Archive file name inside the output directory (default: "archive.txt")
    #[serde(default = "default_archive_file_name")]
    pub archive_file_name: String,

    /// Create the output directory before spawning the tool (default: true)
    #[serde(default = "default_true")]
    pub create_output_dir: bool,

    /// Format offered when the caller does not choose one
    #[serde(default)]
    pub default_format: Format,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            archive_file_name: default_archive_file_name(),
            create_output_dir: true,
            default_format: Format::default(),
        }
    }
}

impl DownloadConfig {
    /// Build a request for `url` using [`default_format`](Self::default_format)
    pub fn request(
        &self,
        url: impl Into<String>,
        output_directory: impl Into<PathBuf>,
    ) -> DownloadRequest {
        DownloadRequest::new(url, output_directory, self.default_format)
    }
}

/// Session supervision timeouts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long to wait for output readers after the process was killed (default: 2s)
    ///
    /// Grandchildren of the tool can keep the pipes open after it died; readers
    /// still blocked after this timeout are abandoned.
    #[serde(default = "default_drain_timeout", with = "duration_serde")]
    pub drain_timeout: Duration,

    /// How long `shutdown()` waits for the terminal event (default: 30s)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            drain_timeout: default_drain_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Event delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventConfig {
    /// Broadcast buffer size per subscriber (default: 1000)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Main configuration for SessionController
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// External tool paths and discovery
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Supervision timeouts
    #[serde(default)]
    pub session: SessionConfig,

    /// Event delivery
    #[serde(default)]
    pub events: EventConfig,
}

impl Config {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.tools.downloader_name.trim().is_empty() {
            return Err(Error::config(
                "downloader_name",
                "downloader name must not be empty",
            ));
        }

        let archive = &self.download.archive_file_name;
        if archive.trim().is_empty() {
            return Err(Error::config(
                "archive_file_name",
                "archive file name must not be empty",
            ));
        }
        if archive.contains('/') || archive.contains('\\') {
            return Err(Error::config(
                "archive_file_name",
                format!("archive file name '{}' must not contain a path separator", archive),
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(Error::config(
                "channel_capacity",
                "event channel capacity must be at least 1",
            ));
        }

        if let Some(accelerator) = &self.tools.accelerator
            && accelerator.name.trim().is_empty()
        {
            return Err(Error::config(
                "accelerator.name",
                "accelerator name must not be empty",
            ));
        }

        Ok(())
    }
}

fn default_downloader_name() -> String {
    "yt-dlp".to_string()
}

fn default_accelerator_name() -> String {
    "aria2c".to_string()
}

fn default_accelerator_args() -> String {
    "-c -j 3 -s 3 -x 3".to_string()
}

fn default_accelerator() -> Option<Accelerator> {
    Some(Accelerator::default())
}

fn default_archive_file_name() -> String {
    "archive.txt".to_string()
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
