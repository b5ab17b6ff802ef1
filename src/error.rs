//! Error types for media-dl
//!
//! This module provides the error taxonomy of the library:
//! - Request validation and state-machine errors returned synchronously
//! - Spawn, stream and process errors captured from the external tool
//! - Configuration, I/O and serialization errors
//! - Stable machine-readable error codes for adapters

use crate::types::StreamSource;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// A download request was rejected before anything was spawned
    #[error("invalid request: {message}")]
    Validation {
        /// The request field that failed validation (e.g., "url")
        field: &'static str,
        /// Human-readable description of the problem
        message: String,
    },

    /// Operation is not allowed in the current session state
    #[error("cannot {operation} session in state {current_state}")]
    InvalidState {
        /// The operation that was attempted (e.g., "start", "resume")
        operation: &'static str,
        /// The state that prevents the operation (e.g., "running")
        current_state: String,
    },

    /// The external tool could not be found or launched
    #[error("failed to spawn {}: {reason}", binary.display())]
    Spawn {
        /// The binary that was being launched
        binary: PathBuf,
        /// Why the launch failed
        reason: String,
    },

    /// Reading one of the tool's output streams failed
    #[error("{stream} stream error: {reason}")]
    Stream {
        /// The stream that failed
        stream: StreamSource,
        /// The underlying I/O failure
        reason: String,
    },

    /// The external tool exited unsuccessfully
    #[error("{}", describe_exit(*exit_code))]
    Process {
        /// Exit code reported by the tool (None when killed by a signal)
        exit_code: Option<i32>,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "archive_file_name")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("process exited with code {}", code),
        None => "process terminated by signal".to_string(),
    }
}

impl Error {
    /// Create a validation error for a request field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code
    ///
    /// Adapters can use this for programmatic error handling without matching
    /// on the message text.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::InvalidState { .. } => "invalid_state",
            Error::Spawn { .. } => "spawn_error",
            Error::Stream { .. } => "stream_error",
            Error::Process { .. } => "process_error",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}
