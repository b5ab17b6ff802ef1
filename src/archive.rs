//! Download archive used to resume sessions
//!
//! The archive is a plain text file owned by the external tool: it appends the
//! identifier of every fully downloaded item, and skips listed items on later
//! runs. media-dl never reads or writes it; it only decides where it lives and
//! hands the same path to every run of a session. Together with `--continue`
//! (partial-file continuation) this is what makes kill-based pause resumable.

use std::path::{Path, PathBuf};

/// Archive location for an output directory
pub fn archive_path(output_directory: &Path, file_name: &str) -> PathBuf {
    output_directory.join(file_name)
}
