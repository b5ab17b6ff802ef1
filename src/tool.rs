//! Discovery of the external downloader binary

use crate::config::ToolsConfig;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Resolve the downloader binary from configuration
///
/// An explicit `downloader_path` wins. Otherwise the `which` crate searches
/// `PATH` for `downloader_name`, unless `search_path` is disabled.
///
/// # Errors
///
/// Returns [`Error::Spawn`] when no binary can be found.
pub fn resolve_downloader(tools: &ToolsConfig) -> Result<PathBuf> {
    if let Some(path) = &tools.downloader_path {
        return Ok(path.clone());
    }

    if !tools.search_path {
        return Err(Error::Spawn {
            binary: PathBuf::from(&tools.downloader_name),
            reason: "no downloader path configured and PATH search is disabled".to_string(),
        });
    }

    which::which(&tools.downloader_name).map_err(|e| Error::Spawn {
        binary: PathBuf::from(&tools.downloader_name),
        reason: format!("not found in PATH: {}", e),
    })
}
