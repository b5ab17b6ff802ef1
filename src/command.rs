//! Argument construction for the external downloader
//!
//! The argument list is a pure function of the request, the archive path and
//! the accelerator settings, so the same inputs always produce the same
//! invocation.

use crate::config::Accelerator;
use crate::types::{DownloadRequest, Format};
use std::ffi::OsString;
use std::path::Path;

/// Output filename template, relative to the output directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

impl Format {
    /// Format expression passed to `--format`
    pub fn expression(&self) -> &'static str {
        match self {
            Format::BestQuality => "best",
            Format::Mp4 => "mp4",
            Format::Webm => "webm",
            Format::P720 => "bestvideo[height<=720]+bestaudio",
            Format::P1080 => "bestvideo[height<=1080]+bestaudio",
            Format::AudioOnly => "bestaudio",
        }
    }
}

/// Build the ordered argument list for one run
///
/// `request` is expected to be validated already. When `accelerator` is None
/// the `--external-downloader` pairs are left out.
pub fn build_args(
    request: &DownloadRequest,
    archive_path: &Path,
    accelerator: Option<&Accelerator>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(16);

    args.push("--newline".into());
    args.push("--download-archive".into());
    args.push(archive_path.into());
    args.push("--continue".into());

    if let Some(accelerator) = accelerator {
        args.push("--external-downloader".into());
        args.push(accelerator.name.clone().into());
        args.push("--external-downloader-args".into());
        args.push(accelerator.args.clone().into());
    }

    args.push("-o".into());
    args.push(request.output_directory.join(OUTPUT_TEMPLATE).into());
    args.push("--format".into());
    args.push(request.format.expression().into());
    args.push("--no-warnings".into());
    args.push(request.url.clone().into());

    args
}
