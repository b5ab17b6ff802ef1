//! Fake downloader scripts and controller setup

use media_dl::{Config, DownloadRequest, Format, SessionController};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Url whose id (`abc123`) the fake downloaders record in the archive
pub const TEST_URL: &str = "https://www.youtube.com/watch?v=abc123";

/// Script mimicking the downloader's archive and `--continue` behavior
///
/// First run: leaves a `.part` file, reports 50% and blocks until killed.
/// A run that finds the `.part` file finishes it, reports 100% and records
/// the id in the archive. A run that finds the id in the archive skips it.
pub const RESUMABLE_DOWNLOADER: &str = r##"
archive=""
out=""
url=""
while [ $# -gt 0 ]; do
    case "$1" in
        --download-archive) archive="$2"; shift 2 ;;
        -o) out="$2"; shift 2 ;;
        --format|--external-downloader|--external-downloader-args) shift 2 ;;
        *) url="$1"; shift ;;
    esac
done

dir=$(dirname "$out")
video="${url##*=}"
entry="youtube $video"
part="$dir/clip.mp4.part"

if [ -f "$archive" ] && grep -qx "$entry" "$archive"; then
    echo "[download] $video: has already been recorded in the archive"
    exit 0
fi

if [ -f "$part" ]; then
    echo "[download] Resuming download at byte 5242880"
    echo "[download]  75.0% of 10.00MiB at 2.00MiB/s ETA 00:01"
    echo "[download] 100.0% of 10.00MiB in 00:03"
    mv "$part" "$dir/clip.mp4"
    echo "$entry" >> "$archive"
    exit 0
fi

echo "[download] Destination: $dir/clip.mp4"
: > "$part"
echo "[download]  50.0% of 10.00MiB at 1.00MiB/s ETA 00:05"
sleep 30
"##;

/// Script printing every argument on its own line
pub const ECHO_ARGS: &str = r#"for arg in "$@"; do printf '%s\n' "$arg"; done"#;

/// Script that fails like the downloader does on an unsupported url
pub const UNSUPPORTED_URL: &str = r#"
echo "[generic] Extracting URL: $1"
echo "ERROR: Unsupported URL" >&2
exit 1
"#;

/// Write an executable `/bin/sh` script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Config whose downloader is the given script
pub fn script_config(dir: &Path, body: &str) -> Config {
    let mut config = Config::default();
    config.tools.downloader_path = Some(write_script(dir, "fake-yt-dlp", body));
    config.session.drain_timeout = Duration::from_millis(500);
    config.session.shutdown_timeout = Duration::from_secs(5);
    config
}

/// Helper to create a controller backed by a fake downloader script.
/// Returns the controller and the tempdir (which must be kept alive).
pub fn create_test_controller(body: &str) -> (SessionController, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = script_config(temp_dir.path(), body);
    (SessionController::new(config), temp_dir)
}

/// Request for [`TEST_URL`] into `<tempdir>/downloads`
pub fn test_request(temp_dir: &TempDir) -> DownloadRequest {
    DownloadRequest::new(
        TEST_URL,
        temp_dir.path().join("downloads"),
        Format::BestQuality,
    )
}
