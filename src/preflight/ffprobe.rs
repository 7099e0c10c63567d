//! FFprobe preflight check.

use super::CheckResult;
use crate::services::ffprobe;

/// Check if ffprobe is installed. Missing ffprobe only warns: technical
/// properties then come from file names alone.
pub fn check(enabled: bool) -> CheckResult {
    if !enabled {
        return CheckResult::ok("ffprobe", "disabled (file name parsing only)");
    }
    if ffprobe::is_installed() {
        match ffprobe::get_version() {
            Ok(version) => CheckResult::ok("ffprobe", &format!("installed ({})", version)),
            Err(_) => CheckResult::ok("ffprobe", "installed"),
        }
    } else {
        CheckResult::warn(
            "ffprobe",
            "not found, falling back to file names",
            "Install FFmpeg: sudo apt install ffmpeg",
        )
    }
}
