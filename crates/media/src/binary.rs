//! Locating the external `ffmpeg`/`ffprobe` executables.

use std::path::PathBuf;

/// Find a binary at a configured location or in `PATH`.
///
/// A configured path wins when it points at an existing file; otherwise the
/// system `PATH` is searched for `name`.
pub fn find_binary(name: &str, configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path_str) = configured {
        let path = expand_tilde(path_str);
        if path.is_file() {
            return Some(path);
        }
        if let Ok(found) = which::which(path_str) {
            return Some(found);
        }
    }

    which::which(name).ok()
}

/// Expand `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(dirs) = directories::BaseDirs::new()
    {
        return dirs.home_dir().join(stripped);
    }
    PathBuf::from(path)
}
