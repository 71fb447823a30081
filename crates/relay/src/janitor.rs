//! Scratch-directory cleanup run at the end of every job.

use {
    std::path::Path,
    tracing::{debug, warn},
};

/// Delete every regular file directly under `scratch_dir`.
///
/// Subdirectories and the directory itself are left alone. Failures are
/// logged and skipped. Returns the number of files removed.
pub async fn cleanup(scratch_dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(scratch_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %scratch_dir.display(), error = %e, "scratch dir not readable");
            return 0;
        },
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %scratch_dir.display(), error = %e, "scratch listing failed");
                break;
            },
        };
        let path = entry.path();
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove scratch file"),
            },
            Ok(_) => {},
            Err(e) => warn!(path = %path.display(), error = %e, "failed to stat scratch entry"),
        }
    }
    debug!(dir = %scratch_dir.display(), removed, "scratch cleaned");
    removed
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_only_top_level_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("job-1");
        std::fs::create_dir_all(scratch.join("nested")).unwrap();
        std::fs::write(scratch.join("a.mp4"), b"a").unwrap();
        std::fs::write(scratch.join("b.jpg"), b"").unwrap();
        std::fs::write(scratch.join("nested").join("keep.txt"), b"k").unwrap();

        assert_eq!(cleanup(&scratch).await, 2);
        assert!(scratch.is_dir());
        assert!(scratch.join("nested").join("keep.txt").exists());
        assert!(!scratch.join("a.mp4").exists());
        assert!(!scratch.join("b.jpg").exists());
    }

    #[tokio::test]
    async fn missing_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup(&dir.path().join("gone")).await, 0);
    }
}
