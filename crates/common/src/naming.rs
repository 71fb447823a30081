//! Collision-free names for working files.
//!
//! Several jobs may write into sibling scratch directories at the same time,
//! so every artifact carries both a generation timestamp and a random suffix.

use std::path::{Path, PathBuf};

/// Build `<stem>-<unix_millis>-<uuid8>.<ext>`.
///
/// `stem` is sanitised to ASCII alphanumerics, `-` and `_`; an empty stem
/// becomes `artifact`. A leading dot on `ext` is ignored.
#[must_use]
pub fn artifact_name(stem: &str, ext: &str) -> String {
    let mut clean: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if clean.is_empty() {
        clean.push_str("artifact");
    }
    let millis = chrono::Utc::now().timestamp_millis();
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() {
        format!("{clean}-{millis}-{}", &uuid[..8])
    } else {
        format!("{clean}-{millis}-{}.{ext}", &uuid[..8])
    }
}

/// Join an [`artifact_name`] onto `dir`.
#[must_use]
pub fn artifact_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    dir.join(artifact_name(stem, ext))
}
