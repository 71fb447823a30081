use {
    courier_media::MediaKind,
    serde::{Deserialize, Serialize},
    std::path::PathBuf,
};

use crate::{error::ErrorKind, remote::ChatId};

/// Simpler payload substituted after a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// The source message carried no media.
    NoMediaInSource,
    /// The media never finished downloading.
    DownloadTimedOut,
    /// Edits failed; the unedited original was sent.
    OriginalAfterTransformFailure,
    /// Edits were requested for a kind that cannot be edited.
    EditsSkipped,
    /// The watermark could not be read and was left out.
    WatermarkDropped,
}

/// What a successful run sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayReport {
    pub job_id: String,
    pub chat_id: ChatId,
    /// `None` for text-only sends.
    pub media: Option<MediaKind>,
    pub edited: bool,
    pub fallbacks: Vec<Fallback>,
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Success(RelayReport),
    Failure {
        kind: ErrorKind,
        message: String,
        log_tail: Vec<String>,
        log_file: PathBuf,
    },
}

impl PipelineOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}
