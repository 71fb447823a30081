use {
    courier_common::FromMessage,
    std::{path::PathBuf, time::Duration},
};

use crate::kind::MediaKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{tool} binary not found")]
    ToolNotFound { tool: &'static str },

    #[error("{tool} exited with status {}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    ToolFailed {
        tool: &'static str,
        status: Option<i32>,
        transcript: String,
    },

    #[error("{tool} did not finish within {}s", .after.as_secs())]
    Timeout {
        tool: &'static str,
        after: Duration,
        transcript: String,
    },

    #[error("{kind} media cannot be edited")]
    NotEditable { kind: MediaKind },

    #[error("transform produced no output at {}", .path.display())]
    EmptyOutput { path: PathBuf, transcript: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Tool output captured before the failure, when there is any.
    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        match self {
            Self::ToolFailed { transcript, .. }
            | Self::Timeout { transcript, .. }
            | Self::EmptyOutput { transcript, .. } => Some(transcript),
            _ => None,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

courier_common::impl_context!();
