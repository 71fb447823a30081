use {
    courier_common::FromMessage,
    serde::{Deserialize, Serialize},
    std::{error::Error as StdError, fmt, time::Duration},
};

/// Job-level failure classes reported in a [`crate::PipelineOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DestinationResolutionFailed,
    SourceFetchFailed,
    DownloadTimeout,
    /// Recoverable: the original file is sent instead.
    TransformFailed,
    SendFailed,
    InvalidInput,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DestinationResolutionFailed => "destination_resolution_failed",
            Self::SourceFetchFailed => "source_fetch_failed",
            Self::DownloadTimeout => "download_timeout",
            Self::TransformFailed => "transform_failed",
            Self::SendFailed => "send_failed",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure of one bridged remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// No response within the bound. The remote call is not cancelled.
    #[error("{request} timed out after {}ms", .after.as_millis())]
    Timeout {
        request: &'static str,
        after: Duration,
    },

    /// The backend answered with an error value.
    #[error("{request} failed: {code} {message}")]
    Remote {
        request: &'static str,
        code: i32,
        message: String,
    },

    /// The client dropped the handler without answering.
    #[error("{request} was dropped by the client")]
    Dropped { request: &'static str },

    /// The response variant does not fit the request.
    #[error("{request} returned unexpected {response} response")]
    UnexpectedResponse {
        request: &'static str,
        response: &'static str,
    },
}

impl BridgeError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors surfaced by relay components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Media(#[from] courier_media::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

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

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
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

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_errors_render_request_name() {
        let err = BridgeError::Timeout {
            request: "getMessage",
            after: Duration::from_secs(25),
        };
        assert_eq!(err.to_string(), "getMessage timed out after 25000ms");
        assert!(err.is_timeout());

        let err = BridgeError::Remote {
            request: "searchPublicChat",
            code: 400,
            message: "USERNAME_NOT_OCCUPIED".into(),
        };
        assert_eq!(
            err.to_string(),
            "searchPublicChat failed: 400 USERNAME_NOT_OCCUPIED"
        );
        assert!(!err.is_timeout());
    }

    #[test]
    fn kinds_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::DownloadTimeout).unwrap(),
            "\"download_timeout\""
        );
        assert_eq!(ErrorKind::InvalidInput.to_string(), "invalid_input");
    }

    #[test]
    fn context_wraps_messages() {
        let missing: Option<u8> = None;
        let err = missing.context("no chat").unwrap_err();
        assert_eq!(err.to_string(), "no chat");
    }
}
