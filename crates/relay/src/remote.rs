//! The messaging backend's request/response model and client boundary.
//!
//! Only the slice of the protocol the relay uses is modelled. The client
//! itself is external: it delivers every response through a one-shot
//! handler, usually from its own thread.

use {
    serde::{Deserialize, Serialize},
    std::{fmt, path::PathBuf},
};

/// Backend conversation id. Channels and supergroups are negative.
pub type ChatId = i64;

/// Backend message id.
pub type MessageId = i64;

/// Backend file handle, valid only within one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub i32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local copy state of a remote file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    /// Empty until the client has picked a download location.
    pub path: String,
    pub is_downloading_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: FileId,
    /// Size in bytes, `0` when unknown.
    pub size: u64,
    pub local: LocalFile,
}

impl RemoteFile {
    #[must_use]
    pub fn new(id: FileId, size: u64) -> Self {
        Self {
            id,
            size,
            local: LocalFile::default(),
        }
    }
}

/// One rendition of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub width: u32,
    pub height: u32,
    pub photo: RemoteFile,
}

/// Content of a received message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    Photo { sizes: Vec<PhotoSize>, caption: String },
    Video { video: RemoteFile, caption: String },
    Animation { animation: RemoteFile, caption: String },
    Document { document: RemoteFile, caption: String },
    /// Anything the relay does not carry: stickers, polls, voice notes, ...
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub content: MessageContent,
}

/// Content to send; media variants point at a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputMessageContent {
    Text { text: String },
    Photo { path: PathBuf, caption: String },
    Video { path: PathBuf, caption: String },
    Animation { path: PathBuf, caption: String },
    Document { path: PathBuf, caption: String },
}

impl InputMessageContent {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
            Self::Video { .. } => "video",
            Self::Animation { .. } => "animation",
            Self::Document { .. } => "document",
        }
    }

    /// Local file carried by media variants.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Text { .. } => None,
            Self::Photo { path, .. }
            | Self::Video { path, .. }
            | Self::Animation { path, .. }
            | Self::Document { path, .. } => Some(path),
        }
    }
}

/// Requests the relay issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    SearchPublicChat {
        username: String,
    },
    GetMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
    GetFile {
        file_id: FileId,
    },
    SendMessage {
        chat_id: ChatId,
        content: InputMessageContent,
    },
}

impl Request {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchPublicChat { .. } => "searchPublicChat",
            Self::GetMessage { .. } => "getMessage",
            Self::GetFile { .. } => "getFile",
            Self::SendMessage { .. } => "sendMessage",
        }
    }
}

/// Responses the relay understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Chat(Chat),
    Message(Message),
    File(RemoteFile),
    Error { code: i32, message: String },
}

impl Response {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Message(_) => "message",
            Self::File(_) => "file",
            Self::Error { .. } => "error",
        }
    }
}

/// One-shot completion handler for a [`Request`].
pub type ResponseHandler = Box<dyn FnOnce(Response) + Send + 'static>;

/// The external messaging client.
///
/// Implementations must call each handler at most once. They may call it
/// from any thread, or never (the bridge bounds every wait).
pub trait RemoteClient: Send + Sync {
    fn send(&self, request: Request, handler: ResponseHandler);

    /// Start downloading a file without waiting for it. Progress is only
    /// observable by querying the file with [`Request::GetFile`].
    fn download_start(&self, file_id: FileId);
}
