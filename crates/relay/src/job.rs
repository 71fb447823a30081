//! Relay job input: the queue's wire format and the validated job.

use {
    courier_media::{Anchor, NormalizedRect, parse_rects},
    serde::{Deserialize, Serialize},
};

use crate::{
    destination::Destination,
    remote::{ChatId, MessageId},
};

fn default_true() -> bool {
    true
}

/// A job as delivered by the job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    /// Assigned when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub src_chat_id: Option<ChatId>,
    #[serde(default)]
    pub src_message_id: Option<MessageId>,
    pub target_identifier: String,
    #[serde(default)]
    pub caption_text: String,
    #[serde(default = "default_true")]
    pub send_with_media: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur_rects: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_anchor: Option<[f64; 2]>,
}

impl Default for JobInput {
    fn default() -> Self {
        Self {
            job_id: None,
            src_chat_id: None,
            src_message_id: None,
            target_identifier: String::new(),
            caption_text: String::new(),
            send_with_media: true,
            watermark_uri: None,
            blur_rects: None,
            watermark_anchor: None,
        }
    }
}

/// Where the source message lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One relay request, validated at the boundary and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayJob {
    id: String,
    source: Option<SourceRef>,
    destination: Destination,
    caption: String,
    send_with_media: bool,
    watermark_uri: Option<String>,
    rects: Vec<NormalizedRect>,
    anchor: Anchor,
}

impl RelayJob {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Both source ids, or `None` when either is missing.
    #[must_use]
    pub fn source(&self) -> Option<SourceRef> {
        self.source
    }

    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    #[must_use]
    pub fn caption(&self) -> &str {
        &self.caption
    }

    #[must_use]
    pub fn send_with_media(&self) -> bool {
        self.send_with_media
    }

    #[must_use]
    pub fn watermark_uri(&self) -> Option<&str> {
        self.watermark_uri.as_deref()
    }

    #[must_use]
    pub fn rects(&self) -> &[NormalizedRect] {
        &self.rects
    }

    #[must_use]
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Whether any edit parameter is present.
    #[must_use]
    pub fn has_edits(&self) -> bool {
        !self.rects.is_empty() || self.watermark_uri.is_some()
    }
}

impl From<JobInput> for RelayJob {
    fn from(input: JobInput) -> Self {
        let source = match (input.src_chat_id, input.src_message_id) {
            (Some(chat_id), Some(message_id)) => Some(SourceRef {
                chat_id,
                message_id,
            }),
            _ => None,
        };
        let anchor = input
            .watermark_anchor
            .map(|[x, y]| Anchor::new(x, y))
            .unwrap_or_default();
        Self {
            id: input
                .job_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
            source,
            destination: Destination::parse(&input.target_identifier),
            caption: input.caption_text,
            send_with_media: input.send_with_media,
            watermark_uri: input.watermark_uri.filter(|uri| !uri.trim().is_empty()),
            rects: input
                .blur_rects
                .as_deref()
                .map(parse_rects)
                .unwrap_or_default(),
            anchor,
        }
    }
}
