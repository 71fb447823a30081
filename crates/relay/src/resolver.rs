//! Picking the file to relay out of a message's content.

use courier_media::MediaKind;

use crate::remote::{FileId, MessageContent, PhotoSize};

/// What to download and how to send it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub file_id: FileId,
}

/// Extract the media descriptor, or `None` for content without media.
///
/// Photos pick the rendition with the largest byte size, first one on ties.
#[must_use]
pub fn resolve_media(content: &MessageContent) -> Option<MediaDescriptor> {
    let (kind, file_id) = match content {
        MessageContent::Photo { sizes, .. } => (MediaKind::Photo, largest_photo(sizes)?),
        MessageContent::Video { video, .. } => (MediaKind::Video, video.id),
        MessageContent::Animation { animation, .. } => (MediaKind::Animation, animation.id),
        MessageContent::Document { document, .. } => (MediaKind::Document, document.id),
        MessageContent::Text { .. } | MessageContent::Other => return None,
    };
    Some(MediaDescriptor { kind, file_id })
}

fn largest_photo(sizes: &[PhotoSize]) -> Option<FileId> {
    let mut best: Option<&PhotoSize> = None;
    for size in sizes {
        if best.is_none_or(|b| size.photo.size > b.photo.size) {
            best = Some(size);
        }
    }
    best.map(|s| s.photo.id)
}
