use serde::{Deserialize, Serialize};

/// The media kinds the relay can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Document,
}

impl MediaKind {
    /// Whether blur regions and watermarks can be applied.
    #[must_use]
    pub fn is_editable(self) -> bool {
        !matches!(self, Self::Document)
    }

    /// Still images are encoded as a single frame; everything else keeps its
    /// audio and re-encodes video only.
    #[must_use]
    pub fn is_still(self) -> bool {
        matches!(self, Self::Photo)
    }

    /// Extension used for transform output.
    #[must_use]
    pub fn output_extension(self) -> &'static str {
        match self {
            Self::Photo => "jpg",
            Self::Video | Self::Animation => "mp4",
            Self::Document => "bin",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" | "image" => Ok(Self::Photo),
            "video" => Ok(Self::Video),
            "animation" | "gif" => Ok(Self::Animation),
            "document" | "file" => Ok(Self::Document),
            other => Err(crate::Error::message(format!("unknown media kind: {other}"))),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("photo", MediaKind::Photo)]
    #[case("IMAGE", MediaKind::Photo)]
    #[case("video", MediaKind::Video)]
    #[case("gif", MediaKind::Animation)]
    #[case(" document ", MediaKind::Document)]
    fn parses_kind(#[case] input: &str, #[case] expected: MediaKind) {
        assert_eq!(input.parse::<MediaKind>().unwrap(), expected);
    }

    #[test]
    fn documents_are_not_editable() {
        assert!(!MediaKind::Document.is_editable());
        assert!(MediaKind::Animation.is_editable());
        assert!(MediaKind::Photo.is_still());
        assert_eq!(MediaKind::Video.output_extension(), "mp4");
    }
}
