//! Destination identifiers: numeric chat ids or public handles.

use {
    std::{fmt, time::Duration},
    tracing::{debug, info},
};

use crate::{
    bridge::AsyncBridge,
    error::BridgeError,
    remote::ChatId,
};

const LINK_PREFIXES: &[&str] = &[
    "https://t.me/",
    "http://t.me/",
    "t.me/",
    "https://telegram.me/",
    "http://telegram.me/",
    "telegram.me/",
];

const RESOLVE_PREFIX: &str = "tg://resolve?";

/// A parsed destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Chat(ChatId),
    /// Public handle without the leading `@`. Empty when the input had no
    /// usable handle.
    Handle(String),
}

impl Destination {
    /// Parse a user-supplied identifier. Never fails; unusable handles come
    /// back as an empty [`Destination::Handle`].
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Ok(id) = input.parse::<ChatId>() {
            return Self::Chat(id);
        }
        Self::Handle(extract_handle(input).to_string())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(id) => write!(f, "{id}"),
            Self::Handle(handle) => write!(f, "@{handle}"),
        }
    }
}

fn extract_handle(input: &str) -> &str {
    if let Some(query) = input.strip_prefix(RESOLVE_PREFIX) {
        return query
            .split('&')
            .find_map(|pair| pair.strip_prefix("domain="))
            .map(trim_handle)
            .unwrap_or_default();
    }

    let rest = LINK_PREFIXES
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(input, prefix))
        .unwrap_or(input);
    trim_handle(rest)
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &input[prefix.len()..])
}

/// Drop a leading `@` and anything from the first `/`, `?` or `#`.
fn trim_handle(raw: &str) -> &str {
    let raw = raw.trim().trim_start_matches('@');
    let end = raw.find(['/', '?', '#', '&']).unwrap_or(raw.len());
    raw[..end].trim()
}

/// Why a destination could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("destination has no usable handle")]
    EmptyHandle,

    #[error("handle lookup failed: {0}")]
    Lookup(#[from] BridgeError),
}

/// Resolve `destination` to a chat id. Numeric ids need no remote call.
pub async fn resolve_destination(
    bridge: &AsyncBridge,
    destination: &Destination,
    timeout: Duration,
) -> Result<ChatId, ResolveError> {
    match destination {
        Destination::Chat(id) => {
            debug!(chat_id = id, "destination is a numeric id");
            Ok(*id)
        },
        Destination::Handle(handle) if handle.is_empty() => Err(ResolveError::EmptyHandle),
        Destination::Handle(handle) => {
            let chat = bridge.search_public_chat(handle, timeout).await?;
            info!(handle = %handle, chat_id = chat.id, "resolved destination handle");
            Ok(chat.id)
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("123456", Destination::Chat(123_456))]
    #[case("-1001234567890", Destination::Chat(-1_001_234_567_890))]
    #[case(" 42 ", Destination::Chat(42))]
    #[case("@channel", Destination::Handle("channel".into()))]
    #[case("channel", Destination::Handle("channel".into()))]
    #[case("t.me/channel", Destination::Handle("channel".into()))]
    #[case("https://t.me/channel/123", Destination::Handle("channel".into()))]
    #[case("HTTPS://T.ME/channel", Destination::Handle("channel".into()))]
    #[case("http://telegram.me/channel?start=x", Destination::Handle("channel".into()))]
    #[case("tg://resolve?domain=channel&post=5", Destination::Handle("channel".into()))]
    #[case("https://t.me/@channel", Destination::Handle("channel".into()))]
    #[case("@", Destination::Handle(String::new()))]
    #[case("https://t.me/", Destination::Handle(String::new()))]
    #[case("tg://resolve?post=5", Destination::Handle(String::new()))]
    fn parses_destination_forms(#[case] input: &str, #[case] expected: Destination) {
        assert_eq!(Destination::parse(input), expected);
    }

    #[test]
    fn displays_handles_with_at() {
        assert_eq!(Destination::Handle("news".into()).to_string(), "@news");
        assert_eq!(Destination::Chat(-5).to_string(), "-5");
    }
}
