/// Payload shairport-sync publishes when a field has no value.
pub const ABSENT_SENTINEL: &str = "--";

/// Topic suffixes below the configured base that carry playback state.
pub const TOPIC_TITLE: &str = "title";
pub const TOPIC_ARTIST: &str = "artist";
pub const TOPIC_ACTIVE_START: &str = "active_start";
pub const TOPIC_ACTIVE_END: &str = "active_end";
pub const TOPIC_PLAY_END: &str = "play_end";

const SUBSCRIBED_SUFFIXES: [&str; 5] = [
    TOPIC_TITLE,
    TOPIC_ARTIST,
    TOPIC_ACTIVE_START,
    TOPIC_ACTIVE_END,
    TOPIC_PLAY_END,
];

/// Everything the bus can tell the metadata store.
///
/// Decoded once at the boundary; `None` payloads mean the field is absent
/// (sentinel, empty, or undecodable text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    TitleSet(Option<String>),
    ArtistSet(Option<String>),
    /// An AirPlay session opened.
    SessionStart,
    /// The session closed; title and artist are gone with it.
    SessionEnd,
    /// The current track stopped; the session may continue.
    TrackEnd,
}

impl BusEvent {
    /// Decode a message received on `topic`.  Returns `None` for topics
    /// outside `topic_base` or suffixes we do not handle.
    pub fn decode(topic_base: &str, topic: &str, payload: &[u8]) -> Option<Self> {
        let suffix = topic_suffix(topic_base, topic)?;
        match suffix {
            TOPIC_TITLE => Some(BusEvent::TitleSet(normalize_text(payload))),
            TOPIC_ARTIST => Some(BusEvent::ArtistSet(normalize_text(payload))),
            TOPIC_ACTIVE_START => Some(BusEvent::SessionStart),
            TOPIC_ACTIVE_END => Some(BusEvent::SessionEnd),
            TOPIC_PLAY_END => Some(BusEvent::TrackEnd),
            _ => None,
        }
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            BusEvent::TitleSet(_) => "title",
            BusEvent::ArtistSet(_) => "artist",
            BusEvent::SessionStart => "session-start",
            BusEvent::SessionEnd => "session-end",
            BusEvent::TrackEnd => "track-end",
        }
    }
}

/// Full topic names to subscribe to under `topic_base`.
pub fn subscriptions(topic_base: &str) -> Vec<String> {
    let base = topic_base.trim_end_matches('/');
    SUBSCRIBED_SUFFIXES
        .iter()
        .map(|suffix| format!("{}/{}", base, suffix))
        .collect()
}

fn topic_suffix<'a>(topic_base: &str, topic: &'a str) -> Option<&'a str> {
    let base = topic_base.trim_end_matches('/');
    topic.strip_prefix(base)?.strip_prefix('/')
}

/// Trimmed UTF-8 text, or `None` for the sentinel, blank or undecodable
/// payloads.
pub fn normalize_text(payload: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(payload).ok()?.trim();
    if text.is_empty() || text == ABSENT_SENTINEL {
        return None;
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "iotstack/shairport";

    #[test]
    fn test_decode_text_topics() {
        assert_eq!(
            BusEvent::decode(BASE, "iotstack/shairport/title", b"  Yesterday \n"),
            Some(BusEvent::TitleSet(Some("Yesterday".into())))
        );
        assert_eq!(
            BusEvent::decode(BASE, "iotstack/shairport/artist", "Sigur Rós".as_bytes()),
            Some(BusEvent::ArtistSet(Some("Sigur Rós".into())))
        );
    }

    #[test]
    fn test_absent_payloads() {
        let topic = "iotstack/shairport/title";
        assert_eq!(
            BusEvent::decode(BASE, topic, b"--"),
            Some(BusEvent::TitleSet(None))
        );
        assert_eq!(BusEvent::decode(BASE, topic, b"   "), Some(BusEvent::TitleSet(None)));
        assert_eq!(
            BusEvent::decode(BASE, topic, &[0xff, 0xfe, 0x41]),
            Some(BusEvent::TitleSet(None))
        );
    }

    #[test]
    fn test_lifecycle_topics_ignore_payload() {
        assert_eq!(
            BusEvent::decode(BASE, "iotstack/shairport/active_start", b"--"),
            Some(BusEvent::SessionStart)
        );
        assert_eq!(
            BusEvent::decode(BASE, "iotstack/shairport/active_end", b""),
            Some(BusEvent::SessionEnd)
        );
        assert_eq!(
            BusEvent::decode(BASE, "iotstack/shairport/play_end", b"x"),
            Some(BusEvent::TrackEnd)
        );
    }

    #[test]
    fn test_unrelated_topics() {
        assert_eq!(BusEvent::decode(BASE, "iotstack/shairport/cover", b"\x00"), None);
        assert_eq!(BusEvent::decode(BASE, "iotstack/shairport/play_start", b""), None);
        assert_eq!(BusEvent::decode(BASE, "other/shairport/title", b"x"), None);
        // prefix match must stop at a topic level boundary
        assert_eq!(BusEvent::decode(BASE, "iotstack/shairport2/title", b"x"), None);
    }

    #[test]
    fn test_subscriptions() {
        let topics = subscriptions("home/airplay/");
        assert_eq!(topics.len(), 5);
        assert!(topics.contains(&"home/airplay/title".to_string()));
        assert!(topics.contains(&"home/airplay/play_end".to_string()));
    }
}
