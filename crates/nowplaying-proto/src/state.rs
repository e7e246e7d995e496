use crate::protocol::BusEvent;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest playback state as published on the bus.  `title` and `artist`
/// arrive as independent messages and may briefly disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    /// Monotonic revision counter, bumped on every applied write.
    pub rev: u64,
    pub session_active: bool,
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl PlaybackState {
    /// `"{artist} - {title}"`, or the bare title.  Never shows an artist
    /// without a title.
    pub fn display_title(&self) -> Option<String> {
        let title = self.title.as_deref()?;
        match self.artist.as_deref() {
            Some(artist) => Some(format!("{} - {}", artist, title)),
            None => Some(title.to_string()),
        }
    }
}

/// Consistent read of the store at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSnapshot {
    pub rev: u64,
    pub session_active: bool,
    pub display_title: Option<String>,
}

/// Shared holder for [`PlaybackState`].  The bus client writes, the render
/// loop takes snapshots; guards never outlive a single write or clone.
pub struct MetadataStore {
    state: Arc<RwLock<PlaybackState>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PlaybackState::default())),
        }
    }

    pub async fn snapshot(&self) -> MetadataSnapshot {
        let state = self.state.read().await;
        MetadataSnapshot {
            rev: state.rev,
            session_active: state.session_active,
            display_title: state.display_title(),
        }
    }

    pub async fn get_state(&self) -> PlaybackState {
        self.state.read().await.clone()
    }

    pub async fn apply(&self, event: BusEvent) {
        match event {
            BusEvent::TitleSet(title) => self.set_title(title).await,
            BusEvent::ArtistSet(artist) => self.set_artist(artist).await,
            BusEvent::SessionStart => self.start_session().await,
            BusEvent::SessionEnd => self.end_session().await,
            BusEvent::TrackEnd => self.end_track().await,
        }
    }

    pub async fn set_title(&self, title: Option<String>) {
        let mut state = self.state.write().await;
        state.title = title;
        state.rev += 1;
    }

    pub async fn set_artist(&self, artist: Option<String>) {
        let mut state = self.state.write().await;
        state.artist = artist;
        state.rev += 1;
    }

    pub async fn start_session(&self) {
        let mut state = self.state.write().await;
        state.session_active = true;
        state.rev += 1;
    }

    pub async fn end_session(&self) {
        let mut state = self.state.write().await;
        state.session_active = false;
        state.title = None;
        state.artist = None;
        state.rev += 1;
    }

    /// Track finished: drop title and artist, keep the session open.
    pub async fn end_track(&self) {
        let mut state = self.state.write().await;
        state.title = None;
        state.artist = None;
        state.rev += 1;
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}
