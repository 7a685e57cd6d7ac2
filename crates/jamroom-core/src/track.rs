use crate::catalog::{Album, Artist, CatalogTrack};
use crate::scheduler::Submission;

/// A playable item in a room, with display metadata captured at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub uri: String,
    pub name: String,
    pub duration_ms: u32,
    pub album: Album,
    pub artists: Vec<Artist>,
    /// Unix seconds when the track was submitted.
    pub added: i64,
    /// Unix seconds when the track became current, `None` while pending.
    pub started: Option<i64>,
    /// Submitting user, `None` for search results.
    pub user_id: Option<String>,
}

impl Track {
    pub fn queued(meta: CatalogTrack, user_id: &str, added: i64) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            added,
            ..Self::unowned(meta)
        }
    }

    /// A track built only for display (search results).
    pub fn unowned(meta: CatalogTrack) -> Self {
        Self {
            uri: meta.uri,
            name: meta.name,
            duration_ms: meta.duration_ms,
            album: meta.album,
            artists: meta.artists,
            added: 0,
            started: None,
            user_id: None,
        }
    }

    /// Wall-clock millisecond at which playback ends, if the track has started.
    pub fn ends_at_ms(&self) -> Option<i64> {
        self.started
            .map(|started| started * 1000 + i64::from(self.duration_ms))
    }
}

impl Submission for Track {
    fn submitter(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn submitted_at(&self) -> i64 {
        self.added
    }
}
