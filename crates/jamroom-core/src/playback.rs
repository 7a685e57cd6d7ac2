//! Playback clock
//!
//! Decides when the current track of a room has run out. Start times are
//! stored in whole seconds and durations in milliseconds, matching what the
//! catalog reports.

use serde::Serialize;

use crate::track::Track;

/// `true` once `now_ms` has reached the end of `track`.
///
/// A track that never started is not considered finished.
pub fn has_finished(track: &Track, now_ms: i64) -> bool {
    track.ends_at_ms().is_some_and(|end| now_ms >= end)
}

/// Observable state of a room's playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// What happened to the current track when a room advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// `next` became current, replacing `previous` if there was one.
    Promoted {
        previous: Option<String>,
        next: String,
    },
    /// The room ran out of tracks.
    Stopped { previous: String },
    /// Nothing was playing and nothing was queued.
    Unchanged,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}
