//! JSON projections of engine state.

use jamroom_core::{Album, Artist, PlaybackState, Room, SearchResults, Track, User};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub email: String,
    pub id: String,
    pub last_play: i64,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id.clone(),
            last_play: user.last_played,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackView {
    pub album: Album,
    pub artists: Vec<Artist>,
    pub duration: u32,
    pub name: String,
    pub spotify_uri: String,
    pub added: i64,
    pub started: Option<i64>,
    pub user: Option<UserView>,
}

impl TrackView {
    /// Project `track`, resolving its submitter against `room` when given.
    pub fn new(track: &Track, room: Option<&Room>) -> Self {
        let user = room
            .zip(track.user_id.as_deref())
            .and_then(|(room, user_id)| room.user(user_id))
            .map(UserView::from);

        Self {
            album: track.album.clone(),
            artists: track.artists.clone(),
            duration: track.duration_ms,
            name: track.name.clone(),
            spotify_uri: track.uri.clone(),
            added: track.added,
            started: track.started,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub name: String,
    pub state: PlaybackState,
    pub current_track: Option<TrackView>,
    pub queue: Vec<TrackView>,
    pub users: Vec<UserView>,
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            name: room.name().to_string(),
            state: room.state(),
            current_track: room.current_track().map(|t| TrackView::new(t, Some(room))),
            queue: room
                .queue()
                .iter()
                .map(|t| TrackView::new(t, Some(room)))
                .collect(),
            users: room.users().iter().map(UserView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResultsView {
    pub artists: Vec<Artist>,
    pub tracks: Vec<TrackView>,
}

impl From<SearchResults> for SearchResultsView {
    fn from(results: SearchResults) -> Self {
        Self {
            tracks: results
                .tracks
                .iter()
                .map(|t| TrackView::new(t, None))
                .collect(),
            artists: results.artists,
        }
    }
}
