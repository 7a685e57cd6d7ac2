use crate::playback::{self, PlaybackState, Transition};
use crate::scheduler;
use crate::track::Track;
use crate::user::User;

/// A playback session: one current track, a fair queue and its members.
#[derive(Debug, Clone)]
pub struct Room {
    name: String,
    current_track: Option<Track>,
    queue: Vec<Track>,
    users: Vec<User>,
    last_activity_ms: i64,
    retired: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("{email} is already in room {room}")]
    AlreadyMember { room: String, email: String },

    #[error("User {user_id} is not in room {room}")]
    UserNotInRoom { room: String, user_id: String },

    #[error("Track {uri} is already queued or playing in room {room}")]
    DuplicateInQueue { room: String, uri: String },
}

impl Room {
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            name: name.into(),
            current_track: None,
            queue: Vec::new(),
            users: Vec::new(),
            last_activity_ms: now_ms,
            retired: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn state(&self) -> PlaybackState {
        if self.current_track.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.user(user_id).is_some()
    }

    /// `true` if `uri` is the current track or anywhere in the queue.
    pub fn contains_uri(&self, uri: &str) -> bool {
        self.current_track.iter().chain(self.queue.iter()).any(|t| t.uri == uri)
    }

    pub(crate) fn touch(&mut self, now_ms: i64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }

    /// Add a member. Returns the new user.
    pub fn add_user(&mut self, email: &str, now_ms: i64) -> Result<&User, RoomError> {
        if self.users.iter().any(|u| u.email == email) {
            return Err(RoomError::AlreadyMember {
                room: self.name.clone(),
                email: email.to_string(),
            });
        }
        let index = self.users.len();
        self.users.push(User::new(email));
        self.touch(now_ms);
        Ok(&self.users[index])
    }

    /// Check whether `uri` may be queued by `user_id`. `staged` holds tracks
    /// accepted earlier in the same batch but not yet committed.
    pub fn check_enqueue(&self, uri: &str, user_id: &str, staged: &[Track]) -> Result<(), RoomError> {
        if self.contains_uri(uri) || staged.iter().any(|t| t.uri == uri) {
            return Err(RoomError::DuplicateInQueue {
                room: self.name.clone(),
                uri: uri.to_string(),
            });
        }
        if !self.has_user(user_id) {
            return Err(RoomError::UserNotInRoom {
                room: self.name.clone(),
                user_id: user_id.to_string(),
            });
        }
        Ok(())
    }

    /// Commit a batch of tracks submitted by `user_id`.
    ///
    /// Tracks are accepted in order until one is rejected; accepted tracks
    /// stay queued either way. The queue is then reordered and, if the room
    /// was idle, its head starts playing.
    pub fn enqueue(&mut self, tracks: Vec<Track>, user_id: &str, now_ms: i64) -> Result<usize, RoomError> {
        let now_secs = now_ms.div_euclid(1000);
        let mut accepted = 0;
        let mut rejection = None;

        for track in tracks {
            if let Err(err) = self.check_enqueue(&track.uri, user_id, &[]) {
                rejection = Some(err);
                break;
            }
            self.queue.push(track);
            accepted += 1;
        }

        if accepted > 0 {
            if let Some(user) = self.users.iter_mut().find(|u| u.id == user_id) {
                user.mark_played(now_secs);
            }
            self.reschedule();
            if self.current_track.is_none() {
                self.promote_next(now_secs);
            }
            self.touch(now_ms);
        }

        match rejection {
            Some(err) => Err(err),
            None => Ok(accepted),
        }
    }

    /// Reorder the pending queue fairly.
    pub fn reschedule(&mut self) {
        let pending = std::mem::take(&mut self.queue);
        let users = &self.users;
        self.queue = scheduler::fair_order(pending, |user_id| {
            users
                .iter()
                .find(|u| u.id == user_id)
                .map_or(0, |u| u.last_played)
        });
    }

    /// Make the queue head current, dropping whatever was playing.
    fn promote_next(&mut self, now_secs: i64) -> Transition {
        let previous = self.current_track.take().map(|t| t.uri);
        if self.queue.is_empty() {
            return match previous {
                Some(previous) => Transition::Stopped { previous },
                None => Transition::Unchanged,
            };
        }
        let mut next = self.queue.remove(0);
        next.started = Some(now_secs);
        let transition = Transition::Promoted {
            previous,
            next: next.uri.clone(),
        };
        self.current_track = Some(next);
        transition
    }

    /// Skip to the next track regardless of how much of the current one is left.
    pub fn skip(&mut self, now_ms: i64) -> Transition {
        let transition = self.promote_next(now_ms.div_euclid(1000));
        self.touch(now_ms);
        transition
    }

    /// Advance if the current track has run out. No-op otherwise.
    pub fn advance_if_finished(&mut self, now_ms: i64) -> Transition {
        let finished = self
            .current_track
            .as_ref()
            .is_some_and(|current| playback::has_finished(current, now_ms));
        if !finished {
            return Transition::Unchanged;
        }
        let transition = self.promote_next(now_ms.div_euclid(1000));
        self.touch(now_ms);
        transition
    }

    /// Idle with nothing queued and untouched since `cutoff_ms`.
    pub fn is_abandoned(&self, cutoff_ms: i64) -> bool {
        self.current_track.is_none() && self.queue.is_empty() && self.last_activity_ms < cutoff_ms
    }
}
