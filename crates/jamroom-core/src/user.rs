use md5::{Digest, Md5};

/// A member of a room, identified by a hash of their email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Unix seconds of the last time this user queued a track, 0 if never.
    pub last_played: i64,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: user_id_for(&email),
            email,
            last_played: 0,
        }
    }

    /// Bump `last_played`, never moving it backwards.
    pub fn mark_played(&mut self, at: i64) {
        self.last_played = self.last_played.max(at);
    }
}

/// Derive the stable user id for an email (lowercase hex MD5).
pub fn user_id_for(email: &str) -> String {
    hex::encode(Md5::digest(email.as_bytes()))
}
