//! In-memory room store
//!
//! Rooms live in an insertion-ordered table. The table lock is only held to
//! look entries up or change membership of the table; every room has its own
//! mutex so unrelated rooms never contend. Catalog lookups are awaited with
//! no lock held.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError, SearchResults};
use crate::clock::Clock;
use crate::playback::Transition;
use crate::room::{Room, RoomError};
use crate::track::Track;

type RoomSlot = Arc<Mutex<Room>>;

/// Coarse classification of [`StoreError`], for mapping onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    AlreadyMember,
    DuplicateInQueue,
    UpstreamFailure,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("Room {0} does not exist")]
    RoomNotFound(String),

    #[error("Room {0} already exists")]
    RoomAlreadyExists(String),

    #[error("Catalog lookup failed: {0}")]
    Upstream(#[from] CatalogError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Room(RoomError::AlreadyMember { .. }) => ErrorKind::AlreadyMember,
            StoreError::Room(RoomError::UserNotInRoom { .. }) | StoreError::RoomNotFound(_) => {
                ErrorKind::NotFound
            }
            StoreError::Room(RoomError::DuplicateInQueue { .. }) => ErrorKind::DuplicateInQueue,
            StoreError::RoomAlreadyExists(_) => ErrorKind::AlreadyExists,
            StoreError::Upstream(_) => ErrorKind::UpstreamFailure,
        }
    }
}

pub struct RoomManager {
    rooms: RwLock<IndexMap<String, RoomSlot>>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
}

impl RoomManager {
    pub fn new(catalog: Arc<dyn Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: RwLock::new(IndexMap::new()),
            catalog,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.read().is_empty()
    }

    fn slot(&self, name: &str) -> Result<RoomSlot, StoreError> {
        self.rooms
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::RoomNotFound(name.to_string()))
    }

    /// Lock a room previously looked up by `name`, failing if it was evicted
    /// in the meantime.
    fn lock_live<'a>(name: &str, slot: &'a RoomSlot) -> Result<MutexGuard<'a, Room>, StoreError> {
        let room = slot.lock();
        if room.is_retired() {
            return Err(StoreError::RoomNotFound(name.to_string()));
        }
        Ok(room)
    }

    pub fn create_room(&self, name: &str) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.write();
        if rooms.contains_key(name) {
            return Err(StoreError::RoomAlreadyExists(name.to_string()));
        }
        let room = Room::new(name, self.clock.now_ms());
        rooms.insert(name.to_string(), Arc::new(Mutex::new(room.clone())));

        tracing::info!(room = %name, "Room created");
        Ok(room)
    }

    /// Snapshot of a single room.
    pub fn get_room(&self, name: &str) -> Result<Room, StoreError> {
        let slot = self.slot(name)?;
        let room = Self::lock_live(name, &slot)?;
        Ok(room.clone())
    }

    /// Snapshots of every room, oldest first.
    pub fn list_rooms(&self) -> Vec<Room> {
        let slots: Vec<RoomSlot> = self.rooms.read().values().cloned().collect();
        slots.iter().map(|slot| slot.lock().clone()).collect()
    }

    pub fn join_room(&self, name: &str, email: &str) -> Result<Room, StoreError> {
        let slot = self.slot(name)?;
        let mut room = Self::lock_live(name, &slot)?;
        let user_id = room.add_user(email, self.clock.now_ms())?.id.clone();

        tracing::info!(room = %name, user_id = %user_id, "User joined room");
        Ok(room.clone())
    }

    /// Queue tracks for `user_id`, in the order given.
    ///
    /// Each id is validated against the room, then resolved through the
    /// catalog with the room unlocked. Everything resolved before the first
    /// failure is committed in one step, so a failing id never rolls back the
    /// ones before it.
    pub async fn enqueue_tracks(
        &self,
        name: &str,
        user_id: &str,
        catalog_ids: &[String],
    ) -> Result<Room, StoreError> {
        let slot = self.slot(name)?;
        let mut staged: Vec<Track> = Vec::with_capacity(catalog_ids.len());
        let mut failure: Option<StoreError> = None;

        for catalog_id in catalog_ids {
            let uri = self.catalog.track_uri(catalog_id);
            let checked = Self::lock_live(name, &slot).and_then(|room| {
                room.check_enqueue(&uri, user_id, &staged)
                    .map_err(StoreError::from)
            });
            if let Err(err) = checked {
                failure = Some(err);
                break;
            }

            match self.catalog.get_track(catalog_id).await {
                Ok(meta) => staged.push(Track::queued(meta, user_id, self.clock.now_secs())),
                Err(err) => {
                    tracing::warn!(room = %name, catalog_id = %catalog_id, error = %err, "Catalog lookup failed");
                    failure = Some(err.into());
                    break;
                }
            }
        }

        let staged_count = staged.len();
        let mut room = Self::lock_live(name, &slot)?;
        let committed = room.enqueue(staged, user_id, self.clock.now_ms());
        let snapshot = room.clone();
        drop(room);

        match committed {
            Ok(accepted) if accepted > 0 => {
                tracing::info!(
                    room = %name,
                    user_id = %user_id,
                    accepted,
                    current = snapshot.current_track().map_or("", |t| t.uri.as_str()),
                    "Tracks enqueued"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(room = %name, staged = staged_count, error = %err, "Commit rejected a track");
                return Err(err.into());
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(snapshot),
        }
    }

    /// Skip to the next queued track, even if the current one is still playing.
    pub fn advance_track(&self, name: &str) -> Result<Room, StoreError> {
        let slot = self.slot(name)?;
        let mut room = Self::lock_live(name, &slot)?;
        let transition = room.skip(self.clock.now_ms());
        log_transition(name, &transition, "skip");
        Ok(room.clone())
    }

    /// Advance every room whose current track has run out.
    pub fn advance_expired(&self) -> Vec<(String, Transition)> {
        let now_ms = self.clock.now_ms();
        let slots: Vec<RoomSlot> = self.rooms.read().values().cloned().collect();

        slots
            .iter()
            .filter_map(|slot| {
                let mut room = slot.lock();
                let transition = room.advance_if_finished(now_ms);
                if transition.is_change() {
                    log_transition(room.name(), &transition, "finished");
                    Some((room.name().to_string(), transition))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Drop rooms that are idle, have nothing queued and saw no activity
    /// for `max_idle`. Returns the evicted names.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        let max_idle_ms = i64::try_from(max_idle.as_millis()).unwrap_or(i64::MAX);
        let cutoff_ms = self.clock.now_ms().saturating_sub(max_idle_ms);
        let mut evicted = Vec::new();

        self.rooms.write().retain(|name, slot| {
            let mut room = slot.lock();
            if room.is_abandoned(cutoff_ms) {
                room.retire();
                evicted.push(name.clone());
                false
            } else {
                true
            }
        });

        for name in &evicted {
            tracing::info!(room = %name, "Room evicted after inactivity");
        }
        evicted
    }

    pub async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, StoreError> {
        tracing::debug!(query = %query, limit, "Searching catalog");
        self.catalog.search(query, limit).await.map_err(|err| {
            tracing::warn!(query = %query, error = %err, "Catalog search failed");
            StoreError::Upstream(err)
        })
    }
}

fn log_transition(room: &str, transition: &Transition, cause: &'static str) {
    match transition {
        Transition::Promoted { previous, next } => tracing::info!(
            room = %room,
            previous = previous.as_deref().unwrap_or(""),
            next = %next,
            cause,
            "Track promoted"
        ),
        Transition::Stopped { previous } => {
            tracing::info!(room = %room, previous = %previous, cause, "Playback stopped");
        }
        Transition::Unchanged => tracing::debug!(room = %room, cause, "Nothing to play"),
    }
}
