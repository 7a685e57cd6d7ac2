//! Jamroom Core Library
//!
//! In-memory playback queue engine for shared listening rooms: membership,
//! fair round-robin queueing, and time-based track advancement.
//!
//! The catalog (track metadata, search) and the wall clock are injected as
//! capabilities, so the engine itself does no I/O.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod clock;
pub mod playback;
pub mod room;
pub mod scheduler;
pub mod store;
pub mod track;
pub mod user;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use catalog::{Album, Artist, Catalog, CatalogError, CatalogTrack, Cover, SearchResults};
pub use clock::{Clock, SystemClock};
pub use playback::{PlaybackState, Transition};
pub use room::{Room, RoomError};
pub use store::{ErrorKind, RoomManager, StoreError};
pub use track::Track;
pub use user::User;
