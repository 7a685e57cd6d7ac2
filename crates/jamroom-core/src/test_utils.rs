//! Test doubles for the engine's capabilities.
//!
//! `StaticCatalog` serves a fixed set of tracks from memory and can be told to
//! fail on specific ids or queries. `ManualClock` only moves when told to.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::catalog::{Album, Artist, Catalog, CatalogError, CatalogTrack, SearchResults};
use crate::clock::Clock;
use crate::track::Track;

#[derive(Default)]
pub struct StaticCatalog {
    tracks: Mutex<HashMap<String, CatalogTrack>>,
    failing: Mutex<HashSet<String>>,
    lookups: AtomicUsize,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_track(self, id: &str, name: &str, duration_ms: u32) -> Self {
        self.insert(id, name, duration_ms);
        self
    }

    pub fn insert(&self, id: &str, name: &str, duration_ms: u32) {
        let track = CatalogTrack {
            uri: self.track_uri(id),
            name: name.to_string(),
            duration_ms,
            album: Album {
                name: format!("{name} (album)"),
                uri: format!("static:album:{id}"),
                images: Vec::new(),
            },
            artists: vec![Artist {
                name: format!("{name} artist"),
                uri: format!("static:artist:{id}"),
            }],
        };
        self.tracks.lock().insert(id.to_string(), track);
    }

    /// Make lookups of `id` (or searches for `id`) fail.
    pub fn fail_on(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    /// Number of `get_track` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    fn track_uri(&self, catalog_id: &str) -> String {
        format!("static:track:{catalog_id}")
    }

    async fn get_track(&self, catalog_id: &str) -> Result<CatalogTrack, CatalogError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(catalog_id) {
            return Err(CatalogError::Transport(format!("lookup of {catalog_id} failed")));
        }
        self.tracks
            .lock()
            .get(catalog_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(catalog_id.to_string()))
    }

    async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, CatalogError> {
        if self.failing.lock().contains(query) {
            return Err(CatalogError::Transport(format!("search for {query} failed")));
        }
        let needle = query.to_lowercase();
        let mut matches: Vec<CatalogTrack> = self
            .tracks
            .lock()
            .values()
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.uri.cmp(&b.uri));
        matches.truncate(limit as usize);

        let artists = matches.iter().flat_map(|t| t.artists.clone()).collect();
        Ok(SearchResults {
            tracks: matches.into_iter().map(Track::unowned).collect(),
            artists,
        })
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
