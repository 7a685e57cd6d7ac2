//! Catalog capability
//!
//! The engine only needs two things from the outside world: metadata for a
//! track id, and free-text search. Implementations live outside this crate
//! (see the Spotify client in `jamroom-server`) and are injected into
//! [`RoomManager`](crate::RoomManager) as `Arc<dyn Catalog>`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::track::Track;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cover {
    pub height: u32,
    pub width: u32,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Album {
    pub name: String,
    pub uri: String,
    pub images: Vec<Cover>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artist {
    pub name: String,
    pub uri: String,
}

/// Track metadata as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub uri: String,
    pub name: String,
    pub duration_ms: u32,
    pub album: Album,
    pub artists: Vec<Artist>,
}

/// Search results. Tracks carry no submitting user.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub tracks: Vec<Track>,
    pub artists: Vec<Artist>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog item not found: {0}")]
    NotFound(String),

    #[error("Catalog rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Catalog rate limit exceeded")]
    RateLimited,

    #[error("Catalog API error (code {code}): {message}")]
    Api { code: u16, message: String },

    #[error("Catalog request failed: {0}")]
    Transport(String),

    #[error("Catalog returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolve a catalog id into the URI used for duplicate detection.
    fn track_uri(&self, catalog_id: &str) -> String;

    async fn get_track(&self, catalog_id: &str) -> Result<CatalogTrack, CatalogError>;

    async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, CatalogError>;
}
