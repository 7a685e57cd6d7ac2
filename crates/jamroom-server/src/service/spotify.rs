//! Spotify Web API catalog
//!
//! Uses the client-credentials flow: an app token is fetched on first use and
//! refreshed shortly before it expires. Only the two endpoints the rooms need
//! are wrapped, `GET /v1/tracks/{id}` and `GET /v1/search`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jamroom_core::{Album, Artist, Catalog, CatalogError, CatalogTrack, Cover, SearchResults, Track};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";

const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Refresh the token this long before Spotify says it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Error, Debug)]
pub enum SpotifyError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded,

    #[error("Spotify API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl SpotifyError {
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimitExceeded,
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }
}

impl From<SpotifyError> for CatalogError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::Unauthorized(message) => CatalogError::Unauthorized(message),
            SpotifyError::NotFound(message) => CatalogError::NotFound(message),
            SpotifyError::RateLimitExceeded => CatalogError::RateLimited,
            SpotifyError::ApiError { code, message } => CatalogError::Api { code, message },
            SpotifyError::Http(err) => CatalogError::Transport(err.to_string()),
            SpotifyError::JsonParse(err) => CatalogError::InvalidResponse(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub accounts_url: String,
    pub api_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

pub struct SpotifyCatalog {
    client: Client,
    config: SpotifyConfig,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyCatalog {
    pub fn new(config: SpotifyConfig) -> Result<Self, SpotifyError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    /// Current app token, fetching a new one if needed.
    async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(current.value.clone());
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken, SpotifyError> {
        let url = format!("{}/api/token", self.config.accounts_url);
        debug!("Requesting Spotify app token from {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResponse = handle_response(response).await?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T, SpotifyError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.config.api_url, endpoint);
        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;
        handle_response(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, SpotifyError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("Spotify API error ({}): {}", status.as_u16(), error_text);
        return Err(SpotifyError::from_status_code(status.as_u16(), error_text));
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Bare track id for a catalog id that may already be a `spotify:track:` URI.
fn track_id(catalog_id: &str) -> &str {
    catalog_id.strip_prefix(TRACK_URI_PREFIX).unwrap_or(catalog_id)
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    fn track_uri(&self, catalog_id: &str) -> String {
        format!("{TRACK_URI_PREFIX}{}", track_id(catalog_id))
    }

    async fn get_track(&self, catalog_id: &str) -> Result<CatalogTrack, CatalogError> {
        let endpoint = format!("/v1/tracks/{}", track_id(catalog_id));
        let track: FullTrack = self.get(&endpoint, &[]).await?;
        Ok(track.into())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, CatalogError> {
        let limit = limit.to_string();
        let response: SearchResponse = self
            .get(
                "/v1/search",
                &[("q", query), ("type", "track,artist"), ("limit", limit.as_str())],
            )
            .await?;
        Ok(response.into())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct FullTrack {
    uri: String,
    name: String,
    duration_ms: u32,
    album: SimpleAlbum,
    #[serde(default)]
    artists: Vec<SimpleArtist>,
}

#[derive(Debug, Deserialize)]
struct SimpleAlbum {
    name: String,
    uri: String,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    width: Option<u32>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SimpleArtist {
    name: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Option<Paging<FullTrack>>,
    #[serde(default)]
    artists: Option<Paging<SimpleArtist>>,
}

impl From<SimpleArtist> for Artist {
    fn from(artist: SimpleArtist) -> Self {
        Artist {
            name: artist.name,
            uri: artist.uri,
        }
    }
}

impl From<FullTrack> for CatalogTrack {
    fn from(track: FullTrack) -> Self {
        CatalogTrack {
            uri: track.uri,
            name: track.name,
            duration_ms: track.duration_ms,
            album: Album {
                name: track.album.name,
                uri: track.album.uri,
                images: track
                    .album
                    .images
                    .into_iter()
                    .map(|image| Cover {
                        height: image.height.unwrap_or_default(),
                        width: image.width.unwrap_or_default(),
                        url: image.url,
                    })
                    .collect(),
            },
            artists: track.artists.into_iter().map(Artist::from).collect(),
        }
    }
}

impl From<SearchResponse> for SearchResults {
    fn from(response: SearchResponse) -> Self {
        SearchResults {
            tracks: response
                .tracks
                .map(|page| page.items)
                .unwrap_or_default()
                .into_iter()
                .map(|track| Track::unowned(track.into()))
                .collect(),
            artists: response
                .artists
                .map(|page| page.items)
                .unwrap_or_default()
                .into_iter()
                .map(Artist::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    // base64("id:secret")
    const BASIC_AUTH: &str = "Basic aWQ6c2VjcmV0";

    const TRACK_JSON: &str = r#"{
        "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
        "name": "Never Gonna Give You Up",
        "duration_ms": 213573,
        "album": {
            "name": "Whenever You Need Somebody",
            "uri": "spotify:album:6N9PS4QXF1D0OWPk0Sxtb4",
            "images": [
                {"height": 640, "width": 640, "url": "https://i.scdn.co/image/large"},
                {"height": null, "width": null, "url": "https://i.scdn.co/image/unknown"}
            ]
        },
        "artists": [
            {"name": "Rick Astley", "uri": "spotify:artist:0gxyHStUsqpMadRV0Di1Qt"}
        ]
    }"#;

    fn catalog_at(accounts_url: &str, api_url: &str) -> SpotifyCatalog {
        SpotifyCatalog::new(SpotifyConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            accounts_url: accounts_url.to_string(),
            api_url: api_url.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn catalog() -> SpotifyCatalog {
        catalog_at(DEFAULT_ACCOUNTS_URL, DEFAULT_API_URL)
    }

    async fn mock_token(server: &mut Server, expires_in: i64, hits: usize) -> mockito::Mock {
        server
            .mock("POST", "/api/token")
            .match_header("authorization", BASIC_AUTH)
            .match_body(Matcher::UrlEncoded(
                "grant_type".to_string(),
                "client_credentials".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"access_token": "app-token", "token_type": "Bearer", "expires_in": {expires_in}}}"#
            ))
            .expect(hits)
            .create_async()
            .await
    }

    #[test]
    fn test_track_uri_accepts_ids_and_uris() {
        let catalog = catalog();
        assert_eq!(catalog.track_uri("abc"), "spotify:track:abc");
        assert_eq!(catalog.track_uri("spotify:track:abc"), "spotify:track:abc");
    }

    #[test]
    fn test_full_track_conversion() {
        let track: FullTrack = serde_json::from_str(TRACK_JSON).unwrap();
        let track = CatalogTrack::from(track);

        assert_eq!(track.uri, "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.duration_ms, 213_573);
        assert_eq!(track.album.images.len(), 2);
        assert_eq!(track.album.images[0].height, 640);
        assert_eq!(track.album.images[1].width, 0);
        assert_eq!(track.artists[0].name, "Rick Astley");
    }

    #[test]
    fn test_search_response_conversion() {
        let json = format!(
            r#"{{
                "tracks": {{"items": [{TRACK_JSON}]}},
                "artists": {{"items": [{{"name": "Rick Astley", "uri": "spotify:artist:0gxyHStUsqpMadRV0Di1Qt"}}]}}
            }}"#
        );
        let response: SearchResponse = serde_json::from_str(&json).unwrap();
        let results = SearchResults::from(response);

        assert_eq!(results.tracks.len(), 1);
        assert!(results.tracks[0].user_id.is_none());
        assert!(results.tracks[0].started.is_none());
        assert_eq!(results.artists.len(), 1);
    }

    #[test]
    fn test_search_response_without_sections() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        let results = SearchResults::from(response);
        assert!(results.tracks.is_empty());
        assert!(results.artists.is_empty());
    }

    #[test]
    fn test_status_code_mapping() {
        assert!(matches!(
            CatalogError::from(SpotifyError::from_status_code(401, "bad token")),
            CatalogError::Unauthorized(_)
        ));
        assert!(matches!(
            CatalogError::from(SpotifyError::from_status_code(404, "missing")),
            CatalogError::NotFound(_)
        ));
        assert_eq!(
            CatalogError::from(SpotifyError::from_status_code(429, "")),
            CatalogError::RateLimited
        );
        assert_eq!(
            CatalogError::from(SpotifyError::from_status_code(500, "oops")),
            CatalogError::Api {
                code: 500,
                message: "oops".to_string()
            }
        );
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(3600),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + chrono::Duration::seconds(3550)));
    }

    #[test]
    fn test_search_response_paging_without_items() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"tracks": {}, "artists": {"items": []}}"#).unwrap();
        let results = SearchResults::from(response);
        assert!(results.tracks.is_empty());
        assert!(results.artists.is_empty());
    }

    #[tokio::test]
    async fn test_get_track_strips_uri_prefix() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 3600, 1).await;
        let track = server
            .mock("GET", "/v1/tracks/4uLU6hMCjMI75M1A2tKUQC")
            .match_header("authorization", "Bearer app-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TRACK_JSON)
            .expect(1)
            .create_async()
            .await;

        let catalog = catalog_at(&server.url(), &server.url());
        let fetched = catalog
            .get_track("spotify:track:4uLU6hMCjMI75M1A2tKUQC")
            .await
            .unwrap();

        assert_eq!(fetched.name, "Never Gonna Give You Up");
        assert_eq!(fetched.album.images[0].url, "https://i.scdn.co/image/large");
        token.assert_async().await;
        track.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_sends_query_type_and_limit() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 3600, 1).await;
        let search = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".to_string(), "never gonna".to_string()),
                Matcher::UrlEncoded("type".to_string(), "track,artist".to_string()),
                Matcher::UrlEncoded("limit".to_string(), "5".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"tracks": {{"items": [{TRACK_JSON}]}}}}"#))
            .expect(1)
            .create_async()
            .await;

        let catalog = catalog_at(&server.url(), &server.url());
        let results = catalog.search("never gonna", 5).await.unwrap();

        assert_eq!(results.tracks.len(), 1);
        assert!(results.artists.is_empty());
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_is_reused_while_fresh() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 3600, 1).await;
        let _track = server
            .mock("GET", "/v1/tracks/abc")
            .with_status(200)
            .with_body(TRACK_JSON)
            .expect(2)
            .create_async()
            .await;

        let catalog = catalog_at(&server.url(), &server.url());
        catalog.get_track("abc").await.unwrap();
        catalog.get_track("abc").await.unwrap();

        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_is_refreshed_near_expiry() {
        let mut server = Server::new_async().await;
        // expires inside the refresh margin, so every call fetches a new one
        let token = mock_token(&mut server, 30, 2).await;
        let _track = server
            .mock("GET", "/v1/tracks/abc")
            .with_status(200)
            .with_body(TRACK_JSON)
            .expect(2)
            .create_async()
            .await;

        let catalog = catalog_at(&server.url(), &server.url());
        catalog.get_track("abc").await.unwrap();
        catalog.get_track("abc").await.unwrap();

        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_statuses_become_catalog_errors() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 3600, 1).await;
        let _missing = server
            .mock("GET", "/v1/tracks/missing")
            .with_status(404)
            .with_body(r#"{"error": {"status": 404, "message": "non existing id"}}"#)
            .create_async()
            .await;
        let _limited = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let catalog = catalog_at(&server.url(), &server.url());
        let err = catalog.get_track("missing").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(message) if message.contains("non existing id")));

        let err = catalog.search("anything", 10).await.unwrap_err();
        assert_eq!(err, CatalogError::RateLimited);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/api/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_client"}"#)
            .create_async()
            .await;

        let catalog = catalog_at(&server.url(), &server.url());
        let err = catalog.get_track("abc").await.unwrap_err();
        assert!(matches!(err, CatalogError::Api { code: 400, .. }));
    }
}
