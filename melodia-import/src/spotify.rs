//! Spotify Web API client
//!
//! Uses the client-credentials flow. The access token is cached until shortly
//! before it expires; a 401 from the API drops the cached token so the next
//! call fetches a fresh one.
//!
//! Endpoints used:
//! - `POST {accounts}/api/token`
//! - `GET {api}/search?type=track`
//! - `GET {api}/artists?ids=...` (genres, 50 ids per call)

use crate::catalog::{CatalogArtist, CatalogTrack, TrackCatalog};
use crate::{ImportError, ImportResult};
use async_trait::async_trait;
use melodia_common::Settings;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh this long before the reported expiry
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Spotify caps both search results and artist ids per request
const MAX_PAGE_SIZE: u32 = 50;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    http: Client,
    client_id: String,
    client_secret: String,
    accounts_url: String,
    api_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> ImportResult<Self> {
        Self::with_base_urls(client_id, client_secret, SPOTIFY_ACCOUNTS_URL, SPOTIFY_API_URL)
    }

    /// Client against alternative endpoints (test servers)
    pub fn with_base_urls(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        accounts_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> ImportResult<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(ImportError::MissingCredentials);
        }

        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    /// Client from resolved settings, [`ImportError::MissingCredentials`] when unset
    pub fn from_settings(settings: &Settings) -> ImportResult<Self> {
        match (&settings.spotify_client_id, &settings.spotify_client_secret) {
            (Some(id), Some(secret)) => Self::new(id.clone(), secret.clone()),
            _ => Err(ImportError::MissingCredentials),
        }
    }

    async fn access_token(&self) -> ImportResult<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/api/token", self.accounts_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ImportError::Catalog(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImportError::Catalog(format!(
                "Token request rejected: {} {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ImportError::Catalog(format!("Invalid token response: {}", e)))?;

        info!("Spotify access token obtained (expires in {}s)", token.expires_in);

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(value)
    }

    /// Authorized GET returning parsed JSON
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> ImportResult<T> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .query(query)
            .send()
            .await
            .map_err(|e| ImportError::Catalog(format!("Failed to connect to Spotify API: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            *self.token.lock().await = None;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImportError::Catalog(format!("Spotify API error: {} {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| ImportError::Catalog(format!("Invalid Spotify response: {}", e)))
    }
}

#[async_trait]
impl TrackCatalog for SpotifyClient {
    async fn search_tracks(&self, query: &str, limit: u32) -> ImportResult<Vec<CatalogTrack>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        debug!("Searching Spotify for '{}' (limit {})", query, limit);

        let url = format!("{}/search", self.api_url);
        let response: SearchResponse = self
            .get_json(
                &url,
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let tracks: Vec<CatalogTrack> = response
            .tracks
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .map(CatalogTrack::from)
            .collect();

        let with_preview = tracks.iter().filter(|t| t.has_preview()).count();
        info!(
            "Found {} tracks for '{}', {} with preview",
            tracks.len(),
            query,
            with_preview
        );

        Ok(tracks)
    }

    async fn artist_genres(&self, artist_ids: &[String]) -> ImportResult<HashMap<String, Vec<String>>> {
        let mut genres = HashMap::new();
        let url = format!("{}/artists", self.api_url);

        for chunk in artist_ids.chunks(MAX_PAGE_SIZE as usize) {
            let response: ArtistsResponse = self.get_json(&url, &[("ids", chunk.join(","))]).await?;

            for artist in response.artists.into_iter().flatten() {
                genres.insert(artist.id, artist.genres);
            }
        }

        Ok(genres)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtistRef>,
    album: Option<SpotifyAlbum>,
    duration_ms: Option<u64>,
    preview_url: Option<String>,
    #[serde(default)]
    external_urls: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtistRef {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    name: Option<String>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    #[serde(default)]
    artists: Vec<Option<SpotifyArtist>>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    id: String,
    #[serde(default)]
    genres: Vec<String>,
}

impl From<SpotifyTrack> for CatalogTrack {
    fn from(track: SpotifyTrack) -> Self {
        let (album_name, album_image_url) = match track.album {
            Some(album) => (album.name, album.images.into_iter().next().map(|i| i.url)),
            None => (None, None),
        };

        CatalogTrack {
            id: track.id.unwrap_or_default(),
            title: track.name,
            artists: track
                .artists
                .into_iter()
                .filter_map(|a| a.name.map(|name| CatalogArtist { id: a.id, name }))
                .collect(),
            album_name,
            album_image_url,
            duration_ms: track.duration_ms,
            preview_url: track.preview_url.filter(|u| !u.is_empty()),
            external_url: track.external_urls.get("spotify").cloned(),
        }
    }
}
