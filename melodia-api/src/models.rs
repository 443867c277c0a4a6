//! Request and response bodies

use chrono::{DateTime, Utc};
use melodia_common::db::{Album, Playlist, Song, User};
use melodia_import::FailedTrack;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// User summary embedded in the login response
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Song with the viewer-specific like flag
#[derive(Debug, Clone, Serialize)]
pub struct SongResponse {
    #[serde(flatten)]
    pub song: Song,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SongResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteSongResponse {
    pub message: String,
    pub deleted_likes_count: i64,
    pub song_id: i64,
    pub song_title: String,
    pub song_artist: String,
}

#[derive(Debug, Serialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub songs: Vec<SongResponse>,
}

#[derive(Debug, Serialize)]
pub struct AlbumDetail {
    #[serde(flatten)]
    pub album: Album,
    pub songs: Vec<SongResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkImportResponse {
    pub query: String,
    pub imported_count: usize,
    pub existing_count: usize,
    pub songs: Vec<SongResponse>,
    pub failed: Vec<FailedTrack>,
    pub warnings: Vec<String>,
}
