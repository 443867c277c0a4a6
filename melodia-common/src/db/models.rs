//! Row types and write payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_id: Option<i64>,
    pub genre: Option<String>,
    /// Seconds
    pub duration: f64,
    pub url: String,
    pub local_file_path: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub song_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new song row
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_id: Option<i64>,
    pub genre: Option<String>,
    pub duration: f64,
    #[serde(default)]
    pub url: String,
    pub local_file_path: Option<String>,
    pub image_url: Option<String>,
}

/// `null` in the payload becomes `Some(None)`; an absent field stays `None`
fn nullable<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial song update. `None` leaves the column unchanged; `Some(None)` on a
/// nullable column clears it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SongUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub album: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub album_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub genre: Option<Option<String>>,
    pub duration: Option<f64>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub local_file_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewAlbum {
    pub title: String,
    pub artist: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlbumUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewPlaylist {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

/// Result of deleting a song
#[derive(Debug, Clone)]
pub struct DeletedSong {
    pub song: Song,
    pub deleted_likes_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let update: SongUpdate = serde_json::from_str(r#"{"album_id": null, "genre": "Jazz"}"#).unwrap();
        assert_eq!(update.album_id, Some(None));
        assert_eq!(update.genre, Some(Some("Jazz".to_string())));
        assert_eq!(update.image_url, None);
        assert_eq!(update.title, None);

        let update: PlaylistUpdate = serde_json::from_str(r#"{"name": "P"}"#).unwrap();
        assert_eq!(update.description, None);
    }
}
