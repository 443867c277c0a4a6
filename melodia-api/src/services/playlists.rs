//! Playlist operations
//!
//! Checks run in a fixed order: the playlist must exist (404), the caller must
//! own it (403), then the song must exist (404).

use melodia_common::db::{playlists, NewPlaylist, Playlist, PlaylistUpdate};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::PlaylistDetail;
use crate::pagination::Page;
use crate::services::songs;

const MAX_NAME_CHARS: usize = 100;

fn check_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("name", "Playlist name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::validation(
            "name",
            format!("Playlist name must be at most {} characters", MAX_NAME_CHARS),
        ));
    }
    Ok(name.to_string())
}

async fn require_playlist(db: &SqlitePool, id: i64) -> ApiResult<Playlist> {
    playlists::get_playlist(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Playlist {} not found", id)))
}

async fn require_owned(db: &SqlitePool, id: i64, user_id: i64) -> ApiResult<Playlist> {
    let playlist = require_playlist(db, id).await?;
    if playlist.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "Not allowed to modify this playlist".to_string(),
        ));
    }
    Ok(playlist)
}

async fn detail(db: &SqlitePool, viewer: Option<i64>, playlist: Playlist) -> ApiResult<PlaylistDetail> {
    let rows = playlists::playlist_songs(db, playlist.id).await?;
    let songs = songs::annotate(db, viewer, rows).await?;
    Ok(PlaylistDetail { playlist, songs })
}

pub async fn create(db: &SqlitePool, owner_id: i64, mut payload: NewPlaylist) -> ApiResult<Playlist> {
    payload.name = check_name(&payload.name)?;

    let playlist = playlists::create_playlist(db, owner_id, &payload).await?;
    info!("User {} created playlist {}", owner_id, playlist.id);

    Ok(playlist)
}

pub async fn list_mine(db: &SqlitePool, owner_id: i64, page: Page) -> ApiResult<Vec<Playlist>> {
    Ok(playlists::list_for_owner(db, owner_id, page.skip, page.limit).await?)
}

/// Public read
pub async fn get(db: &SqlitePool, viewer: Option<i64>, id: i64) -> ApiResult<PlaylistDetail> {
    let playlist = require_playlist(db, id).await?;
    detail(db, viewer, playlist).await
}

pub async fn add_song(db: &SqlitePool, user_id: i64, playlist_id: i64, song_id: i64) -> ApiResult<PlaylistDetail> {
    require_owned(db, playlist_id, user_id).await?;
    songs::require_song(db, song_id).await?;

    playlists::add_song(db, playlist_id, song_id).await?;

    // Re-read for the bumped updated_at
    let playlist = require_playlist(db, playlist_id).await?;
    detail(db, Some(user_id), playlist).await
}

pub async fn remove_song(db: &SqlitePool, user_id: i64, playlist_id: i64, song_id: i64) -> ApiResult<()> {
    require_owned(db, playlist_id, user_id).await?;

    if !playlists::remove_song(db, playlist_id, song_id).await? {
        return Err(ApiError::NotFound(format!(
            "Song {} is not in playlist {}",
            song_id, playlist_id
        )));
    }
    Ok(())
}

pub async fn update(db: &SqlitePool, user_id: i64, id: i64, mut payload: PlaylistUpdate) -> ApiResult<Playlist> {
    require_owned(db, id, user_id).await?;

    if let Some(name) = payload.name.as_deref() {
        payload.name = Some(check_name(name)?);
    }

    playlists::update_playlist(db, id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Playlist {} not found", id)))
}

pub async fn delete(db: &SqlitePool, user_id: i64, id: i64) -> ApiResult<()> {
    require_owned(db, id, user_id).await?;

    if !playlists::delete_playlist(db, id).await? {
        return Err(ApiError::NotFound(format!("Playlist {} not found", id)));
    }
    info!("User {} deleted playlist {}", user_id, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_name() {
        assert_eq!(check_name(" Road trip ").unwrap(), "Road trip");
        assert!(check_name("").is_err());
        assert!(check_name(&"x".repeat(101)).is_err());
    }
}
