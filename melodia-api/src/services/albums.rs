//! Album operations

use melodia_common::db::{albums, songs as song_store, Album, AlbumUpdate, NewAlbum};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{AlbumDetail, SongResponse};
use crate::pagination::Page;
use crate::services::songs;

fn check_text(field: &str, value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(field, format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

async fn require_album(db: &SqlitePool, id: i64) -> ApiResult<Album> {
    albums::get_album(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Album {} not found", id)))
}

pub async fn create(db: &SqlitePool, mut payload: NewAlbum) -> ApiResult<Album> {
    payload.title = check_text("title", &payload.title)?;
    payload.artist = check_text("artist", &payload.artist)?;

    let album = albums::insert_album(db, &payload).await?;
    info!("Created album {} ({} - {})", album.id, album.artist, album.title);
    Ok(album)
}

pub async fn list(db: &SqlitePool, page: Page) -> ApiResult<Vec<Album>> {
    Ok(albums::list_albums(db, page.skip, page.limit).await?)
}

pub async fn get(db: &SqlitePool, viewer: Option<i64>, id: i64) -> ApiResult<AlbumDetail> {
    let album = require_album(db, id).await?;
    let rows = song_store::songs_for_album(db, id).await?;
    let songs = songs::annotate(db, viewer, rows).await?;
    Ok(AlbumDetail { album, songs })
}

pub async fn update(db: &SqlitePool, id: i64, mut payload: AlbumUpdate) -> ApiResult<Album> {
    if let Some(title) = payload.title.as_deref() {
        payload.title = Some(check_text("title", title)?);
    }
    if let Some(artist) = payload.artist.as_deref() {
        payload.artist = Some(check_text("artist", artist)?);
    }

    albums::update_album(db, id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Album {} not found", id)))
}

/// Songs stay; their `album_id` is cleared
pub async fn delete(db: &SqlitePool, id: i64) -> ApiResult<()> {
    if !albums::delete_album(db, id).await? {
        return Err(ApiError::NotFound(format!("Album {} not found", id)));
    }
    info!("Deleted album {}", id);
    Ok(())
}

pub async fn attach_song(db: &SqlitePool, viewer: Option<i64>, album_id: i64, song_id: i64) -> ApiResult<SongResponse> {
    let album = require_album(db, album_id).await?;

    let song = song_store::set_album(db, song_id, album.id, &album.title)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {} not found", song_id)))?;

    songs::annotate_one(db, viewer, song).await
}
