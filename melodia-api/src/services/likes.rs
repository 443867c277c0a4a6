//! Likes

use melodia_common::db::{likes, songs as song_store, NewSong};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::models::SongResponse;
use crate::pagination::Page;
use crate::services::songs;

pub async fn like(db: &SqlitePool, user_id: i64, song_id: i64) -> ApiResult<SongResponse> {
    let song = songs::require_song(db, song_id).await?;
    likes::add_like(db, user_id, song_id).await?;
    debug!("User {} liked song {}", user_id, song_id);

    Ok(SongResponse { song, liked: true })
}

pub async fn unlike(db: &SqlitePool, user_id: i64, song_id: i64) -> ApiResult<()> {
    if !likes::remove_like(db, user_id, song_id).await? {
        return Err(ApiError::NotFound(format!("Song {} is not liked", song_id)));
    }
    Ok(())
}

pub async fn list_mine(db: &SqlitePool, user_id: i64, page: Page) -> ApiResult<Vec<SongResponse>> {
    let rows = likes::liked_songs(db, user_id, page.skip, page.limit).await?;
    Ok(rows
        .into_iter()
        .map(|song| SongResponse { song, liked: true })
        .collect())
}

/// Like a song given by its data, creating it when no song has this title and artist
pub async fn like_with_data(db: &SqlitePool, user_id: i64, payload: NewSong) -> ApiResult<SongResponse> {
    let existing = song_store::find_by_title_artist(db, payload.title.trim(), payload.artist.trim()).await?;

    let song = match existing {
        Some(song) => song,
        None => songs::create(db, payload).await?,
    };

    like(db, user_id, song.id).await
}
