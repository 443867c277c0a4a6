//! Song catalog operations

use melodia_common::db::{albums, likes, songs, NewSong, Song, SongUpdate};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{DeleteSongResponse, SearchResponse, SongResponse};
use crate::pagination::Page;

const MAX_TEXT_CHARS: usize = 255;

/// Attach the `liked` flag for `viewer` (or for anyone when anonymous)
pub async fn annotate(db: &SqlitePool, viewer: Option<i64>, songs: Vec<Song>) -> ApiResult<Vec<SongResponse>> {
    let ids: Vec<i64> = songs.iter().map(|s| s.id).collect();
    let liked = likes::liked_song_ids(db, viewer, &ids).await?;

    Ok(songs
        .into_iter()
        .map(|song| SongResponse {
            liked: liked.contains(&song.id),
            song,
        })
        .collect())
}

pub async fn annotate_one(db: &SqlitePool, viewer: Option<i64>, song: Song) -> ApiResult<SongResponse> {
    let mut annotated = annotate(db, viewer, vec![song]).await?;
    annotated
        .pop()
        .ok_or_else(|| ApiError::Internal("annotation dropped a song".to_string()))
}

pub async fn require_song(db: &SqlitePool, id: i64) -> ApiResult<Song> {
    songs::get_song(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {} not found", id)))
}

fn required_text(field: &str, value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(field, format!("{} must not be empty", field)));
    }
    if value.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::validation(
            field,
            format!("{} must be at most {} characters", field, MAX_TEXT_CHARS),
        ));
    }
    Ok(value.to_string())
}

fn check_duration(duration: f64) -> ApiResult<()> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(ApiError::validation("duration", "duration must be 0 or greater"));
    }
    Ok(())
}

fn has_source(url: &str, local_file_path: Option<&str>) -> bool {
    !url.trim().is_empty() || local_file_path.is_some_and(|p| !p.trim().is_empty())
}

async fn check_album(db: &SqlitePool, album_id: Option<i64>) -> ApiResult<()> {
    if let Some(id) = album_id {
        if albums::get_album(db, id).await?.is_none() {
            return Err(ApiError::NotFound(format!("Album {} not found", id)));
        }
    }
    Ok(())
}

pub async fn list(db: &SqlitePool, viewer: Option<i64>, page: Page) -> ApiResult<Vec<SongResponse>> {
    let rows = songs::list_songs(db, page.skip, page.limit).await?;
    annotate(db, viewer, rows).await
}

pub async fn get(db: &SqlitePool, viewer: Option<i64>, id: i64) -> ApiResult<SongResponse> {
    let song = require_song(db, id).await?;
    annotate_one(db, viewer, song).await
}

/// Validate and store a new song
pub async fn create(db: &SqlitePool, mut payload: NewSong) -> ApiResult<Song> {
    payload.title = required_text("title", &payload.title)?;
    payload.artist = required_text("artist", &payload.artist)?;
    check_duration(payload.duration)?;

    if !has_source(&payload.url, payload.local_file_path.as_deref()) {
        return Err(ApiError::validation(
            "url",
            "url or local_file_path must be provided",
        ));
    }
    check_album(db, payload.album_id).await?;

    let song = songs::insert_song(db, &payload).await?;
    info!("Created song {} ({} - {})", song.id, song.artist, song.title);

    Ok(song)
}

/// Partial update; missing song is 404 before any field is checked
///
/// An explicit `null` clears a nullable column.
pub async fn update(db: &SqlitePool, id: i64, mut payload: SongUpdate) -> ApiResult<Song> {
    let current = require_song(db, id).await?;

    if let Some(title) = payload.title.as_deref() {
        payload.title = Some(required_text("title", title)?);
    }
    if let Some(artist) = payload.artist.as_deref() {
        payload.artist = Some(required_text("artist", artist)?);
    }
    if let Some(duration) = payload.duration {
        check_duration(duration)?;
    }

    let url = payload.url.as_deref().unwrap_or(&current.url);
    let local = match &payload.local_file_path {
        Some(path) => path.as_deref(),
        None => current.local_file_path.as_deref(),
    };
    if !has_source(url, local) {
        return Err(ApiError::validation(
            "url",
            "url or local_file_path must be provided",
        ));
    }
    check_album(db, payload.album_id.flatten()).await?;

    songs::update_song(db, id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {} not found", id)))
}

pub async fn delete(db: &SqlitePool, id: i64) -> ApiResult<DeleteSongResponse> {
    let deleted = songs::delete_song(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {} not found", id)))?;

    info!(
        "Deleted song {} with {} likes",
        deleted.song.id, deleted.deleted_likes_count
    );

    Ok(DeleteSongResponse {
        message: format!("Song '{}' deleted", deleted.song.title),
        deleted_likes_count: deleted.deleted_likes_count,
        song_id: deleted.song.id,
        song_title: deleted.song.title,
        song_artist: deleted.song.artist,
    })
}

pub async fn search(db: &SqlitePool, viewer: Option<i64>, query: &str, page: Page) -> ApiResult<SearchResponse> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::validation("q", "Search query must not be empty"));
    }

    let rows = songs::search_songs(db, query, page.skip, page.limit).await?;
    let results = annotate(db, viewer, rows).await?;

    Ok(SearchResponse {
        query: query.to_string(),
        count: results.len(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("title", "  Song ").unwrap(), "Song");
        assert!(required_text("title", "   ").is_err());
        assert!(required_text("title", &"x".repeat(256)).is_err());
    }

    #[test]
    fn test_duration() {
        assert!(check_duration(0.0).is_ok());
        assert!(check_duration(200.5).is_ok());
        assert!(check_duration(-1.0).is_err());
        assert!(check_duration(f64::NAN).is_err());
    }

    #[test]
    fn test_has_source() {
        assert!(has_source("http://x", None));
        assert!(has_source("", Some("/music/a.mp3")));
        assert!(!has_source(" ", Some("")));
        assert!(!has_source("", None));
    }
}
