//! Playlist persistence

use super::models::{NewPlaylist, Playlist, PlaylistUpdate, Song};
use crate::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub async fn create_playlist(pool: &SqlitePool, owner_id: i64, playlist: &NewPlaylist) -> Result<Playlist> {
    let row = sqlx::query_as::<_, Playlist>(
        r#"
        INSERT INTO playlists (name, description, owner_id)
        VALUES (?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&playlist.name)
    .bind(&playlist.description)
    .bind(owner_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_playlist(pool: &SqlitePool, id: i64) -> Result<Option<Playlist>> {
    let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(playlist)
}

pub async fn list_for_owner(pool: &SqlitePool, owner_id: i64, skip: i64, limit: i64) -> Result<Vec<Playlist>> {
    let playlists = sqlx::query_as::<_, Playlist>(
        "SELECT * FROM playlists WHERE owner_id = ? ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(owner_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(playlists)
}

/// Apply the provided fields and bump `updated_at`
pub async fn update_playlist(pool: &SqlitePool, id: i64, update: &PlaylistUpdate) -> Result<Option<Playlist>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE playlists SET ");
    {
        let mut set = builder.separated(", ");
        set.push("updated_at = CURRENT_TIMESTAMP");
        if let Some(name) = &update.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(description) = &update.description {
            set.push("description = ").push_bind_unseparated(description.clone());
        }
    }

    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    let playlist = builder.build_query_as::<Playlist>().fetch_optional(pool).await?;

    Ok(playlist)
}

pub async fn delete_playlist(pool: &SqlitePool, id: i64) -> Result<bool> {
    let deleted = sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}

/// Append a song. A song already in the playlist is [`Error::Conflict`].
pub async fn add_song(pool: &SqlitePool, playlist_id: i64, song_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO playlist_songs (playlist_id, song_id) VALUES (?, ?)")
        .bind(playlist_id)
        .bind(song_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from_insert(e, "Song already in playlist"))?;

    touch(pool, playlist_id).await
}

/// Returns false when the song was not in the playlist
pub async fn remove_song(pool: &SqlitePool, playlist_id: i64, song_id: i64) -> Result<bool> {
    let removed = sqlx::query("DELETE FROM playlist_songs WHERE playlist_id = ? AND song_id = ?")
        .bind(playlist_id)
        .bind(song_id)
        .execute(pool)
        .await?
        .rows_affected();

    if removed > 0 {
        touch(pool, playlist_id).await?;
    }

    Ok(removed > 0)
}

/// Songs in the order they were added
pub async fn playlist_songs(pool: &SqlitePool, playlist_id: i64) -> Result<Vec<Song>> {
    let songs = sqlx::query_as::<_, Song>(
        r#"
        SELECT s.* FROM songs s
        JOIN playlist_songs ps ON ps.song_id = s.id
        WHERE ps.playlist_id = ?
        ORDER BY ps.id
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(songs)
}

async fn touch(pool: &SqlitePool, playlist_id: i64) -> Result<()> {
    sqlx::query("UPDATE playlists SET updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(playlist_id)
        .execute(pool)
        .await?;

    Ok(())
}
