//! Like persistence

use super::models::{Like, Song};
use crate::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashSet;

/// Record a like. Liking the same song twice is [`Error::Conflict`]; a song
/// or user that no longer exists is [`Error::NotFound`].
pub async fn add_like(pool: &SqlitePool, user_id: i64, song_id: i64) -> Result<Like> {
    sqlx::query_as::<_, Like>(
        "INSERT INTO likes (user_id, song_id) VALUES (?, ?) RETURNING *",
    )
    .bind(user_id)
    .bind(song_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            Error::NotFound(format!("Song {} not found", song_id))
        }
        _ => Error::from_insert(e, "Song already liked"),
    })
}

/// Returns false when there was no like to remove
pub async fn remove_like(pool: &SqlitePool, user_id: i64, song_id: i64) -> Result<bool> {
    let removed = sqlx::query("DELETE FROM likes WHERE user_id = ? AND song_id = ?")
        .bind(user_id)
        .bind(song_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(removed > 0)
}

/// Songs liked by a user, most recent like first
pub async fn liked_songs(pool: &SqlitePool, user_id: i64, skip: i64, limit: i64) -> Result<Vec<Song>> {
    let songs = sqlx::query_as::<_, Song>(
        r#"
        SELECT s.* FROM songs s
        JOIN likes l ON l.song_id = s.id
        WHERE l.user_id = ?
        ORDER BY l.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(songs)
}

/// Which of `song_ids` count as liked
///
/// With a viewer, songs that viewer liked. Without one, songs anyone liked.
pub async fn liked_song_ids(pool: &SqlitePool, viewer: Option<i64>, song_ids: &[i64]) -> Result<HashSet<i64>> {
    if song_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT DISTINCT song_id FROM likes WHERE song_id IN (");
    let mut separated = builder.separated(", ");
    for id in song_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    if let Some(user_id) = viewer {
        builder.push(" AND user_id = ").push_bind(user_id);
    }

    let ids: Vec<i64> = builder.build_query_scalar().fetch_all(pool).await?;
    Ok(ids.into_iter().collect())
}
