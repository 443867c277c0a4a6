//! Album persistence

use super::models::{Album, AlbumUpdate, NewAlbum};
use crate::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

pub async fn insert_album(pool: &SqlitePool, album: &NewAlbum) -> Result<Album> {
    let row = sqlx::query_as::<_, Album>(
        r#"
        INSERT INTO albums (title, artist, image_url, description)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&album.title)
    .bind(&album.artist)
    .bind(&album.image_url)
    .bind(&album.description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_album(pool: &SqlitePool, id: i64) -> Result<Option<Album>> {
    let album = sqlx::query_as::<_, Album>("SELECT * FROM albums WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(album)
}

pub async fn list_albums(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<Album>> {
    let albums = sqlx::query_as::<_, Album>("SELECT * FROM albums ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;

    Ok(albums)
}

/// Apply the provided fields. Returns `None` when the album does not exist.
pub async fn update_album(pool: &SqlitePool, id: i64, update: &AlbumUpdate) -> Result<Option<Album>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE albums SET ");
    let mut assigned = 0;
    {
        let mut set = builder.separated(", ");
        if let Some(title) = &update.title {
            set.push("title = ").push_bind_unseparated(title.clone());
            assigned += 1;
        }
        if let Some(artist) = &update.artist {
            set.push("artist = ").push_bind_unseparated(artist.clone());
            assigned += 1;
        }
        if let Some(image_url) = &update.image_url {
            set.push("image_url = ").push_bind_unseparated(image_url.clone());
            assigned += 1;
        }
        if let Some(description) = &update.description {
            set.push("description = ").push_bind_unseparated(description.clone());
            assigned += 1;
        }
    }

    if assigned == 0 {
        return get_album(pool, id).await;
    }

    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    let album = builder.build_query_as::<Album>().fetch_optional(pool).await?;

    Ok(album)
}

/// Delete an album. Its songs stay, with `album_id` cleared.
///
/// Returns false when the album does not exist.
pub async fn delete_album(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    // Databases whose album_id column was added without a foreign key rely on this
    let detached = sqlx::query("UPDATE songs SET album_id = NULL WHERE album_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let deleted = sqlx::query("DELETE FROM albums WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    if deleted > 0 {
        debug!("Deleted album {} ({} songs detached)", id, detached);
    }

    Ok(deleted > 0)
}

/// Album with this title and artist, created when absent
pub async fn find_or_create_album(
    pool: &SqlitePool,
    title: &str,
    artist: &str,
    image_url: Option<&str>,
) -> Result<Album> {
    let existing = sqlx::query_as::<_, Album>(
        "SELECT * FROM albums WHERE title = ? AND artist = ? ORDER BY id LIMIT 1",
    )
    .bind(title)
    .bind(artist)
    .fetch_optional(pool)
    .await?;

    if let Some(album) = existing {
        return Ok(album);
    }

    insert_album(
        pool,
        &NewAlbum {
            title: title.to_string(),
            artist: artist.to_string(),
            image_url: image_url.map(str::to_string),
            description: None,
        },
    )
    .await
}
