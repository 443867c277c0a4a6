//! Song persistence

use super::models::{DeletedSong, NewSong, Song, SongUpdate};
use crate::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub async fn insert_song(pool: &SqlitePool, song: &NewSong) -> Result<Song> {
    let row = sqlx::query_as::<_, Song>(
        r#"
        INSERT INTO songs (
            title, artist, album, album_id, genre, duration, url, local_file_path, image_url
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(song.album_id)
    .bind(&song.genre)
    .bind(song.duration)
    .bind(&song.url)
    .bind(&song.local_file_path)
    .bind(&song.image_url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_song(pool: &SqlitePool, id: i64) -> Result<Option<Song>> {
    let song = sqlx::query_as::<_, Song>("SELECT * FROM songs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(song)
}

/// Page of songs in insertion order
pub async fn list_songs(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<Song>> {
    let songs = sqlx::query_as::<_, Song>("SELECT * FROM songs ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;

    Ok(songs)
}

/// Apply the provided fields. Returns `None` when the song does not exist.
pub async fn update_song(pool: &SqlitePool, id: i64, update: &SongUpdate) -> Result<Option<Song>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE songs SET ");
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
        if let Some(album) = &update.album {
            set.push("album = ").push_bind_unseparated(album.clone());
            assigned += 1;
        }
        if let Some(album_id) = update.album_id {
            set.push("album_id = ").push_bind_unseparated(album_id);
            assigned += 1;
        }
        if let Some(genre) = &update.genre {
            set.push("genre = ").push_bind_unseparated(genre.clone());
            assigned += 1;
        }
        if let Some(duration) = update.duration {
            set.push("duration = ").push_bind_unseparated(duration);
            assigned += 1;
        }
        if let Some(url) = &update.url {
            set.push("url = ").push_bind_unseparated(url.clone());
            assigned += 1;
        }
        if let Some(path) = &update.local_file_path {
            set.push("local_file_path = ").push_bind_unseparated(path.clone());
            assigned += 1;
        }
        if let Some(image_url) = &update.image_url {
            set.push("image_url = ").push_bind_unseparated(image_url.clone());
            assigned += 1;
        }
    }

    if assigned == 0 {
        return get_song(pool, id).await;
    }

    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    let song = builder.build_query_as::<Song>().fetch_optional(pool).await?;

    Ok(song)
}

/// Delete a song together with its likes and playlist entries
pub async fn delete_song(pool: &SqlitePool, id: i64) -> Result<Option<DeletedSong>> {
    let mut tx = pool.begin().await?;

    let Some(song) = sqlx::query_as::<_, Song>("SELECT * FROM songs WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };

    let deleted_likes_count = sqlx::query("DELETE FROM likes WHERE song_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;

    sqlx::query("DELETE FROM playlist_songs WHERE song_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some(DeletedSong {
        song,
        deleted_likes_count,
    }))
}

/// Songs whose title, artist, album or genre contain `query` (ASCII case-insensitive)
pub async fn search_songs(pool: &SqlitePool, query: &str, skip: i64, limit: i64) -> Result<Vec<Song>> {
    let pattern = format!("%{}%", escape_like(query));

    let songs = sqlx::query_as::<_, Song>(
        r#"
        SELECT * FROM songs
        WHERE title LIKE ?1 ESCAPE '\'
           OR artist LIKE ?1 ESCAPE '\'
           OR album LIKE ?1 ESCAPE '\'
           OR genre LIKE ?1 ESCAPE '\'
        ORDER BY id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(songs)
}

/// Exact title + artist match, used to avoid importing a track twice
pub async fn find_by_title_artist(pool: &SqlitePool, title: &str, artist: &str) -> Result<Option<Song>> {
    let song = sqlx::query_as::<_, Song>(
        "SELECT * FROM songs WHERE title = ? AND artist = ? ORDER BY id LIMIT 1",
    )
    .bind(title)
    .bind(artist)
    .fetch_optional(pool)
    .await?;

    Ok(song)
}

pub async fn set_image_url(pool: &SqlitePool, id: i64, image_url: &str) -> Result<()> {
    sqlx::query("UPDATE songs SET image_url = ? WHERE id = ?")
        .bind(image_url)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Attach a song to an album, copying the album title into `songs.album`
pub async fn set_album(pool: &SqlitePool, id: i64, album_id: i64, album_title: &str) -> Result<Option<Song>> {
    let song = sqlx::query_as::<_, Song>(
        "UPDATE songs SET album_id = ?, album = ? WHERE id = ? RETURNING *",
    )
    .bind(album_id)
    .bind(album_title)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(song)
}

pub async fn songs_for_album(pool: &SqlitePool, album_id: i64) -> Result<Vec<Song>> {
    let songs = sqlx::query_as::<_, Song>("SELECT * FROM songs WHERE album_id = ? ORDER BY id")
        .bind(album_id)
        .fetch_all(pool)
        .await?;

    Ok(songs)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
