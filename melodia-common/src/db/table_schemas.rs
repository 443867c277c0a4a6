//! Declared column sets for every table
//!
//! Adding a column here is enough for it to appear in existing databases on
//! the next startup. Keep the `CREATE TABLE` statements in `init.rs` in step.

use super::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

pub struct UsersTableSchema;

impl TableSchema for UsersTableSchema {
    fn table_name() -> &'static str {
        "users"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("email", "TEXT").not_null().unique(),
            ColumnDefinition::new("username", "TEXT").not_null().unique(),
            ColumnDefinition::new("hashed_password", "TEXT").not_null(),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
            ColumnDefinition::new("updated_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
        ]
    }
}

pub struct AlbumsTableSchema;

impl TableSchema for AlbumsTableSchema {
    fn table_name() -> &'static str {
        "albums"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("title", "TEXT").not_null(),
            ColumnDefinition::new("artist", "TEXT").not_null(),
            ColumnDefinition::new("image_url", "TEXT"),
            ColumnDefinition::new("description", "TEXT"),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
        ]
    }
}

pub struct SongsTableSchema;

impl TableSchema for SongsTableSchema {
    fn table_name() -> &'static str {
        "songs"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("title", "TEXT").not_null(),
            ColumnDefinition::new("artist", "TEXT").not_null(),
            ColumnDefinition::new("album", "TEXT"),
            ColumnDefinition::new("album_id", "INTEGER")
                .references("albums(id) ON DELETE SET NULL"),
            ColumnDefinition::new("genre", "TEXT"),
            ColumnDefinition::new("duration", "REAL").not_null().default("0"),
            ColumnDefinition::new("url", "TEXT").not_null().default("''"),
            ColumnDefinition::new("local_file_path", "TEXT"),
            ColumnDefinition::new("image_url", "TEXT"),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
        ]
    }
}

pub struct PlaylistsTableSchema;

impl TableSchema for PlaylistsTableSchema {
    fn table_name() -> &'static str {
        "playlists"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null(),
            ColumnDefinition::new("description", "TEXT"),
            ColumnDefinition::new("owner_id", "INTEGER").not_null(),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
            ColumnDefinition::new("updated_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
        ]
    }
}

pub struct PlaylistSongsTableSchema;

impl TableSchema for PlaylistSongsTableSchema {
    fn table_name() -> &'static str {
        "playlist_songs"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("playlist_id", "INTEGER").not_null(),
            ColumnDefinition::new("song_id", "INTEGER").not_null(),
            ColumnDefinition::new("added_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
        ]
    }
}

pub struct LikesTableSchema;

impl TableSchema for LikesTableSchema {
    fn table_name() -> &'static str {
        "likes"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("user_id", "INTEGER").not_null(),
            ColumnDefinition::new("song_id", "INTEGER").not_null(),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01 00:00:00'"),
        ]
    }
}

/// Phase 2 of initialization: add missing columns to every table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    let added = SchemaSync::sync_table::<UsersTableSchema>(pool).await?
        + SchemaSync::sync_table::<AlbumsTableSchema>(pool).await?
        + SchemaSync::sync_table::<SongsTableSchema>(pool).await?
        + SchemaSync::sync_table::<PlaylistsTableSchema>(pool).await?
        + SchemaSync::sync_table::<PlaylistSongsTableSchema>(pool).await?
        + SchemaSync::sync_table::<LikesTableSchema>(pool).await?;

    if added > 0 {
        info!("Schema sync added {} column(s)", added);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_sync::SchemaIntrospector;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_old_songs_table_gains_new_columns() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        // Songs table as it looked before albums and artwork existed
        sqlx::query(
            r#"
            CREATE TABLE songs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                album TEXT,
                genre TEXT,
                duration REAL NOT NULL,
                url TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE albums (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, artist TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        sync_all_table_schemas(&pool).await.unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, "songs").await.unwrap();
        for expected in ["album_id", "local_file_path", "image_url", "created_at"] {
            assert!(
                columns.iter().any(|c| c.name == expected),
                "missing column {}",
                expected
            );
        }

        let album_columns = SchemaIntrospector::introspect_table(&pool, "albums").await.unwrap();
        assert!(album_columns.iter().any(|c| c.name == "description"));
    }
}
