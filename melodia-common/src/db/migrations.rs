//! Versioned schema migrations
//!
//! Column additions are handled by schema sync; migrations cover everything
//! else (indexes, data fixes). Each migration is idempotent and recorded in
//! `schema_version`. Never edit a released migration, add a new one.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Increment when adding a migration
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Highest applied version, 0 for a fresh database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Apply every migration newer than the recorded version
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({}); proceeding",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: uniqueness of playlist entries and likes
///
/// Join tables created before the UNIQUE constraints may hold duplicates.
/// The oldest row of each pair is kept before the unique index is built.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let removed_entries = sqlx::query(
        r#"
        DELETE FROM playlist_songs
        WHERE id NOT IN (
            SELECT MIN(id) FROM playlist_songs GROUP BY playlist_id, song_id
        )
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    let removed_likes = sqlx::query(
        r#"
        DELETE FROM likes
        WHERE id NOT IN (
            SELECT MIN(id) FROM likes GROUP BY user_id, song_id
        )
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    if removed_entries > 0 || removed_likes > 0 {
        warn!(
            "Migration v1: removed {} duplicate playlist entries and {} duplicate likes",
            removed_entries, removed_likes
        );
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_playlist_songs_unique ON playlist_songs(playlist_id, song_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_unique ON likes(user_id, song_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Migration v2: lookup indexes for search, album listing and playlist ownership
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title)",
        "CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist)",
        "CREATE INDEX IF NOT EXISTS idx_songs_album ON songs(album)",
        "CREATE INDEX IF NOT EXISTS idx_songs_genre ON songs(genre)",
        "CREATE INDEX IF NOT EXISTS idx_songs_album_id ON songs(album_id)",
        "CREATE INDEX IF NOT EXISTS idx_playlists_owner_id ON playlists(owner_id)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}
