//! Settings table access

use crate::auth::generate_secret_key;
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Settings key holding the generated token secret
pub const SECRET_KEY_SETTING: &str = "jwt_secret_key";

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Token secret stored in the database, generated on first use
///
/// Used when no secret is configured, so issued tokens stay valid across
/// restarts.
pub async fn load_or_init_secret_key(pool: &SqlitePool) -> Result<String> {
    if let Some(secret) = get_setting(pool, SECRET_KEY_SETTING).await? {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    let secret = generate_secret_key();

    // Lost races keep the first writer's secret
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(SECRET_KEY_SETTING)
        .bind(&secret)
        .execute(pool)
        .await?;
    sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND (value IS NULL OR value = '')")
        .bind(&secret)
        .bind(SECRET_KEY_SETTING)
        .execute(pool)
        .await?;

    info!("Generated new token secret and stored it in the settings table");

    get_setting(pool, SECRET_KEY_SETTING)
        .await?
        .ok_or_else(|| crate::Error::Internal("Token secret missing after initialization".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;

    #[tokio::test]
    async fn test_get_setting() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        assert_eq!(get_setting(&pool, "missing").await.unwrap(), None);

        sqlx::query("INSERT INTO settings (key, value) VALUES ('k', 'v1')")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(get_setting(&pool, "k").await.unwrap().as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_secret_key_generated_once() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        let first = load_or_init_secret_key(&pool).await.unwrap();
        let second = load_or_init_secret_key(&pool).await.unwrap();

        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }
}
