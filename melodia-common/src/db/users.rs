//! User persistence

use super::models::User;
use crate::{Error, Result};
use sqlx::SqlitePool;

/// Insert a user. Duplicate email or username is [`Error::Conflict`].
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    username: &str,
    hashed_password: &str,
) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, username, hashed_password)
        VALUES (?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(username)
    .bind(hashed_password)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        let message = match &e {
            sqlx::Error::Database(db_err) if db_err.message().contains("users.username") => {
                "Username already taken"
            }
            _ => "Email already registered",
        };
        Error::from_insert(e, message)
    })
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(username)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        let user = create_user(&pool, "a@example.com", "alice", "hash").await.unwrap();
        assert!(user.id > 0);

        let by_id = get_user(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");

        let by_email = get_user_by_email(&pool, "a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.username, "alice");

        assert!(get_user(&pool, 999).await.unwrap().is_none());
        assert!(email_exists(&pool, "a@example.com").await.unwrap());
        assert!(!username_exists(&pool, "bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_conflict() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        create_user(&pool, "a@example.com", "alice", "hash").await.unwrap();

        match create_user(&pool, "a@example.com", "other", "hash").await {
            Err(Error::Conflict(msg)) => assert_eq!(msg, "Email already registered"),
            other => panic!("expected conflict, got {:?}", other),
        }

        match create_user(&pool, "b@example.com", "alice", "hash").await {
            Err(Error::Conflict(msg)) => assert_eq!(msg, "Username already taken"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }
}
