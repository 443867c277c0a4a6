//! Token and password primitives
//!
//! Tokens are HMAC-signed JWTs carrying the user id in `sub`, an expiry, the
//! issue time, a token kind (`access` or `refresh`) and a random `jti`. The
//! kind is checked on every verification so a refresh token never
//! authenticates a request and an access token never refreshes.

use crate::{Error, Result, Settings};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum password length accepted by bcrypt
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Token kind carried in the `typ` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a decimal string
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub typ: TokenKind,
    pub jti: String,
}

impl Claims {
    /// Parse the subject as a user id
    pub fn user_id(&self) -> std::result::Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Invalid)
    }
}

/// Token verification failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Expected {expected:?} token")]
    WrongKind { expected: TokenKind },

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Access and refresh token pair returned by login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies signed tokens with one secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, algorithm: Algorithm, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Build from resolved settings. The secret must already be resolved.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let secret = settings
            .secret_key
            .as_deref()
            .ok_or_else(|| Error::Config("Secret key has not been resolved".to_string()))?;

        Ok(Self::new(
            secret,
            settings.jwt_algorithm()?,
            Duration::minutes(settings.access_token_expire_minutes),
            Duration::days(settings.refresh_token_expire_days),
        ))
    }

    /// Sign a token of the given kind for a user
    pub fn issue(&self, user_id: i64, kind: TokenKind) -> std::result::Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(user_id, kind, ttl)
    }

    fn issue_with_ttl(
        &self,
        user_id: i64,
        kind: TokenKind,
        ttl: Duration,
    ) -> std::result::Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            typ: kind,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Sign an access and refresh token for a user
    pub fn issue_pair(&self, user_id: i64) -> std::result::Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenKind::Access)?,
            refresh_token: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    /// Verify signature, expiry and kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> std::result::Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.typ != expected {
            return Err(TokenError::WrongKind { expected });
        }

        Ok(data.claims)
    }
}

/// Generate a random signing secret (64 hex characters)
pub fn generate_secret_key() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| format!("{:02x}", rng.gen::<u8>()))
        .collect()
}

/// Hash a password with bcrypt on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored bcrypt hash
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("Password verification task failed: {}", e)))?;

    Ok(outcome.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "test-secret",
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(7),
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let token = issuer.issue(42, TokenKind::Access).unwrap();

        let claims = issuer.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.typ, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.issue_pair(7).unwrap();

        assert_eq!(
            issuer.verify(&pair.refresh_token, TokenKind::Access).unwrap_err(),
            TokenError::WrongKind { expected: TokenKind::Access }
        );
        assert_eq!(
            issuer.verify(&pair.access_token, TokenKind::Refresh).unwrap_err(),
            TokenError::WrongKind { expected: TokenKind::Refresh }
        );
        assert!(issuer.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_pair_tokens_are_distinct() {
        let issuer = issuer();
        let first = issuer.issue_pair(1).unwrap();
        let second = issuer.issue_pair(1).unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.access_token, first.refresh_token);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let token = issuer
            .issue_with_ttl(1, TokenKind::Access, Duration::seconds(-10))
            .unwrap();

        assert_eq!(
            issuer.verify(&token, TokenKind::Access).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issuer().issue(1, TokenKind::Access).unwrap();
        let other = TokenIssuer::new(
            "other-secret",
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(7),
        );

        assert_eq!(
            other.verify(&token, TokenKind::Access).unwrap_err(),
            TokenError::Invalid
        );
        assert_eq!(
            issuer().verify("not.a.token", TokenKind::Access).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_from_settings_requires_secret() {
        let settings = Settings::default();
        assert!(TokenIssuer::from_settings(&settings).is_err());

        let settings = Settings {
            secret_key: Some("abc".to_string()),
            ..Settings::default()
        };
        assert!(TokenIssuer::from_settings(&settings).is_ok());
    }

    #[test]
    fn test_generate_secret_key() {
        let a = generate_secret_key();
        let b = generate_secret_key();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hash = hash_password("hunter22".to_string(), 4).await.unwrap();
        assert_ne!(hash, "hunter22");

        assert!(verify_password("hunter22".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
        assert!(!verify_password("x".to_string(), "not-a-hash".to_string()).await.unwrap());
    }
}
