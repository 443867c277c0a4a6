//! Registration, login, token refresh and token-to-user resolution

use melodia_common::auth::{self, TokenKind, MAX_PASSWORD_BYTES};
use melodia_common::db::{users, User};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::models::{AccessTokenResponse, LoginResponse, RegisterRequest, UserSummary};
use crate::AppState;

pub const TOKEN_TYPE: &str = "bearer";

const MIN_PASSWORD_CHARS: usize = 6;
const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 3..=50;
const MAX_EMAIL_CHARS: usize = 254;

const BAD_CREDENTIALS: &str = "Incorrect email or password";

/// Lower-cased, trimmed email if it looks like `local@domain.tld`
pub fn normalize_email(raw: &str) -> ApiResult<String> {
    let email = raw.trim().to_lowercase();
    let invalid = || ApiError::validation("email", "Invalid email address");

    if email.is_empty() || email.chars().count() > MAX_EMAIL_CHARS || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }

    Ok(email)
}

fn validate_username(raw: &str) -> ApiResult<String> {
    let username = raw.trim();
    if !USERNAME_CHARS.contains(&username.chars().count()) {
        return Err(ApiError::validation(
            "username",
            "Username must be between 3 and 50 characters",
        ));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::validation(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::validation(
            "password",
            "Password must be at most 72 bytes",
        ));
    }
    Ok(())
}

/// Create an account
pub async fn register(state: &AppState, request: RegisterRequest) -> ApiResult<User> {
    let email = normalize_email(&request.email)?;
    let username = validate_username(&request.username)?;
    validate_password(&request.password)?;

    if users::email_exists(&state.db, &email).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }
    if users::username_exists(&state.db, &username).await? {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let hashed = auth::hash_password(request.password, state.settings.bcrypt_cost).await?;

    // The unique constraints still decide concurrent registrations
    let user = users::create_user(&state.db, &email, &username, &hashed).await?;
    info!("Registered user {} ({})", user.id, user.username);

    Ok(user)
}

/// Check credentials and issue an access + refresh token pair
pub async fn login(state: &AppState, email: &str, password: String) -> ApiResult<LoginResponse> {
    let unauthorized = || ApiError::Unauthorized(BAD_CREDENTIALS.to_string());

    let email = email.trim().to_lowercase();
    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(unauthorized)?;

    if !auth::verify_password(password, user.hashed_password.clone()).await? {
        debug!("Password mismatch for user {}", user.id);
        return Err(unauthorized());
    }

    let pair = state.tokens.issue_pair(user.id)?;

    Ok(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: TOKEN_TYPE,
        user: UserSummary {
            id: user.id,
            email: user.email,
            username: user.username,
        },
    })
}

/// Exchange a refresh token for a new access token
pub async fn refresh(state: &AppState, refresh_token: &str) -> ApiResult<AccessTokenResponse> {
    let claims = state.tokens.verify(refresh_token, TokenKind::Refresh)?;
    let user_id = claims.user_id()?;

    if users::get_user(&state.db, user_id).await?.is_none() {
        return Err(ApiError::Unauthorized("User no longer exists".to_string()));
    }

    Ok(AccessTokenResponse {
        access_token: state.tokens.issue(user_id, TokenKind::Access)?,
        token_type: TOKEN_TYPE,
    })
}

/// User behind an access token
pub async fn current_user(state: &AppState, access_token: &str) -> ApiResult<User> {
    let claims = state.tokens.verify(access_token, TokenKind::Access)?;
    let user_id = claims.user_id()?;

    users::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))
}
