//! Account endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::{bearer_token, ApiJson, AuthUser};
use crate::models::{AccessTokenResponse, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, UserResponse};
use crate::services::auth;
use crate::AppState;

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user = auth::register(&state, request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let response = auth::login(&state, &request.email, request.password).await?;
    Ok(Json(response))
}

/// GET /auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

/// POST /auth/refresh
///
/// The refresh token comes from `{"refresh_token": ...}`, or from the bearer
/// header when the body is empty or omits it.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AccessTokenResponse>> {
    let request: RefreshRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid refresh request body: {}", e)))?
    };

    let token = request
        .refresh_token
        .as_deref()
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| ApiError::Unauthorized("Refresh token required".to_string()))?;

    Ok(Json(auth::refresh(&state, token).await?))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
}
