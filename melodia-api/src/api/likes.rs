//! Like endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use melodia_common::db::NewSong;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::models::{MessageResponse, SongResponse};
use crate::pagination::PageParams;
use crate::services::likes;
use crate::AppState;

/// POST /likes/:song_id
pub async fn like_song(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(song_id): ApiPath<i64>,
) -> ApiResult<Json<SongResponse>> {
    Ok(Json(likes::like(&state.db, user.id, song_id).await?))
}

/// DELETE /likes/:song_id
pub async fn unlike_song(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(song_id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    likes::unlike(&state.db, user.id, song_id).await?;
    Ok(Json(MessageResponse::new(format!("Song {} unliked", song_id))))
}

/// GET /likes
pub async fn list_likes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Vec<SongResponse>>> {
    let page = params.page()?;
    Ok(Json(likes::list_mine(&state.db, user.id, page).await?))
}

/// POST /likes/with-data
pub async fn like_with_data(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<NewSong>,
) -> ApiResult<Json<SongResponse>> {
    Ok(Json(likes::like_with_data(&state.db, user.id, payload).await?))
}

pub fn like_routes() -> Router<AppState> {
    Router::new()
        .route("/likes", get(list_likes))
        .route("/likes/with-data", post(like_with_data))
        .route("/likes/:song_id", post(like_song).delete(unlike_song))
}
