//! Playlist endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use melodia_common::db::{NewPlaylist, Playlist, PlaylistUpdate};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, MaybeUser};
use crate::models::{MessageResponse, PlaylistDetail};
use crate::pagination::PageParams;
use crate::services::playlists;
use crate::AppState;

/// POST /playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<NewPlaylist>,
) -> ApiResult<(StatusCode, Json<Playlist>)> {
    let playlist = playlists::create(&state.db, user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /playlists (caller's own)
pub async fn list_playlists(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Vec<Playlist>>> {
    let page = params.page()?;
    Ok(Json(playlists::list_mine(&state.db, user.id, page).await?))
}

/// GET /playlists/:id
pub async fn get_playlist(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PlaylistDetail>> {
    Ok(Json(playlists::get(&state.db, viewer.id(), id).await?))
}

/// PUT /playlists/:id
pub async fn update_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PlaylistUpdate>,
) -> ApiResult<Json<Playlist>> {
    Ok(Json(playlists::update(&state.db, user.id, id, payload).await?))
}

/// DELETE /playlists/:id
pub async fn delete_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    playlists::delete(&state.db, user.id, id).await?;
    Ok(Json(MessageResponse::new(format!("Playlist {} deleted", id))))
}

/// POST /playlists/:id/songs/:song_id
pub async fn add_song(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath((playlist_id, song_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<PlaylistDetail>> {
    Ok(Json(
        playlists::add_song(&state.db, user.id, playlist_id, song_id).await?,
    ))
}

/// DELETE /playlists/:id/songs/:song_id
pub async fn remove_song(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath((playlist_id, song_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<MessageResponse>> {
    playlists::remove_song(&state.db, user.id, playlist_id, song_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Song {} removed from playlist {}",
        song_id, playlist_id
    ))))
}

pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/playlists", post(create_playlist).get(list_playlists))
        .route(
            "/playlists/:id",
            get(get_playlist).put(update_playlist).delete(delete_playlist),
        )
        .route(
            "/playlists/:id/songs/:song_id",
            post(add_song).delete(remove_song),
        )
}
