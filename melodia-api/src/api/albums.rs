//! Album endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use melodia_common::db::{Album, AlbumUpdate, NewAlbum};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, MaybeUser};
use crate::models::{AlbumDetail, MessageResponse, SongResponse};
use crate::pagination::PageParams;
use crate::services::albums;
use crate::AppState;

/// POST /albums
pub async fn create_album(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiJson(payload): ApiJson<NewAlbum>,
) -> ApiResult<(StatusCode, Json<Album>)> {
    let album = albums::create(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(album)))
}

/// GET /albums
pub async fn list_albums(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Vec<Album>>> {
    let page = params.page()?;
    Ok(Json(albums::list(&state.db, page).await?))
}

/// GET /albums/:id
pub async fn get_album(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<AlbumDetail>> {
    Ok(Json(albums::get(&state.db, viewer.id(), id).await?))
}

/// PUT /albums/:id
pub async fn update_album(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AlbumUpdate>,
) -> ApiResult<Json<Album>> {
    Ok(Json(albums::update(&state.db, id, payload).await?))
}

/// DELETE /albums/:id
pub async fn delete_album(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    albums::delete(&state.db, id).await?;
    Ok(Json(MessageResponse::new(format!("Album {} deleted", id))))
}

/// POST /albums/:id/songs/:song_id
pub async fn attach_song(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath((album_id, song_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<SongResponse>> {
    Ok(Json(
        albums::attach_song(&state.db, Some(user.id), album_id, song_id).await?,
    ))
}

pub fn album_routes() -> Router<AppState> {
    Router::new()
        .route("/albums", post(create_album).get(list_albums))
        .route(
            "/albums/:id",
            get(get_album).put(update_album).delete(delete_album),
        )
        .route("/albums/:id/songs/:song_id", post(attach_song))
}
