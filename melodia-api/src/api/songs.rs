//! Song endpoints

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use melodia_common::db::{NewSong, SongUpdate};
use melodia_import::audio::is_preview_url;
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, MaybeUser};
use crate::models::{DeleteSongResponse, SearchResponse, SongResponse};
use crate::pagination::{check_page, PageParams};
use crate::services::songs;
use crate::AppState;

const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /songs
pub async fn list_songs(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Vec<SongResponse>>> {
    let page = params.page()?;
    Ok(Json(songs::list(&state.db, viewer.id(), page).await?))
}

/// GET /songs/:id
pub async fn get_song(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<SongResponse>> {
    Ok(Json(songs::get(&state.db, viewer.id(), id).await?))
}

/// POST /songs
pub async fn create_song(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<NewSong>,
) -> ApiResult<(StatusCode, Json<SongResponse>)> {
    let song = songs::create(&state.db, payload).await?;
    let song = songs::annotate_one(&state.db, Some(user.id), song).await?;
    Ok((StatusCode::CREATED, Json(song)))
}

/// PUT /songs/:id
pub async fn update_song(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<SongUpdate>,
) -> ApiResult<Json<SongResponse>> {
    let song = songs::update(&state.db, id, payload).await?;
    Ok(Json(songs::annotate_one(&state.db, Some(user.id), song).await?))
}

/// DELETE /songs/:id
pub async fn delete_song(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<DeleteSongResponse>> {
    Ok(Json(songs::delete(&state.db, id).await?))
}

/// GET /songs/search/query?q=
pub async fn search_songs(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let page = check_page(params.skip, params.limit)?;
    let query = params.q.unwrap_or_default();
    Ok(Json(songs::search(&state.db, viewer.id(), &query, page).await?))
}

/// GET /songs/:id/stream
///
/// Serves the cached clip when one is on disk (with range support), otherwise
/// proxies the preview URL. Only files under the audio storage directory are
/// served.
pub async fn stream_song(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    request: Request,
) -> ApiResult<Response> {
    let song = songs::require_song(&state.db, id).await?;

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = song.local_file_path.as_deref().filter(|p| !p.is_empty()) {
        candidates.push(PathBuf::from(path));
    }
    if is_preview_url(&song.url) {
        candidates.push(state.audio.path_for(&song.url));
    }

    let mut cached = None;
    for path in candidates {
        if let Some(resolved) = inside_audio_dir(state.audio.dir(), &path).await {
            cached = Some(resolved);
            break;
        }
    }

    if let Some(path) = cached {
        debug!("Streaming song {} from {}", id, path.display());
        let response = ServeFile::new(&path)
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        return Ok(response.map(Body::new));
    }

    if is_preview_url(&song.url) {
        return proxy_preview(&state, &song.url).await;
    }

    Err(ApiError::NotFound(format!("No audio available for song {}", id)))
}

/// Canonical form of `path` when it is a regular file under `audio_dir`
async fn inside_audio_dir(audio_dir: &Path, path: &Path) -> Option<PathBuf> {
    let root = tokio::fs::canonicalize(audio_dir).await.ok()?;
    let resolved = tokio::fs::canonicalize(path).await.ok()?;

    if !resolved.starts_with(&root) {
        warn!("Refusing to stream {} from outside {}", resolved.display(), root.display());
        return None;
    }

    let metadata = tokio::fs::metadata(&resolved).await.ok()?;
    metadata.is_file().then_some(resolved)
}

async fn proxy_preview(state: &AppState, url: &str) -> ApiResult<Response> {
    debug!("Proxying preview {}", url);

    let upstream = state
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::BadGateway(format!("Preview fetch failed: {}", e)))?;

    if !upstream.status().is_success() {
        return Err(ApiError::BadGateway(format!(
            "Preview source returned {}",
            upstream.status()
        )));
    }

    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("audio/"))
        .unwrap_or(DEFAULT_AUDIO_TYPE)
        .to_string();

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| ApiError::BadGateway(format!("Preview fetch failed: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs).post(create_song))
        .route("/songs/search/query", get(search_songs))
        .route(
            "/songs/:id",
            get(get_song).put(update_song).delete(delete_song),
        )
        .route("/songs/:id/stream", get(stream_song))
}
