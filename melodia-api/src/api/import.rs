//! Catalog import endpoints
//!
//! Both require authentication and a configured catalog (503 otherwise).

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use melodia_import::{ImportOutcome, Importer, TrackCatalog};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiQuery, AuthUser};
use crate::models::{BulkImportResponse, SongResponse};
use crate::services::songs;
use crate::AppState;

const DEFAULT_BULK_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub query: Option<String>,
    pub limit: Option<u32>,
}

impl ImportParams {
    fn query(&self) -> ApiResult<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::validation("query", "Import query must not be empty"))
    }
}

fn importer(state: &AppState) -> ApiResult<Importer> {
    let catalog: Arc<dyn TrackCatalog> = state.catalog.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("Spotify import is not configured".to_string())
    })?;

    Ok(Importer::new(state.db.clone(), catalog, Some(state.audio.clone())))
}

/// POST /songs/import/spotify?query=
///
/// 201 when a new song was stored, 200 when it was already present.
pub async fn import_single(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<ImportParams>,
) -> ApiResult<(StatusCode, Json<SongResponse>)> {
    let query = params.query()?;
    let importer = importer(&state)?;

    let outcome = importer
        .import_first(query)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No tracks found for '{}'", query)))?;

    let status = match outcome {
        ImportOutcome::Imported(_) => StatusCode::CREATED,
        ImportOutcome::Existing(_) => StatusCode::OK,
    };
    info!("User {} imported '{}' ({})", user.id, query, status);

    let song = songs::annotate_one(&state.db, Some(user.id), outcome.into_song()).await?;
    Ok((status, Json(song)))
}

/// POST /songs/import/spotify/bulk?query=&limit=
pub async fn import_bulk(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<ImportParams>,
) -> ApiResult<Json<BulkImportResponse>> {
    let query = params.query()?;
    let limit = params.limit.unwrap_or(DEFAULT_BULK_LIMIT);
    let importer = importer(&state)?;

    let report = importer.import_query(query, limit).await?;
    info!(
        "User {} bulk import '{}': {} imported, {} existing, {} failed",
        user.id,
        query,
        report.imported.len(),
        report.existing.len(),
        report.failed.len()
    );

    let rows = report.songs().cloned().collect();
    let songs = songs::annotate(&state.db, Some(user.id), rows).await?;

    Ok(Json(BulkImportResponse {
        query: report.query,
        imported_count: report.imported.len(),
        existing_count: report.existing.len(),
        songs,
        failed: report.failed,
        warnings: report.warnings,
    }))
}

#[derive(Debug, Serialize)]
pub struct SampleTrack {
    pub title: String,
    pub artist: String,
}

/// Catalog connectivity report
#[derive(Debug, Serialize)]
pub struct CatalogStatus {
    /// "success" or "error"
    pub status: &'static str,
    pub message: String,
    pub credentials_configured: bool,
    pub search_working: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_track: Option<SampleTrack>,
}

/// GET /songs/test/spotify
///
/// Always 200; problems are reported in the body.
pub async fn catalog_status(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
) -> Json<CatalogStatus> {
    let Some(catalog) = state.catalog.as_ref() else {
        return Json(CatalogStatus {
            status: "error",
            message: "Spotify credentials not configured".to_string(),
            credentials_configured: false,
            search_working: false,
            sample_track: None,
        });
    };

    match catalog.search_tracks("test", 1).await {
        Ok(tracks) => Json(CatalogStatus {
            status: "success",
            message: "Spotify API connection working".to_string(),
            credentials_configured: true,
            search_working: true,
            sample_track: tracks.first().map(|t| SampleTrack {
                title: t.title.clone().unwrap_or_default(),
                artist: t
                    .primary_artist()
                    .map(|a| a.name.clone())
                    .unwrap_or_default(),
            }),
        }),
        Err(e) => {
            warn!("Catalog status check failed: {}", e);
            Json(CatalogStatus {
                status: "error",
                message: format!("Failed to search Spotify: {}", e),
                credentials_configured: true,
                search_working: false,
                sample_track: None,
            })
        }
    }
}

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/songs/import/spotify", post(import_single))
        .route("/songs/import/spotify/bulk", post(import_bulk))
        .route("/songs/test/spotify", get(catalog_status))
}
