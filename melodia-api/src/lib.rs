//! melodia-api library - music streaming REST API
//!
//! Routes live under the configurable API prefix (`/api/v1` by default);
//! `/` and `/health` sit outside it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use melodia_common::auth::TokenIssuer;
use melodia_common::Settings;
use melodia_import::{AudioStore, SpotifyClient, TrackCatalog};
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod api;
pub mod error;
pub mod extract;
pub mod models;
pub mod pagination;
pub mod services;

const PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub settings: Arc<Settings>,
    pub tokens: TokenIssuer,
    /// `None` when no catalog credentials are configured
    pub catalog: Option<Arc<dyn TrackCatalog>>,
    pub audio: AudioStore,
    /// Client for proxying preview audio
    pub http: reqwest::Client,
    pub startup_time: Instant,
}

impl AppState {
    /// Build state from resolved settings. The token secret must be resolved.
    pub fn new(db: SqlitePool, settings: Settings) -> anyhow::Result<Self> {
        let tokens = TokenIssuer::from_settings(&settings)?;

        let catalog: Option<Arc<dyn TrackCatalog>> = if settings.spotify_configured() {
            Some(Arc::new(SpotifyClient::from_settings(&settings)?))
        } else {
            info!("Spotify credentials not configured; import endpoints disabled");
            None
        };

        let audio = AudioStore::new(settings.audio_storage_dir.clone())?;
        let http = reqwest::Client::builder().timeout(PROXY_TIMEOUT).build()?;

        Ok(Self {
            db,
            settings: Arc::new(settings),
            tokens,
            catalog,
            audio,
            http,
            startup_time: Instant::now(),
        })
    }

    /// Replace the catalog (alternative catalogs and tests)
    pub fn with_catalog(mut self, catalog: Arc<dyn TrackCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let prefix = state.settings.api_prefix.trim_end_matches('/').to_string();
    let cors = cors_layer(&state.settings);

    let api = api::api_routes();
    let routed = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    routed
        .merge(api::health::health_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `*` allows any origin without credentials; a list allows credentials
fn cors_layer(settings: &Settings) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    match settings.allowed_origin_list() {
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(methods)
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
        }
    }
}
