//! HTTP handlers
//!
//! Each resource module exposes a route builder; [`api_routes`] merges them
//! for nesting under the API prefix.

pub mod albums;
pub mod auth;
pub mod health;
pub mod import;
pub mod likes;
pub mod playlists;
pub mod songs;

use axum::Router;

use crate::AppState;

pub use health::health_routes;

/// Every route that lives under the API prefix
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::auth_routes())
        .merge(songs::song_routes())
        .merge(import::import_routes())
        .merge(playlists::playlist_routes())
        .merge(likes::like_routes())
        .merge(albums::album_routes())
}
