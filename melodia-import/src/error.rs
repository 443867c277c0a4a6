//! Import error types

use thiserror::Error;

/// Import result type
pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Import errors
///
/// `MissingCredentials` and `Catalog` abort a run. The others are per-track
/// and only skip the track they happened on.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Spotify credentials are not configured (set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET)")]
    MissingCredentials,

    /// Catalog unreachable or answered with an error
    #[error("Catalog request failed: {0}")]
    Catalog(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Preview download failed: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] melodia_common::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
