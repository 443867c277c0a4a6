//! Catalog abstraction
//!
//! The importer only needs two things from a catalog: a track search and a
//! genre lookup for artists. Tracks come back in a catalog-neutral shape.

use crate::ImportResult;
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogArtist {
    pub id: Option<String>,
    pub name: String,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogTrack {
    pub id: String,
    pub title: Option<String>,
    pub artists: Vec<CatalogArtist>,
    pub album_name: Option<String>,
    /// First (largest) album image
    pub album_image_url: Option<String>,
    pub duration_ms: Option<u64>,
    /// 30-second clip, when the catalog offers one
    pub preview_url: Option<String>,
    /// Catalog web page for the track
    pub external_url: Option<String>,
}

impl CatalogTrack {
    pub fn has_preview(&self) -> bool {
        self.preview_url.as_deref().map(|u| !u.is_empty()).unwrap_or(false)
    }

    pub fn primary_artist(&self) -> Option<&CatalogArtist> {
        self.artists.first()
    }
}

#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Search tracks matching `query`, at most `limit` results
    async fn search_tracks(&self, query: &str, limit: u32) -> ImportResult<Vec<CatalogTrack>>;

    /// Genres per artist id. Artists the catalog does not know are omitted.
    async fn artist_genres(&self, artist_ids: &[String]) -> ImportResult<HashMap<String, Vec<String>>>;
}
