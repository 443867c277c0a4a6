//! Batch importer
//!
//! For each catalog hit: map to a song record, skip it if a song with the same
//! title and artist exists (back-filling artwork), download the preview,
//! find-or-create the album and insert the song.

use crate::audio::{is_preview_url, AudioStore};
use crate::catalog::{CatalogTrack, TrackCatalog};
use crate::{ImportError, ImportResult};
use melodia_common::db::{self, NewSong, Song};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Preview clips are 30 seconds
pub const PREVIEW_DURATION_SECS: f64 = 30.0;

pub const MAX_IMPORT_LIMIT: u32 = 50;

/// Candidates fetched when importing a single track
const SINGLE_IMPORT_CANDIDATES: u32 = 10;

#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Imported(Song),
    /// Already in the database (artwork may have been back-filled)
    Existing(Song),
}

impl ImportOutcome {
    pub fn into_song(self) -> Song {
        match self {
            ImportOutcome::Imported(song) | ImportOutcome::Existing(song) => song,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedTrack {
    pub title: String,
    pub artist: String,
    pub reason: String,
}

/// Summary of one import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub query: String,
    pub imported: Vec<Song>,
    pub existing: Vec<Song>,
    pub failed: Vec<FailedTrack>,
    /// Non-fatal problems, e.g. a preview that could not be downloaded
    pub warnings: Vec<String>,
}

impl ImportReport {
    /// Imported and existing songs, in catalog order within each group
    pub fn songs(&self) -> impl Iterator<Item = &Song> {
        self.imported.iter().chain(self.existing.iter())
    }
}

pub struct Importer {
    db: SqlitePool,
    catalog: Arc<dyn TrackCatalog>,
    audio: Option<AudioStore>,
}

impl Importer {
    /// `audio: None` imports metadata only
    pub fn new(db: SqlitePool, catalog: Arc<dyn TrackCatalog>, audio: Option<AudioStore>) -> Self {
        Self { db, catalog, audio }
    }

    /// Import up to `limit` tracks matching `query`
    ///
    /// Catalog failures abort the run. Failures on individual tracks are
    /// logged and recorded in the report.
    pub async fn import_query(&self, query: &str, limit: u32) -> ImportResult<ImportReport> {
        let query = validate_query(query)?;
        if !(1..=MAX_IMPORT_LIMIT).contains(&limit) {
            return Err(ImportError::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                MAX_IMPORT_LIMIT, limit
            )));
        }

        info!("Importing tracks for '{}' (limit {})", query, limit);

        let tracks = self.catalog.search_tracks(query, limit).await?;
        let genres = self.fetch_genres(&tracks).await;

        let mut report = ImportReport {
            query: query.to_string(),
            ..ImportReport::default()
        };

        for track in &tracks {
            match self.import_track(track, &genres, &mut report.warnings).await {
                Ok(ImportOutcome::Imported(song)) => report.imported.push(song),
                Ok(ImportOutcome::Existing(song)) => report.existing.push(song),
                Err(e) => {
                    let (title, artist) = title_and_artist(track);
                    warn!("Skipping '{}' by '{}': {}", title, artist, e);
                    report.failed.push(FailedTrack {
                        title,
                        artist,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Import of '{}' finished: {} imported, {} existing, {} failed",
            query,
            report.imported.len(),
            report.existing.len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Import the best match for `query`, preferring a track with a preview
    ///
    /// `None` when the catalog has no match.
    pub async fn import_first(&self, query: &str) -> ImportResult<Option<ImportOutcome>> {
        let query = validate_query(query)?;
        let tracks = self.catalog.search_tracks(query, SINGLE_IMPORT_CANDIDATES).await?;

        let Some(track) = tracks
            .iter()
            .find(|t| t.has_preview())
            .or_else(|| tracks.first())
        else {
            info!("No tracks found for '{}'", query);
            return Ok(None);
        };

        let genres = self.fetch_genres(std::slice::from_ref(track)).await;
        let mut warnings = Vec::new();
        let outcome = self.import_track(track, &genres, &mut warnings).await?;

        Ok(Some(outcome))
    }

    /// Genre lookup is best-effort; failures only cost the genre
    async fn fetch_genres(&self, tracks: &[CatalogTrack]) -> HashMap<String, Vec<String>> {
        let mut ids: Vec<String> = tracks
            .iter()
            .filter_map(|t| t.primary_artist().and_then(|a| a.id.clone()))
            .collect();
        ids.sort();
        ids.dedup();

        if ids.is_empty() {
            return HashMap::new();
        }

        match self.catalog.artist_genres(&ids).await {
            Ok(genres) => genres,
            Err(e) => {
                warn!("Artist genre lookup failed, continuing without genres: {}", e);
                HashMap::new()
            }
        }
    }

    async fn import_track(
        &self,
        track: &CatalogTrack,
        genres: &HashMap<String, Vec<String>>,
        warnings: &mut Vec<String>,
    ) -> ImportResult<ImportOutcome> {
        let mut song = map_track(track, genres);
        if song.url.is_empty() {
            return Err(ImportError::InvalidInput("track has neither a preview nor a catalog URL".to_string()));
        }

        if let Some(existing) = db::songs::find_by_title_artist(&self.db, &song.title, &song.artist).await? {
            return self.refresh_existing(existing, &song).await;
        }

        if let Some(store) = &self.audio {
            if is_preview_url(&song.url) {
                match store.download(&song.url).await {
                    Ok(path) => song.local_file_path = Some(path.to_string_lossy().into_owned()),
                    Err(e) => {
                        warn!("Failed to download audio for '{}': {}", song.title, e);
                        warnings.push(format!("{} - {}: {}", song.artist, song.title, e));
                    }
                }
            }
        }

        if let Some(album_title) = song.album.clone() {
            let album = db::albums::find_or_create_album(
                &self.db,
                &album_title,
                &song.artist,
                song.image_url.as_deref(),
            )
            .await?;
            song.album_id = Some(album.id);
        }

        let created = db::songs::insert_song(&self.db, &song).await?;
        info!("Imported song {}: '{}' by '{}'", created.id, created.title, created.artist);

        Ok(ImportOutcome::Imported(created))
    }

    async fn refresh_existing(&self, existing: Song, mapped: &NewSong) -> ImportResult<ImportOutcome> {
        match (&existing.image_url, &mapped.image_url) {
            (None, Some(image_url)) => {
                db::songs::set_image_url(&self.db, existing.id, image_url).await?;
                info!("Updated image_url for existing song: {}", existing.title);

                let refreshed = db::songs::get_song(&self.db, existing.id)
                    .await?
                    .unwrap_or(existing);
                Ok(ImportOutcome::Existing(refreshed))
            }
            _ => {
                debug!("Song already present: '{}' by '{}'", existing.title, existing.artist);
                Ok(ImportOutcome::Existing(existing))
            }
        }
    }
}

/// Catalog track to song record
///
/// Duration is the clip length when a preview exists, the full track otherwise.
/// The URL is the preview when there is one, else the catalog page.
pub fn map_track(track: &CatalogTrack, genres: &HashMap<String, Vec<String>>) -> NewSong {
    let (title, artist) = title_and_artist(track);

    let genre = track
        .primary_artist()
        .and_then(|a| a.id.as_ref())
        .and_then(|id| genres.get(id))
        .and_then(|g| g.first())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_GENRE.to_string());

    let (duration, url) = match &track.preview_url {
        Some(preview) if !preview.is_empty() => (PREVIEW_DURATION_SECS, preview.clone()),
        _ => (
            track.duration_ms.map(|ms| ms as f64 / 1000.0).unwrap_or(0.0),
            track.external_url.clone().unwrap_or_default(),
        ),
    };

    NewSong {
        title,
        artist,
        album: Some(
            track
                .album_name
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        ),
        album_id: None,
        genre: Some(genre),
        duration,
        url,
        local_file_path: None,
        image_url: track.album_image_url.clone().filter(|u| !u.is_empty()),
    }
}

fn title_and_artist(track: &CatalogTrack) -> (String, String) {
    let title = track
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let artist = track
        .primary_artist()
        .map(|a| a.name.clone())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    (title, artist)
}

fn validate_query(query: &str) -> ImportResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ImportError::InvalidInput("query must not be empty".to_string()));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogArtist;

    fn track() -> CatalogTrack {
        CatalogTrack {
            id: "t1".to_string(),
            title: Some("Song".to_string()),
            artists: vec![CatalogArtist {
                id: Some("a1".to_string()),
                name: "Artist".to_string(),
            }],
            album_name: Some("Record".to_string()),
            album_image_url: Some("http://img".to_string()),
            duration_ms: Some(215_500),
            preview_url: Some("https://p.scdn.co/mp3-preview/1".to_string()),
            external_url: Some("https://open.spotify.com/track/t1".to_string()),
        }
    }

    #[test]
    fn test_map_track_with_preview() {
        let genres = HashMap::from([("a1".to_string(), vec!["rock".to_string(), "pop".to_string()])]);
        let song = map_track(&track(), &genres);

        assert_eq!(song.title, "Song");
        assert_eq!(song.artist, "Artist");
        assert_eq!(song.album.as_deref(), Some("Record"));
        assert_eq!(song.genre.as_deref(), Some("rock"));
        assert_eq!(song.duration, 30.0);
        assert_eq!(song.url, "https://p.scdn.co/mp3-preview/1");
        assert_eq!(song.image_url.as_deref(), Some("http://img"));
    }

    #[test]
    fn test_map_track_without_preview_uses_full_length() {
        let mut t = track();
        t.preview_url = None;
        let song = map_track(&t, &HashMap::new());

        assert_eq!(song.duration, 215.5);
        assert_eq!(song.url, "https://open.spotify.com/track/t1");
        assert_eq!(song.genre.as_deref(), Some(UNKNOWN_GENRE));
    }

    #[test]
    fn test_map_track_defaults() {
        let t = CatalogTrack {
            id: "t".to_string(),
            ..CatalogTrack::default()
        };
        let song = map_track(&t, &HashMap::new());

        assert_eq!(song.title, UNKNOWN_TITLE);
        assert_eq!(song.artist, UNKNOWN_ARTIST);
        assert_eq!(song.album.as_deref(), Some(UNKNOWN_ALBUM));
        assert_eq!(song.duration, 0.0);
        assert_eq!(song.url, "");
        assert!(song.image_url.is_none());
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  queen ").unwrap(), "queen");
        assert!(validate_query("   ").is_err());
    }
}
