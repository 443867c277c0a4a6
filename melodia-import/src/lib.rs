//! # Melodia Import
//!
//! Pulls track metadata and preview audio from an external music catalog
//! into the Melodia database.
//!
//! - [`catalog`]: the catalog abstraction the importer works against
//! - [`spotify`]: Spotify Web API implementation (client-credentials flow)
//! - [`audio`]: content-addressed storage for downloaded preview clips
//! - [`importer`]: search, map, de-duplicate and insert

pub mod audio;
pub mod catalog;
pub mod error;
pub mod importer;
pub mod spotify;

pub use audio::AudioStore;
pub use catalog::{CatalogArtist, CatalogTrack, TrackCatalog};
pub use error::{ImportError, ImportResult};
pub use importer::{FailedTrack, ImportOutcome, ImportReport, Importer};
pub use spotify::SpotifyClient;
