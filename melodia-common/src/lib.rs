//! # Melodia Common Library
//!
//! Shared code for the Melodia binaries including:
//! - Configuration loading (CLI > ENV > TOML > defaults)
//! - Database initialization, schema synchronization and migrations
//! - Persistence access for users, songs, albums, playlists and likes
//! - Token and password primitives used by the auth service

pub mod auth;
pub mod config;
pub mod db;
pub mod error;

pub use config::Settings;
pub use error::{Error, Result};
