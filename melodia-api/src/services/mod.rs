//! Domain services called by the HTTP handlers

pub mod albums;
pub mod auth;
pub mod likes;
pub mod playlists;
pub mod songs;
