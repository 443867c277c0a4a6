//! Database access
//!
//! `init_database` brings a database up to the current schema; the remaining
//! modules are free async functions over a `&SqlitePool`, one module per table.

pub mod albums;
pub mod init;
pub mod likes;
pub mod migrations;
pub mod models;
pub mod playlists;
pub mod schema_sync;
pub mod settings;
pub mod songs;
pub mod table_schemas;
pub mod users;

pub use init::init_database;
pub use models::*;
