//! melodia-import - catalog import CLI
//!
//! Searches the Spotify catalog and stores the matching tracks (and their
//! preview clips) in the Melodia database.
//!
//! ```text
//! melodia-import "daft punk" 20
//! melodia-import "lofi" --no-download --database-url sqlite://melodia.db
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use melodia_common::{db, Settings};
use melodia_import::{AudioStore, Importer, SpotifyClient};

/// Command-line arguments for melodia-import
#[derive(Parser, Debug)]
#[command(name = "melodia-import")]
#[command(about = "Import songs from the Spotify catalog into Melodia")]
#[command(version)]
struct Args {
    /// Catalog search query
    query: String,

    /// Number of tracks to import (1-50)
    #[arg(default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=50))]
    limit: u32,

    /// Database URL (overrides DATABASE_URL and the config file)
    #[arg(long)]
    database_url: Option<String>,

    /// Directory for downloaded preview clips (overrides AUDIO_STORAGE_DIR)
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// Store metadata only, skip preview downloads
    #[arg(long)]
    no_download: bool,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "melodia_import=info,melodia_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "melodia-import {} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Import failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }
    if let Some(dir) = args.audio_dir {
        settings.audio_storage_dir = dir;
    }

    let catalog = SpotifyClient::from_settings(&settings)?;

    info!("Database: {}", settings.database_url_for_log());
    let pool = db::init_database(&settings.database_url)
        .await
        .context("Failed to open database")?;

    let audio = if args.no_download {
        None
    } else {
        info!("Audio storage: {}", settings.audio_storage_dir.display());
        Some(AudioStore::new(settings.audio_storage_dir.clone())?)
    };

    let importer = Importer::new(pool.clone(), Arc::new(catalog), audio);
    let report = importer.import_query(&args.query, args.limit).await?;

    for song in &report.imported {
        info!("  + {} - {} ({:.1}s)", song.artist, song.title, song.duration);
    }
    for song in &report.existing {
        info!("  = {} - {} (already present)", song.artist, song.title);
    }
    for failed in &report.failed {
        info!("  ! {} - {}: {}", failed.artist, failed.title, failed.reason);
    }

    info!(
        "Done: {} imported, {} already present, {} failed",
        report.imported.len(),
        report.existing.len(),
        report.failed.len()
    );

    pool.close().await;
    Ok(())
}
