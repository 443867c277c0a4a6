//! melodia-api - music streaming REST API server
//!
//! Settings come from CLI flags, then environment variables, then
//! `config.toml`, then built-in defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use melodia_api::AppState;
use melodia_common::{db, Settings};

/// Command-line arguments for melodia-api
#[derive(Parser, Debug)]
#[command(name = "melodia-api")]
#[command(about = "Melodia music streaming API server")]
#[command(version)]
struct Args {
    /// Address to bind (overrides MELODIA_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides MELODIA_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Before settings load; DEBUG swaps the filter once settings are known
    let (filter, filter_handle) = reload::Layer::new(log_filter(false));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }

    if settings.debug {
        if let Err(e) = filter_handle.reload(log_filter(true)) {
            warn!("Failed to enable debug logging: {}", e);
        }
    }

    info!(
        "melodia-api {} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Database: {}", settings.database_url_for_log());
    let pool = db::init_database(&settings.database_url)
        .await
        .context("Failed to initialize database")?;

    if settings.secret_key.is_none() {
        warn!("SECRET_KEY not set; using the key stored in the database");
        let secret = db::settings::load_or_init_secret_key(&pool)
            .await
            .context("Failed to load token secret")?;
        settings.secret_key = Some(secret);
    }

    let bind = format!("{}:{}", settings.host, settings.port);
    let prefix = settings.api_prefix.clone();

    let state = AppState::new(pool.clone(), settings).context("Failed to build application state")?;
    let app = melodia_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    let addr: SocketAddr = listener.local_addr().context("Failed to read bound address")?;
    info!("Listening on http://{}", addr);
    info!("API prefix: {}", prefix);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` when set, otherwise info (or debug) for the Melodia crates
fn log_filter(debug: bool) -> EnvFilter {
    let default_filter = if debug {
        "melodia_api=debug,melodia_common=debug,melodia_import=debug,tower_http=debug"
    } else {
        "melodia_api=info,melodia_common=info,melodia_import=info,tower_http=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_levels() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(log_filter(true).to_string().contains("melodia_api=debug"));
        assert!(log_filter(false).to_string().contains("melodia_api=info"));
    }
}
