//! Configuration loading
//!
//! Every setting is resolved in priority order:
//! 1. Command-line argument (applied by the binary after [`Settings::load`])
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error; a TOML file that exists but does not parse is.

use crate::{Error, Result};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Compiled defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://melodia.db";
pub const DEFAULT_ALGORITHM: &str = "HS256";
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 7;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "*";
pub const DEFAULT_AUDIO_STORAGE_DIR: &str = "audio_storage";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_url: Option<String>,
    pub secret_key: Option<String>,
    pub algorithm: Option<String>,
    pub access_token_expire_minutes: Option<i64>,
    pub refresh_token_expire_days: Option<i64>,
    pub debug: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_prefix: Option<String>,
    pub allowed_origins: Option<String>,
    pub audio_storage_dir: Option<PathBuf>,
    pub bcrypt_cost: Option<u32>,
    pub spotify: SpotifyConfig,
}

/// `[spotify]` table of `config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    /// JWT signing secret. `None` until resolved against the settings table.
    pub secret_key: Option<String>,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    pub allowed_origins: String,
    pub audio_storage_dir: PathBuf,
    pub bcrypt_cost: u32,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            secret_key: None,
            algorithm: DEFAULT_ALGORITHM.to_string(),
            access_token_expire_minutes: DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
            refresh_token_expire_days: DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS,
            debug: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
            audio_storage_dir: PathBuf::from(DEFAULT_AUDIO_STORAGE_DIR),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            spotify_client_id: None,
            spotify_client_secret: None,
        }
    }
}

impl Settings {
    /// Load settings from environment and TOML file
    ///
    /// `config_file` is the `--config` argument; when absent the platform
    /// config locations are searched.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let toml_config = match config_file {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                TomlConfig::from_file(path)?
            }
            None => match find_config_file() {
                Some(path) => {
                    info!("Loading config file: {}", path.display());
                    TomlConfig::from_file(&path)?
                }
                None => TomlConfig::default(),
            },
        };

        Self::resolve(toml_config)
    }

    /// Merge environment variables over a parsed TOML config and the compiled defaults
    pub fn resolve(toml_config: TomlConfig) -> Result<Self> {
        let defaults = Settings::default();

        let settings = Settings {
            database_url: env_string("DATABASE_URL")
                .or(toml_config.database_url)
                .unwrap_or(defaults.database_url),
            secret_key: env_string("SECRET_KEY")
                .or(toml_config.secret_key)
                .filter(|key| !key.trim().is_empty()),
            algorithm: env_string("ALGORITHM")
                .or(toml_config.algorithm)
                .unwrap_or(defaults.algorithm),
            access_token_expire_minutes: env_parsed("ACCESS_TOKEN_EXPIRE_MINUTES")?
                .or(toml_config.access_token_expire_minutes)
                .unwrap_or(defaults.access_token_expire_minutes),
            refresh_token_expire_days: env_parsed("REFRESH_TOKEN_EXPIRE_DAYS")?
                .or(toml_config.refresh_token_expire_days)
                .unwrap_or(defaults.refresh_token_expire_days),
            debug: env_bool("DEBUG")?
                .or(toml_config.debug)
                .unwrap_or(defaults.debug),
            host: env_string("MELODIA_HOST")
                .or(toml_config.host)
                .unwrap_or(defaults.host),
            port: env_parsed("MELODIA_PORT")?
                .or(toml_config.port)
                .unwrap_or(defaults.port),
            api_prefix: env_string("API_V1_STR")
                .or(toml_config.api_prefix)
                .unwrap_or(defaults.api_prefix),
            allowed_origins: env_string("ALLOWED_ORIGINS")
                .or(toml_config.allowed_origins)
                .unwrap_or(defaults.allowed_origins),
            audio_storage_dir: env_string("AUDIO_STORAGE_DIR")
                .map(PathBuf::from)
                .or(toml_config.audio_storage_dir)
                .unwrap_or(defaults.audio_storage_dir),
            bcrypt_cost: env_parsed("BCRYPT_COST")?
                .or(toml_config.bcrypt_cost)
                .unwrap_or(defaults.bcrypt_cost),
            spotify_client_id: env_string("SPOTIFY_CLIENT_ID")
                .or(toml_config.spotify.client_id),
            spotify_client_secret: env_string("SPOTIFY_CLIENT_SECRET")
                .or(toml_config.spotify.client_secret),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would only fail later at request time
    pub fn validate(&self) -> Result<()> {
        self.jwt_algorithm()?;

        if self.access_token_expire_minutes <= 0 {
            return Err(Error::Config(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive".to_string(),
            ));
        }
        if self.refresh_token_expire_days <= 0 {
            return Err(Error::Config(
                "REFRESH_TOKEN_EXPIRE_DAYS must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(Error::Config(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                self.bcrypt_cost
            )));
        }
        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "API prefix must start with '/': {}",
                self.api_prefix
            )));
        }
        Ok(())
    }

    /// JWT algorithm. Only HMAC algorithms are usable with a shared secret.
    pub fn jwt_algorithm(&self) -> Result<Algorithm> {
        let algorithm = Algorithm::from_str(&self.algorithm)
            .map_err(|_| Error::Config(format!("Unknown ALGORITHM: {}", self.algorithm)))?;

        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => Err(Error::Config(format!(
                "ALGORITHM {:?} requires a key pair; use HS256, HS384 or HS512",
                other
            ))),
        }
    }

    /// Allowed CORS origins. `None` means any origin.
    pub fn allowed_origin_list(&self) -> Option<Vec<String>> {
        if self.allowed_origins.trim() == "*" {
            return None;
        }

        Some(
            self.allowed_origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        )
    }

    /// Both catalog credentials are present and non-blank
    pub fn spotify_configured(&self) -> bool {
        let present = |value: &Option<String>| {
            value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
        };
        present(&self.spotify_client_id) && present(&self.spotify_client_secret)
    }

    /// Database URL with any password removed, for log output
    pub fn database_url_for_log(&self) -> String {
        match self.database_url.rsplit_once('@') {
            Some((_, host)) => format!("***@{}", host),
            None => self.database_url.clone(),
        }
    }
}

/// Locate the config file for the platform
///
/// `~/.config/melodia/config.toml` first, then `/etc/melodia/config.toml` on Linux.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("melodia").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/melodia/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, raw))),
        None => Ok(None),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match env_string(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => {
                warn!("{} has an invalid boolean value: {}", name, raw);
                Err(Error::Config(format!("{} has an invalid value: {}", name, raw)))
            }
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.jwt_algorithm().unwrap(), Algorithm::HS256);
        assert_eq!(settings.api_prefix, "/api/v1");
    }

    #[test]
    fn test_asymmetric_algorithm_rejected() {
        let settings = Settings {
            algorithm: "RS256".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.jwt_algorithm(), Err(Error::Config(_))));

        let settings = Settings {
            algorithm: "nope".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_allowed_origin_list() {
        let any = Settings::default();
        assert!(any.allowed_origin_list().is_none());

        let listed = Settings {
            allowed_origins: "http://a.test, http://b.test,".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            listed.allowed_origin_list().unwrap(),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_spotify_configured_requires_both() {
        let mut settings = Settings::default();
        assert!(!settings.spotify_configured());

        settings.spotify_client_id = Some("id".to_string());
        assert!(!settings.spotify_configured());

        settings.spotify_client_secret = Some("  ".to_string());
        assert!(!settings.spotify_configured());

        settings.spotify_client_secret = Some("secret".to_string());
        assert!(settings.spotify_configured());
    }

    #[test]
    fn test_database_url_for_log_hides_credentials() {
        let settings = Settings {
            database_url: "postgres://user:pw@db:5432/music".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.database_url_for_log(), "***@db:5432/music");
    }

    #[test]
    fn test_toml_config_parses_nested_spotify_table() {
        let config: TomlConfig = toml::from_str(
            r#"
            database_url = "sqlite://other.db"
            port = 9000

            [spotify]
            client_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("sqlite://other.db"));
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.spotify.client_id.as_deref(), Some("abc"));
        assert!(config.spotify.client_secret.is_none());
    }
}
