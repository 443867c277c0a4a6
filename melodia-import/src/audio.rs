//! Preview audio storage
//!
//! Clips are stored flat in one directory, named by the SHA-256 of their
//! source URL, so the same preview is only downloaded once.

use crate::{ImportError, ImportResult};
use reqwest::{header, Client};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// True for URLs that point at a downloadable clip rather than a catalog page
pub fn is_preview_url(url: &str) -> bool {
    !url.is_empty() && (url.contains("preview") || url.contains("p.scdn.co") || url.ends_with(".mp3"))
}

/// `<sha256 hex of url>.mp3`
pub fn file_name_for(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{:x}.mp3", digest)
}

#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
    http: Client,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> ImportResult<Self> {
        let http = Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
        Ok(Self::with_client(dir, http))
    }

    pub fn with_client(dir: impl Into<PathBuf>, http: Client) -> Self {
        Self { dir: dir.into(), http }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the clip for `url` lives (whether or not it was downloaded)
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(file_name_for(url))
    }

    /// Download a preview clip, reusing an earlier download of the same URL
    ///
    /// Non-preview URLs are refused with [`ImportError::Download`]. A failed
    /// download leaves no partial file behind.
    pub async fn download(&self, url: &str) -> ImportResult<PathBuf> {
        if !is_preview_url(url) {
            return Err(ImportError::Download(format!("Not a preview URL: {}", url)));
        }

        let path = self.path_for(url);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Audio file already exists: {}", path.display());
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let partial = path.with_extension("part");
        match self.fetch_to(url, &partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, &path).await?;
                info!("Downloaded audio file: {} ({} bytes)", path.display(), bytes);
                Ok(path)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove partial download {}: {}", partial.display(), remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch_to(&self, url: &str, target: &Path) -> ImportResult<usize> {
        info!("Downloading audio from: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ImportError::Download(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Download(format!("{} returned {}", url, status)));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("audio/") {
            // Kept anyway; some CDNs mislabel clips
            warn!("Unexpected content type '{}' for {}", content_type, url);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImportError::Download(format!("{}: {}", url, e)))?;

        tokio::fs::write(target, &bytes).await?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_preview_url() {
        assert!(is_preview_url("https://p.scdn.co/mp3-preview/abc"));
        assert!(is_preview_url("http://cdn.test/preview/1"));
        assert!(is_preview_url("http://cdn.test/clip.mp3"));
        assert!(!is_preview_url("https://open.spotify.com/track/1"));
        assert!(!is_preview_url(""));
    }

    #[test]
    fn test_file_name_is_stable_sha256() {
        let name = file_name_for("http://x");
        assert_eq!(name, file_name_for("http://x"));
        assert_ne!(name, file_name_for("http://y"));
        assert!(name.ends_with(".mp3"));
        // 64 hex chars + ".mp3"
        assert_eq!(name.len(), 68);
    }

    #[tokio::test]
    async fn test_existing_file_is_reused_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path()).unwrap();

        // Unroutable host: any network attempt would fail
        let url = "http://127.0.0.1:9/preview.mp3";
        std::fs::write(store.path_for(url), b"cached").unwrap();

        let path = store.download(url).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_non_preview_url_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path()).unwrap();

        let result = store.download("https://open.spotify.com/track/1").await;
        assert!(matches!(result, Err(ImportError::Download(_))));
    }
}
