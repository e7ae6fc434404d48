//! Verified, cached downloads.
//!
//! [`Fetcher`] maps a URL to a file in the data directory, reuses that file
//! when its checksum already matches and otherwise streams a fresh copy
//! through a [`Transport`]. A file is only handed out after it has passed
//! verification.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use super::error::FetchError;
use super::integrity;
use super::types::{Checksum, ChecksumSource, HashAlgorithm};

const USER_AGENT: &str = concat!("toolchest/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// URL Validation
// ============================================================================

/// Parses a download URL, requiring HTTPS and a host.
pub fn validate_url(url_str: &str) -> Result<Url, FetchError> {
    let url = Url::parse(url_str).map_err(|e| FetchError::InvalidUrl {
        url: url_str.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "https" {
        return Err(FetchError::InsecureUrl(url_str.to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::InvalidUrl {
            url: url_str.to_string(),
            reason: "URL must have a host".to_string(),
        });
    }

    Ok(url)
}

/// Local file name for a download: the last non-empty path segment.
pub fn file_name_for(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

// ============================================================================
// Transport
// ============================================================================

/// Byte transport behind [`Fetcher`].
///
/// Implementations write the complete response body for `url` to `dest`,
/// replacing any existing file, and return the number of bytes written.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn download(&self, url: &Url, dest: &Path) -> Result<u64>;
}

/// HTTPS transport streaming response bodies to disk.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .https_only(true)
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn download(&self, url: &Url, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to start download from {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "Download failed with status {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            );
        }

        let total_bytes = response.content_length();
        debug!("Content-Length: {:?}", total_bytes);

        let mut file = File::create(dest)
            .await
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;

        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;
        let mut last_logged_percent = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.context("Failed to read chunk from response stream")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write chunk to file")?;
            bytes_downloaded += chunk.len() as u64;

            if let Some(total) = total_bytes.filter(|total| *total > 0) {
                let percent = bytes_downloaded * 100 / total;
                if percent >= last_logged_percent + 10 {
                    last_logged_percent = percent - percent % 10;
                    debug!("{}: {}% ({} bytes)", url, percent, bytes_downloaded);
                }
            }
        }

        file.flush().await.context("Failed to flush file")?;
        Ok(bytes_downloaded)
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// Download cache keyed by URL file name inside the data directory.
#[derive(Clone)]
pub struct Fetcher {
    data_dir: PathBuf,
    transport: Arc<dyn Transport>,
}

impl Fetcher {
    pub fn new(data_dir: impl Into<PathBuf>, transport: Arc<dyn Transport>) -> Self {
        Self {
            data_dir: data_dir.into(),
            transport,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Where a download of `url` is stored.
    pub fn local_path(&self, url: &str) -> Result<PathBuf, FetchError> {
        let parsed = validate_url(url)?;
        let name = file_name_for(&parsed).ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no file name".to_string(),
        })?;
        Ok(self.data_dir.join(name))
    }

    /// Returns the path of a verified local copy of `url`.
    ///
    /// A cached file with a matching checksum is returned without any network
    /// access. A cached file that does not match is replaced. A fresh download
    /// that does not match is deleted and reported as
    /// [`FetchError::Integrity`].
    pub async fn fetch(&self, url: &str, checksum: &Checksum) -> Result<PathBuf, FetchError> {
        let parsed = validate_url(url)?;
        let local_path = self.local_path(url)?;

        if tokio::fs::try_exists(&local_path).await.unwrap_or(false) {
            if verify_in_background(&local_path, checksum).await? {
                debug!("Using cached {}", local_path.display());
                return Ok(local_path);
            }
            warn!(
                "Cached {} does not match {}, downloading again",
                local_path.display(),
                checksum
            );
        }

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| FetchError::Io {
                path: self.data_dir.clone(),
                source,
            })?;

        // Stage under a sibling name so a partial body never sits at the
        // cache path.
        let staging = staging_path(&local_path);
        info!("Downloading {} to {}", url, local_path.display());
        let bytes = match self.transport.download(&parsed, &staging).await {
            Ok(bytes) => bytes,
            Err(source) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    source,
                });
            }
        };

        let actual = hash_in_background(&staging, checksum).await?;
        if !checksum.matches(&actual) {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(FetchError::Integrity {
                path: local_path,
                expected: checksum.hex.to_string(),
                actual,
            });
        }

        tokio::fs::rename(&staging, &local_path)
            .await
            .map_err(|source| FetchError::Io {
                path: local_path.clone(),
                source,
            })?;

        info!(
            "Download complete: {} bytes written to {}",
            bytes,
            local_path.display()
        );
        Ok(local_path)
    }

    /// Returns the path of a local copy of `url` verified against `source`.
    ///
    /// A download that fails a published digest also drops the stored digest,
    /// so the next attempt asks upstream again.
    pub async fn fetch_source(
        &self,
        url: &str,
        source: &ChecksumSource,
    ) -> Result<PathBuf, FetchError> {
        let checksum = self.resolve_checksum(source).await?;
        let result = self.fetch(url, &checksum).await;
        if let (
            Err(FetchError::Integrity { .. }),
            ChecksumSource::Published {
                url: digest_url, ..
            },
        ) = (&result, source)
        {
            if let Ok(path) = self.local_path(digest_url) {
                let _ = tokio::fs::remove_file(path).await;
            }
        }
        result
    }

    /// Turns a registry checksum source into a concrete digest.
    ///
    /// Published digests are fetched over the same validated transport as
    /// the asset and stored next to it; a stored digest is reused without
    /// network access.
    pub async fn resolve_checksum(&self, source: &ChecksumSource) -> Result<Checksum, FetchError> {
        match source {
            ChecksumSource::Pinned(checksum) => Ok(checksum.clone()),
            ChecksumSource::Published { algorithm, url } => {
                self.published_checksum(url, *algorithm).await
            }
        }
    }

    async fn published_checksum(
        &self,
        url: &str,
        algorithm: HashAlgorithm,
    ) -> Result<Checksum, FetchError> {
        let parsed = validate_url(url)?;
        let local_path = self.local_path(url)?;

        if let Ok(text) = tokio::fs::read_to_string(&local_path).await {
            if let Some(checksum) = parse_digest(&text, algorithm) {
                debug!("Using stored digest {}", local_path.display());
                return Ok(checksum);
            }
            warn!("Ignoring unreadable digest {}", local_path.display());
        }

        let staging = staging_path(&local_path);
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| FetchError::Io {
                path: self.data_dir.clone(),
                source,
            })?;

        debug!("Fetching digest {}", url);
        let downloaded = self.transport.download(&parsed, &staging).await;
        let text = match downloaded {
            Ok(_) => tokio::fs::read_to_string(&staging).await,
            Err(source) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    source,
                });
            }
        };
        let checksum = text
            .ok()
            .and_then(|text| parse_digest(&text, algorithm));
        let Some(checksum) = checksum else {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(FetchError::InvalidDigest {
                url: url.to_string(),
                reason: "expected a 64 character hex digest".to_string(),
            });
        };

        tokio::fs::rename(&staging, &local_path)
            .await
            .map_err(|source| FetchError::Io {
                path: local_path.clone(),
                source,
            })?;
        Ok(checksum)
    }
}

/// Reads the leading hex digest of a `sha256sum`-style line.
fn parse_digest(text: &str, algorithm: HashAlgorithm) -> Option<Checksum> {
    let hex = text.split_whitespace().next()?;
    if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(Checksum::new(algorithm, hex.to_ascii_lowercase()))
    } else {
        None
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

async fn verify_in_background(path: &Path, checksum: &Checksum) -> Result<bool, FetchError> {
    let owned = path.to_path_buf();
    let expected = checksum.clone();
    tokio::task::spawn_blocking(move || integrity::verify(&owned, &expected))
        .await
        .map_err(std::io::Error::other)
        .and_then(|result| result)
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn hash_in_background(path: &Path, checksum: &Checksum) -> Result<String, FetchError> {
    let owned = path.to_path_buf();
    let algorithm = checksum.algorithm;
    tokio::task::spawn_blocking(move || integrity::hash_file(&owned, algorithm))
        .await
        .map_err(std::io::Error::other)
        .and_then(|result| result)
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })
}
