//! Retrieving source images from URLs or the local filesystem.
//!
//! Locations with an `http` or `https` scheme are downloaded with a blocking
//! `reqwest` client; everything else is read from disk. Only timeouts are
//! retried (see [`crate::retry`]); a refused connection, a bad status code or
//! an unreadable file fails on the first attempt.

use crate::imaging::{DecodeError, SourceImage, decode_bytes};
use crate::retry::{RetryPolicy, Transient, run_with_retry};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("max retries must be 1 or greater")]
    InvalidRetries,
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else {
            FetchError::Http(e.to_string())
        }
    }
}

/// Network settings for remote locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Total attempts for a remote location, including the first.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_interval: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_interval: Duration::from_secs(3),
        }
    }
}

/// Anything that can turn a location string into a decoded image.
///
/// Must be `Sync`: one source is shared by every worker in the pool.
pub trait ImageSource: Sync {
    fn fetch(&self, location: &str, allow_truncated: bool) -> Result<SourceImage, FetchError>;
}

/// Whether `location` should be downloaded rather than read from disk.
pub fn is_remote(location: &str) -> bool {
    reqwest::Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Production [`ImageSource`]: HTTP(S) with retry, filesystem otherwise.
pub struct ImageFetcher {
    client: reqwest::blocking::Client,
    policy: RetryPolicy,
}

impl ImageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let policy = RetryPolicy::new(config.max_retries, config.retry_interval)
            .ok_or(FetchError::InvalidRetries)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, policy })
    }

    /// Download `url`, retrying timeouts per the configured policy.
    pub fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        run_with_retry(&self.policy, std::thread::sleep, |attempt| -> Result<_, FetchError> {
            tracing::debug!("GET {url} (attempt {attempt}/{})", self.policy.max_attempts());
            let response = self.client.get(url).send()?.error_for_status()?;
            Ok(response.bytes()?.to_vec())
        })
    }
}

/// Read a local file. A leading `file://` is accepted and stripped.
pub fn read_local(location: &str) -> Result<Vec<u8>, FetchError> {
    let path = PathBuf::from(location.strip_prefix("file://").unwrap_or(location));
    std::fs::read(&path).map_err(|source| FetchError::Io { path, source })
}

impl ImageSource for ImageFetcher {
    fn fetch(&self, location: &str, allow_truncated: bool) -> Result<SourceImage, FetchError> {
        let bytes = if is_remote(location) {
            self.download(location)?
        } else {
            read_local(location)?
        };
        Ok(decode_bytes(&bytes, allow_truncated)?)
    }
}
