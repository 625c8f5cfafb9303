//! Service configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upstream document-AI endpoint used when `DOCEXTRACT_UPSTREAM_URL` is unset.
pub const DEFAULT_UPSTREAM_URL: &str = "https://docai.example.com/api/v1/extract";

const DEFAULT_PORT: u16 = 3003;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;
const DEFAULT_MAX_UPLOAD_MB: usize = 50;
const DEFAULT_BATCH_TTL_SECS: u64 = 3600;

/// Top-level docextract configuration.
///
/// Holds no credentials: the API key arrives with each request and is never
/// read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocExtractConfig {
    /// HTTP server port.
    pub port: u16,
    /// Fixed upstream extraction endpoint.
    pub upstream_url: String,
    /// Whole-request deadline for each upstream call.
    pub upstream_timeout: Duration,
    /// How often batch progress is sampled for logging.
    pub progress_interval: Duration,
    /// Request body limit for uploads, in bytes.
    pub max_upload_bytes: usize,
    /// How long a fully settled batch is kept before it is evicted.
    pub batch_ttl: Duration,
}

impl Default for DocExtractConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            batch_ttl: Duration::from_secs(DEFAULT_BATCH_TTL_SECS),
        }
    }
}

impl DocExtractConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_var::<u16, _>(&lookup, "PORT")?.unwrap_or(defaults.port);

        let upstream_url = match lookup("DOCEXTRACT_UPSTREAM_URL") {
            Some(url) if url.trim().is_empty() => {
                return Err(Error::Config("DOCEXTRACT_UPSTREAM_URL is empty".into()))
            }
            Some(url) => url.trim().to_string(),
            None => defaults.upstream_url,
        };
        if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "DOCEXTRACT_UPSTREAM_URL must be an http(s) URL, got {}",
                upstream_url
            )));
        }

        let upstream_timeout = parse_var::<u64, _>(&lookup, "DOCEXTRACT_UPSTREAM_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.upstream_timeout);

        let progress_interval = parse_var::<u64, _>(&lookup, "DOCEXTRACT_PROGRESS_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.progress_interval);

        let max_upload_bytes = match parse_var::<usize, _>(&lookup, "DOCEXTRACT_MAX_UPLOAD_MB")? {
            Some(mb) => mb.checked_mul(1024 * 1024).ok_or_else(|| {
                Error::Config(format!("DOCEXTRACT_MAX_UPLOAD_MB is too large: {}", mb))
            })?,
            None => defaults.max_upload_bytes,
        };

        let batch_ttl = parse_var::<u64, _>(&lookup, "DOCEXTRACT_BATCH_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.batch_ttl);

        Ok(Self {
            port,
            upstream_url,
            upstream_timeout,
            progress_interval,
            max_upload_bytes,
            batch_ttl,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has invalid value {:?}", key, raw))),
    }
}
