//! Configuration management for the discography exporter.
//!
//! Values come from the process environment, optionally seeded from `.env`
//! files. [`Settings::from_env`] reads and validates everything once at
//! startup so the service fails fast instead of on the first request.
//!
//! Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the working directory
//! 3. `.env` in the local data directory (`discostore/.env`)
//! 4. Application defaults (where applicable)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    error::ConfigError, pipeline::PipelineSettings, spotify::fetcher::RetryPolicy,
};

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_GCS_API_URL: &str = "https://storage.googleapis.com";
pub const DEFAULT_GCS_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";

/// Loads environment variables from `.env` files.
///
/// Neither file is required: a deployed service usually receives its
/// configuration from the environment directly. Variables that are already
/// set are never overwritten.
pub async fn load_env() {
    let _ = dotenv::dotenv();

    let path = data_dir().join(".env");
    if async_fs::metadata(&path).await.is_ok() {
        let _ = dotenv::from_path(&path);
    }
}

/// Platform-specific local data directory for this application.
///
/// - Linux: `~/.local/share/discostore`
/// - macOS: `~/Library/Application Support/discostore`
/// - Windows: `%LOCALAPPDATA%/discostore`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("discostore");
    path
}

/// Credentials and endpoints of the Spotify Web API.
#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: String,
    pub token_url: String,
    pub http_timeout: Duration,
}

/// Where records are written.
#[derive(Debug, Clone)]
pub enum StorageSettings {
    Gcs {
        bucket: String,
        api_url: String,
        access_token: Option<String>,
        metadata_url: String,
    },
    Local {
        root: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub spotify: SpotifySettings,
    pub storage: StorageSettings,
    pub pipeline: PipelineSettings,
    pub server_addr: String,
}

impl Settings {
    /// Reads and validates the complete configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required variable is absent or
    /// empty, and [`ConfigError::Invalid`] when a numeric value cannot be
    /// parsed or is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let spotify = SpotifySettings {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            api_url: optional("SPOTIFY_API_URL")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string()),
            token_url: optional("SPOTIFY_API_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_TOKEN_URL.to_string()),
            http_timeout: Duration::from_secs(positive("HTTP_TIMEOUT_SECS", 30)?),
        };

        let storage = match optional("STORAGE_BACKEND").as_deref() {
            None | Some("gcs") => StorageSettings::Gcs {
                bucket: required("GCS_BUCKET_NAME")?,
                api_url: optional("GCS_API_URL").unwrap_or_else(|| DEFAULT_GCS_API_URL.to_string()),
                access_token: optional("GCS_ACCESS_TOKEN"),
                metadata_url: optional("GCS_METADATA_TOKEN_URL")
                    .unwrap_or_else(|| DEFAULT_GCS_METADATA_TOKEN_URL.to_string()),
            },
            Some("local") => StorageSettings::Local {
                root: optional("LOCAL_STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir().join("objects")),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            max_workers: positive("MAX_WORKERS", defaults.max_workers)?,
            max_concurrent_requests: positive(
                "MAX_CONCURRENT_REQUESTS",
                defaults.max_concurrent_requests,
            )?,
            page_size: positive("API_PAGE_SIZE", defaults.page_size)?,
            album_batch_size: positive("ALBUM_BATCH_SIZE", defaults.album_batch_size)?,
            track_batch_size: positive("TRACK_BATCH_SIZE", defaults.track_batch_size)?,
            include_groups: optional("ALBUM_INCLUDE_GROUPS").unwrap_or(defaults.include_groups),
            retry: RetryPolicy {
                max_retries: positive("MAX_RETRIES", defaults.retry.max_retries)?,
                base_delay: Duration::from_millis(positive(
                    "RETRY_BASE_DELAY_MS",
                    defaults.retry.base_delay.as_millis() as u64,
                )?),
                max_retry_after: Duration::from_secs(positive(
                    "MAX_RETRY_AFTER_SECS",
                    defaults.retry.max_retry_after.as_secs(),
                )?),
            },
        };

        Ok(Self {
            spotify,
            storage,
            pipeline,
            server_addr: optional("SERVER_ADDRESS")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
        })
    }
}

fn optional(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::Missing(var))
}

/// Parses a strictly positive number, falling back to `default` when unset.
fn positive<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = optional(var) else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}
