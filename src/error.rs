//! Error types for the export pipeline.
//!
//! Every stage returns [`PipelineError`]. Retries happen only inside the
//! throttled fetcher; once an error leaves a stage the run is over.

use thiserror::Error;

/// Failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The client-credentials exchange failed.
    #[error("credential exchange failed: {0}")]
    Auth(String),

    /// The catalog answered with a non-429 error status.
    #[error("upstream returned HTTP {status} for {url}: {body}")]
    UpstreamHttp {
        url: String,
        status: u16,
        body: String,
    },

    /// Rate-limit or network retries ran out.
    #[error("gave up on {url} after {attempts} attempts")]
    FetchExhausted { url: String, attempts: u32 },

    /// The artist search returned no match.
    #[error("artist '{artist_name}' not found")]
    NotFound { artist_name: String },

    #[error("failed to write object '{key}': {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The upstream body did not have the structure the stage reads.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("upstream permit pool closed")]
    PermitPool(#[from] tokio::sync::AcquireError),
}

impl PipelineError {
    /// HTTP status the trigger endpoint answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            PipelineError::NotFound { .. } => 404,
            _ => 500,
        }
    }

    /// Short, stable description used as the `error` field of responses.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineError::Auth(_) => "Failed to authenticate with Spotify API",
            PipelineError::UpstreamHttp { .. } => "Error communicating with Spotify API",
            PipelineError::FetchExhausted { .. } => "Spotify API retries exhausted",
            PipelineError::NotFound { .. } => "Artist not found",
            PipelineError::StorageWrite { .. } => "Failed to write to object storage",
            PipelineError::Malformed { .. } => "Unexpected response from Spotify API",
            PipelineError::PermitPool(_) => "An unexpected server error occurred",
        }
    }
}

/// Failure of a single object-storage operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage credentials unavailable: {0}")]
    Credentials(String),
}

/// Invalid or missing configuration detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}
