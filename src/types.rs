use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// A catalog document (artist, album or track) kept exactly as the API sent it.
pub type CatalogRecord = Value;

/// Deduplicated ids driving batch enrichment. Ordered so batch membership is
/// reproducible for a given input.
pub type IdentifierSet = BTreeSet<String>;

/// Seconds subtracted from a declared token lifetime.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// A bearer credential with its effective expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Builds a credential from a declared lifetime, applying the safety margin.
    ///
    /// Returns `None` when the lifetime does not fit into a timestamp.
    pub fn issued(token: String, expires_in: u64, now: DateTime<Utc>) -> Option<Self> {
        let lifetime = i64::try_from(expires_in)
            .ok()?
            .checked_sub(TOKEN_EXPIRY_MARGIN_SECS)?;
        let expires_at = now.checked_add_signed(Duration::try_seconds(lifetime)?)?;

        Some(Self { token, expires_at })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Body of an OAuth2 token response (Spotify accounts or GCE metadata server).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
}

/// One page of a Spotify paging object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistSearchResponse {
    pub artists: Page,
}

/// Kind of record persisted, which also decides its storage prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Artist,
    Album,
    Track,
}

impl RecordKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordKind::Artist => "artists",
            RecordKind::Album => "albums",
            RecordKind::Track => "tracks",
        }
    }
}

/// Summary of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub artist_name: String,
    pub artist_id: String,
    pub albums_stored: usize,
    pub tracks_stored: usize,
    pub elapsed_seconds: f64,
}

/// Success payload of the trigger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse {
    pub message: String,
    pub artist_name: String,
    pub artist_id: String,
    pub albums_stored: usize,
    pub tracks_stored: usize,
    pub processing_time_seconds: f64,
}

impl From<PipelineResult> for StoreResponse {
    fn from(result: PipelineResult) -> Self {
        Self {
            message: "Successfully processed and stored artist data.".to_string(),
            artist_name: result.artist_name,
            artist_id: result.artist_id,
            albums_stored: result.albums_stored,
            tracks_stored: result.tracks_stored,
            processing_time_seconds: result.elapsed_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

#[derive(Tabled)]
pub struct SummaryTableRow {
    pub artist: String,
    pub id: String,
    pub albums: usize,
    pub tracks: usize,
    pub seconds: String,
}
