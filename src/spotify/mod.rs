//! # Spotify Integration Module
//!
//! Read-only access to the Spotify Web API for the export pipeline. Every
//! request goes through [`fetcher::ThrottledFetcher`], which is the one place
//! that enforces the global concurrency ceiling and the retry policy.
//!
//! ```text
//! Pipeline stages
//!     ├── artists    (search, artist detail)
//!     ├── releases   (albums, album tracks, tracks)
//!     │      ├── pagination (paging objects, page 2+ fetched concurrently)
//!     │      └── enrich     (batch-get by comma-joined ids)
//!          ↓
//! ThrottledFetcher (permit pool, 429/network retries)
//!          ↓
//! Spotify Web API
//! ```
//!
//! Authentication uses the client-credentials grant ([`auth`]); the cached
//! credential lives in [`crate::management::TokenCache`].

pub mod artists;
pub mod auth;
pub mod enrich;
pub mod fetcher;
pub mod pagination;
pub mod releases;

use fetcher::ThrottledFetcher;

/// Everything a stage needs to talk to the catalog during one run.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub fetcher: &'a ThrottledFetcher,
    pub api_url: &'a str,
    pub token: &'a str,
    /// Width of the worker pool used for fan-out inside a stage.
    pub workers: usize,
}

impl<'a> Session<'a> {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{uri}/{path}",
            uri = self.api_url.trim_end_matches('/'),
            path = path.trim_start_matches('/')
        )
    }
}
