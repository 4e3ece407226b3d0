//! The staged export pipeline.
//!
//! A run walks a fixed sequence of stages and stops at the first error:
//!
//! ```text
//! Init → TokenAcquired → ArtistResolved → ArtistDetailFetched → AlbumsGathered
//!      → AlbumsEnriched → TrackIdsGathered → TracksEnriched → Uploaded → Done
//! ```
//!
//! Concurrency only happens inside a stage. Each stage's collection is
//! complete before the next stage starts, and nothing is written to storage
//! until every record has been enriched.

use std::{fmt, sync::Arc, time::Instant};

use reqwest::Client;

use crate::{
    config::SpotifySettings,
    error::PipelineError,
    info,
    management::TokenCache,
    spotify::{
        Session, artists,
        fetcher::{RetryPolicy, ThrottledFetcher},
        releases,
    },
    storage::{self, ObjectStore},
    success,
    types::{CatalogRecord, PipelineResult, RecordKind},
    utils, warning,
};

/// Tunables of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Worker-pool width for page, batch and upload fan-out within a stage.
    pub max_workers: usize,
    /// Global ceiling of in-flight Spotify requests.
    pub max_concurrent_requests: usize,
    pub page_size: u32,
    pub album_batch_size: usize,
    pub track_batch_size: usize,
    pub include_groups: String,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_workers: 30,
            max_concurrent_requests: 10,
            page_size: 50,
            album_batch_size: 20,
            track_batch_size: 50,
            include_groups: "album,single".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    TokenAcquired,
    ArtistResolved,
    ArtistDetailFetched,
    AlbumsGathered,
    AlbumsEnriched,
    TrackIdsGathered,
    TracksEnriched,
    Uploaded,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Exports an artist's discography from Spotify into object storage.
///
/// A `Pipeline` is built once and shared by all requests: the credential
/// cache and the upstream permit pool are process wide, everything else is
/// scoped to a single [`Pipeline::run`].
pub struct Pipeline {
    tokens: TokenCache,
    fetcher: ThrottledFetcher,
    store: Arc<dyn ObjectStore>,
    api_url: String,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        spotify: &SpotifySettings,
        settings: PipelineSettings,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(spotify.http_timeout).build()?;

        Ok(Self {
            tokens: TokenCache::new(
                client.clone(),
                spotify.token_url.clone(),
                spotify.client_id.clone(),
                spotify.client_secret.clone(),
            ),
            fetcher: ThrottledFetcher::new(
                client,
                settings.max_concurrent_requests,
                settings.retry.clone(),
            ),
            store,
            api_url: spotify.api_url.clone(),
            settings,
        })
    }

    /// Runs every stage for `artist_name` and returns the run summary.
    ///
    /// # Errors
    ///
    /// The error of the first failing stage. Later stages are not attempted
    /// and, unless the upload stage itself failed, nothing has been written.
    pub async fn run(&self, artist_name: &str) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        let mut stage = Stage::Init;

        match self.run_stages(artist_name, &mut stage, started).await {
            Ok(result) => {
                success!(
                    "Stored artist '{}' ({}): {} albums, {} tracks in {:.2}s",
                    result.artist_name,
                    result.artist_id,
                    result.albums_stored,
                    result.tracks_stored,
                    result.elapsed_seconds
                );
                Ok(result)
            }
            Err(e) => {
                warning!(
                    "Export of '{}' aborted after stage {}: {}",
                    artist_name,
                    stage,
                    e
                );
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        artist_name: &str,
        stage: &mut Stage,
        started: Instant,
    ) -> Result<PipelineResult, PipelineError> {
        let credential = self.tokens.get_token().await?;
        *stage = Stage::TokenAcquired;

        let session = Session {
            fetcher: &self.fetcher,
            api_url: &self.api_url,
            token: &credential.token,
            workers: self.settings.max_workers,
        };

        let found = artists::search_artist(&session, artist_name).await?;
        let artist_id = utils::record_id(&found).unwrap_or_default().to_string();
        *stage = Stage::ArtistResolved;
        info!("Resolved '{}' to artist {}", artist_name, artist_id);

        let artist = artists::get_artist(&session, &artist_id).await?;
        *stage = Stage::ArtistDetailFetched;

        let albums = releases::gather_albums(
            &session,
            &artist_id,
            &self.settings.include_groups,
            self.settings.page_size,
        )
        .await?;
        let album_ids = utils::collect_ids(&albums);
        *stage = Stage::AlbumsGathered;
        info!(
            "Gathered {} album listings ({} unique) for artist {}",
            albums.len(),
            album_ids.len(),
            artist_id
        );

        let mut albums =
            releases::enrich_albums(&session, &album_ids, self.settings.album_batch_size).await?;
        utils::remove_duplicate_records(&mut albums);
        *stage = Stage::AlbumsEnriched;
        info!("Enriched {} albums", albums.len());

        let track_ids =
            releases::gather_track_ids(&session, &album_ids, self.settings.page_size).await?;
        *stage = Stage::TrackIdsGathered;
        info!("Gathered {} unique track ids", track_ids.len());

        let mut tracks =
            releases::enrich_tracks(&session, &track_ids, self.settings.track_batch_size).await?;
        utils::remove_duplicate_records(&mut tracks);
        *stage = Stage::TracksEnriched;
        info!("Enriched {} tracks", tracks.len());

        let artist_name = artist
            .get("name")
            .and_then(|name| name.as_str())
            .unwrap_or(artist_name)
            .to_string();
        let albums_stored = albums.len();
        let tracks_stored = tracks.len();

        let mut records = Vec::with_capacity(1 + albums_stored + tracks_stored);
        records.push(keyed(RecordKind::Artist, artist)?);
        for album in albums {
            records.push(keyed(RecordKind::Album, album)?);
        }
        for track in tracks {
            records.push(keyed(RecordKind::Track, track)?);
        }

        let written =
            storage::upload_all(self.store.as_ref(), records, self.settings.max_workers).await?;
        *stage = Stage::Uploaded;
        info!("Wrote {} objects to {}", written, self.store.describe());

        *stage = Stage::Done;
        Ok(PipelineResult {
            artist_name,
            artist_id,
            albums_stored,
            tracks_stored,
            elapsed_seconds: (started.elapsed().as_secs_f64() * 100.0).round() / 100.0,
        })
    }
}

fn keyed(kind: RecordKind, record: CatalogRecord) -> Result<(String, CatalogRecord), PipelineError> {
    let key = utils::record_id(&record).map(|id| utils::storage_key(kind, id));
    match key {
        Some(key) => Ok((key, record)),
        None => Err(PipelineError::Malformed {
            url: kind.prefix().to_string(),
            reason: "record has no id".to_string(),
        }),
    }
}
