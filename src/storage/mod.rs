//! # Object Storage
//!
//! Records are written as one compact JSON document per object under
//! `{artists|albums|tracks}/{id}.json`. Writes overwrite by key, so repeating
//! a run repairs whatever a failed run left behind.
//!
//! Backends:
//! - [`GcsStore`] - Google Cloud Storage through its JSON API
//! - [`LocalStore`] - a directory on the local file system

mod gcs;
mod local;

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};

use crate::{
    config::StorageSettings,
    error::{PipelineError, StorageError},
    info, utils,
};

pub use gcs::GcsStore;
pub use local::LocalStore;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Write-only blob storage addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Human readable location, used in log lines.
    fn describe(&self) -> String;
}

/// Opens the configured backend and checks that it is usable.
///
/// # Errors
///
/// Fails when the bucket cannot be reached or the directory cannot be
/// created, so the service never starts against broken storage.
pub async fn connect(settings: &StorageSettings) -> Result<Arc<dyn ObjectStore>, StorageError> {
    let store: Arc<dyn ObjectStore> = match settings {
        StorageSettings::Gcs {
            bucket,
            api_url,
            access_token,
            metadata_url,
        } => Arc::new(
            GcsStore::connect(
                bucket.clone(),
                api_url.clone(),
                access_token.clone(),
                metadata_url.clone(),
            )
            .await?,
        ),
        StorageSettings::Local { root } => Arc::new(LocalStore::open(root.clone()).await?),
    };

    info!("Object storage ready at {}", store.describe());
    Ok(store)
}

/// Writes every `(key, document)` pair concurrently as single-line JSON.
///
/// At most `workers` writes run at once. The first failure is returned as
/// [`PipelineError::StorageWrite`]; writes that already completed stay in
/// place.
pub async fn upload_all(
    store: &dyn ObjectStore,
    records: Vec<(String, serde_json::Value)>,
    workers: usize,
) -> Result<usize, PipelineError> {
    let count = records.len();

    stream::iter(records)
        .map(Ok::<_, PipelineError>)
        .try_for_each_concurrent(workers.max(1), |(key, document)| async move {
            let body = utils::to_compact_json(&document).map_err(|e| PipelineError::StorageWrite {
                key: key.clone(),
                source: StorageError::Serialize(e),
            })?;

            store
                .put(&key, body, JSON_CONTENT_TYPE)
                .await
                .map_err(|source| PipelineError::StorageWrite { key, source })
        })
        .await?;

    Ok(count)
}
