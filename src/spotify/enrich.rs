use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;

use crate::{
    error::PipelineError,
    spotify::Session,
    types::{CatalogRecord, IdentifierSet},
    utils,
};

/// Fetches full records for a set of ids through a batch-get endpoint.
///
/// Ids are sliced sequentially into batches of at most `batch_size`, one
/// request per batch carries them as a comma-joined `ids` parameter, and the
/// batches run concurrently on the session's worker pool. The arrays found
/// under `field` (for example `albums` for `GET /albums`) are merged into
/// one flat collection.
///
/// `null` entries, which Spotify returns for ids it cannot resolve, are
/// skipped.
///
/// # Errors
///
/// The first failing batch aborts the enrichment and nothing is returned, so
/// callers never persist a partially enriched set.
pub async fn enrich(
    session: &Session<'_>,
    ids: &IdentifierSet,
    batch_size: usize,
    url: &str,
    field: &str,
) -> Result<Vec<CatalogRecord>, PipelineError> {
    let ids: Vec<String> = ids.iter().cloned().collect();
    let batches = utils::partition_batches(&ids, batch_size);

    let results: Vec<Vec<CatalogRecord>> = stream::iter(batches)
        .map(|batch| fetch_batch(session, url, field, batch))
        .buffer_unordered(session.workers.max(1))
        .try_collect()
        .await?;

    Ok(results.into_iter().flatten().collect())
}

async fn fetch_batch(
    session: &Session<'_>,
    url: &str,
    field: &str,
    batch: Vec<String>,
) -> Result<Vec<CatalogRecord>, PipelineError> {
    let mut doc = session
        .fetcher
        .get_json(url, session.token, &[("ids", batch.join(","))])
        .await?;

    match doc.get_mut(field).map(Value::take) {
        Some(Value::Array(records)) => Ok(records
            .into_iter()
            .filter(|record| !record.is_null())
            .collect()),
        _ => Err(PipelineError::Malformed {
            url: url.to_string(),
            reason: format!("missing '{}' array", field),
        }),
    }
}
