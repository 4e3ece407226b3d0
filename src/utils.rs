use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;

use crate::types::{IdentifierSet, RecordKind};

/// Splits ids into sequential batches of at most `batch_size` entries.
///
/// A zero batch size is treated as one so every id still lands in a batch.
pub fn partition_batches<T: Clone>(ids: &[T], batch_size: usize) -> Vec<Vec<T>> {
    ids.chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Returns the `id` field of a catalog record, if present.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Collects the ids of the given records into a deduplicated set.
/// Records without an id are ignored.
pub fn collect_ids<'a, I>(records: I) -> IdentifierSet
where
    I: IntoIterator<Item = &'a Value>,
{
    records
        .into_iter()
        .filter_map(record_id)
        .map(str::to_string)
        .collect()
}

/// Drops later records whose id was already seen.
pub fn remove_duplicate_records(records: &mut Vec<Value>) {
    let mut seen_ids = IdentifierSet::new();
    records.retain(|record| match record_id(record) {
        Some(id) => seen_ids.insert(id.to_string()),
        None => true,
    });
}

/// Exponential delay for a 1-based attempt number: `base * 2^(attempt - 1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exp)
}

/// Adds up to 10% random jitter on top of a delay.
pub fn with_jitter(delay: Duration) -> Duration {
    let max_jitter = delay.as_millis() as u64 / 10;
    if max_jitter == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=max_jitter))
}

/// Reads a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Storage key for a record: `{artists|albums|tracks}/{id}.json`.
pub fn storage_key(kind: RecordKind, id: &str) -> String {
    format!("{prefix}/{id}.json", prefix = kind.prefix(), id = id)
}

/// Encodes a document as one line of compact UTF-8 JSON.
pub fn to_compact_json(document: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(document)
}
