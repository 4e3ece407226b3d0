use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;

use crate::{error::PipelineError, spotify::Session, types::Page};

/// Collects every item of a paginated listing endpoint.
///
/// Page one is fetched alone to learn `total` and the effective page size.
/// The remaining offsets are then requested concurrently and their items are
/// appended as pages complete, so the result order may differ from the
/// upstream order. Any failing page aborts the whole gather.
///
/// # Arguments
///
/// * `session` - Catalog session of the current run
/// * `url` - Listing endpoint
/// * `query` - Extra query parameters; `limit` and `offset` are added here
/// * `page_size` - Requested page size
pub async fn gather_all(
    session: &Session<'_>,
    url: &str,
    query: &[(&str, String)],
    page_size: u32,
) -> Result<Vec<Value>, PipelineError> {
    let first = fetch_page(session, url, query, page_size, 0).await?;

    let limit = first
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(page_size.max(1) as u64);
    let total = first.total.unwrap_or(first.items.len() as u64);
    let offsets: Vec<u64> = (limit..total).step_by(limit as usize).collect();

    let mut items = first.items;
    if offsets.is_empty() {
        return Ok(items);
    }

    let mut pages = stream::iter(offsets)
        .map(|offset| fetch_page(session, url, query, limit as u32, offset))
        .buffer_unordered(session.workers.max(1));

    while let Some(page) = pages.try_next().await? {
        items.extend(page.items);
    }

    Ok(items)
}

/// Fetches a single page at `offset`.
pub async fn fetch_page(
    session: &Session<'_>,
    url: &str,
    query: &[(&str, String)],
    limit: u32,
    offset: u64,
) -> Result<Page, PipelineError> {
    let mut params = query.to_vec();
    params.push(("limit", limit.to_string()));
    params.push(("offset", offset.to_string()));

    let doc = session.fetcher.get_json(url, session.token, &params).await?;
    serde_json::from_value::<Page>(doc).map_err(|e| PipelineError::Malformed {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
