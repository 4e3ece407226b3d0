use futures::{StreamExt, TryStreamExt, stream};

use crate::{
    error::PipelineError,
    spotify::{Session, enrich, pagination},
    types::{CatalogRecord, IdentifierSet},
    utils,
};

/// Gathers every simplified album of an artist.
///
/// Uses `GET /artists/{id}/albums` filtered by `include_groups`
/// (for example `album,single`).
pub async fn gather_albums(
    session: &Session<'_>,
    artist_id: &str,
    include_groups: &str,
    page_size: u32,
) -> Result<Vec<CatalogRecord>, PipelineError> {
    let url = session.endpoint(&format!("artists/{id}/albums", id = artist_id));
    pagination::gather_all(
        session,
        &url,
        &[("include_groups", include_groups.to_string())],
        page_size,
    )
    .await
}

/// Fetches the full album records for the given ids via `GET /albums?ids=`.
pub async fn enrich_albums(
    session: &Session<'_>,
    album_ids: &IdentifierSet,
    batch_size: usize,
) -> Result<Vec<CatalogRecord>, PipelineError> {
    enrich::enrich(session, album_ids, batch_size, &session.endpoint("albums"), "albums").await
}

/// Collects the deduplicated track ids of all given albums.
///
/// Each album's track listing (`GET /albums/{id}/tracks`) is gathered on the
/// session's worker pool. Listings longer than one page are followed to the
/// end, so the common album still costs exactly one request.
///
/// # Errors
///
/// A failing album aborts the whole gather.
pub async fn gather_track_ids(
    session: &Session<'_>,
    album_ids: &IdentifierSet,
    page_size: u32,
) -> Result<IdentifierSet, PipelineError> {
    let listings: Vec<Vec<CatalogRecord>> = stream::iter(album_ids.iter().cloned())
        .map(|album_id| {
            let url = session.endpoint(&format!("albums/{id}/tracks", id = album_id));
            async move { pagination::gather_all(session, &url, &[], page_size).await }
        })
        .buffer_unordered(session.workers.max(1))
        .try_collect()
        .await?;

    Ok(utils::collect_ids(listings.iter().flatten()))
}

/// Fetches the full track records for the given ids via `GET /tracks?ids=`.
pub async fn enrich_tracks(
    session: &Session<'_>,
    track_ids: &IdentifierSet,
    batch_size: usize,
) -> Result<Vec<CatalogRecord>, PipelineError> {
    enrich::enrich(session, track_ids, batch_size, &session.endpoint("tracks"), "tracks").await
}
