use crate::{
    error::PipelineError,
    spotify::Session,
    types::{ArtistSearchResponse, CatalogRecord},
    utils,
};

/// Resolves an artist name to the best matching artist record.
///
/// Uses `GET /search?type=artist&limit=1`; the returned record is the
/// simplified search variant.
///
/// # Errors
///
/// [`PipelineError::NotFound`] when the search has no match.
pub async fn search_artist(
    session: &Session<'_>,
    artist_name: &str,
) -> Result<CatalogRecord, PipelineError> {
    let url = session.endpoint("search");
    let doc = session
        .fetcher
        .get_json(
            &url,
            session.token,
            &[
                ("q", artist_name.to_string()),
                ("type", "artist".to_string()),
                ("limit", "1".to_string()),
            ],
        )
        .await?;

    let res = serde_json::from_value::<ArtistSearchResponse>(doc).map_err(|e| {
        PipelineError::Malformed {
            url: url.clone(),
            reason: e.to_string(),
        }
    })?;

    res.artists
        .items
        .into_iter()
        .find(|artist| utils::record_id(artist).is_some())
        .ok_or_else(|| PipelineError::NotFound {
            artist_name: artist_name.to_string(),
        })
}

/// Fetches the full artist record via `GET /artists/{id}`.
pub async fn get_artist(
    session: &Session<'_>,
    artist_id: &str,
) -> Result<CatalogRecord, PipelineError> {
    let url = session.endpoint(&format!("artists/{id}", id = artist_id));
    let doc = session.fetcher.get_json(&url, session.token, &[]).await?;

    if utils::record_id(&doc).is_none() {
        return Err(PipelineError::Malformed {
            url,
            reason: "artist record has no id".to_string(),
        });
    }

    Ok(doc)
}
