use std::sync::Arc;

use axum::{
    Extension,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::{
    info,
    pipeline::Pipeline,
    types::{ErrorResponse, StoreResponse},
};

/// Runs the export pipeline for the artist named in the path.
///
/// Answers `200` with the run summary, `404` when the artist search has no
/// match and `500` for every other failure.
pub async fn store_artist(
    Path(artist_name): Path<String>,
    Extension(pipeline): Extension<Arc<Pipeline>>,
) -> Response {
    info!("Export requested for artist '{}'", artist_name);

    match pipeline.run(&artist_name).await {
        Ok(result) => (StatusCode::OK, Json(StoreResponse::from(result))).into_response(),
        Err(e) => {
            let status = StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = ErrorResponse {
                error: e.label().to_string(),
                details: e.to_string(),
            };
            (status, Json(body)).into_response()
        }
    }
}
