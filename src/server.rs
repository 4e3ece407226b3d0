use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Extension, Router, routing::get};

use crate::{Res, api, info, pipeline::Pipeline};

/// Builds the service router around a shared pipeline.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route("/artist/{artist_name}/store", get(api::store_artist))
        .layer(Extension(pipeline))
}

/// Binds `addr` and serves the router until the process ends.
pub async fn start_api_server(addr: &str, pipeline: Arc<Pipeline>) -> Res<()> {
    let addr = SocketAddr::from_str(addr)?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}
