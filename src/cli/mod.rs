//! # CLI Module
//!
//! Command implementations behind the `discostore` binary. Both commands
//! read the full configuration and open object storage first, so a broken
//! setup is reported before any request is accepted.
//!
//! - [`serve`] - runs the HTTP trigger service
//! - [`store`] - runs a single export from the terminal

mod serve;
mod store;

use std::sync::Arc;

use crate::{config, error, pipeline::Pipeline, storage};

pub use serve::serve;
pub use store::store;

/// Reads the configuration and wires up a ready-to-run pipeline.
///
/// Exits the process with an error message on any configuration or storage
/// problem.
async fn build_pipeline() -> (config::Settings, Arc<Pipeline>) {
    let settings = match config::Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Invalid configuration: {}", e),
    };

    let store = match storage::connect(&settings.storage).await {
        Ok(store) => store,
        Err(e) => error!("Cannot open object storage: {}", e),
    };

    let pipeline = match Pipeline::new(&settings.spotify, settings.pipeline.clone(), store) {
        Ok(pipeline) => Arc::new(pipeline),
        Err(e) => error!("Cannot build HTTP client: {}", e),
    };

    (settings, pipeline)
}
