//! # API Module
//!
//! HTTP handlers of the export service, built on [Axum](https://docs.rs/axum).
//!
//! ## Endpoints
//!
//! - [`index`] - `GET /`, plain-text usage hint
//! - [`health`] - `GET /health`, status and version for load balancers
//! - [`store_artist`] - `GET /artist/{artist_name}/store`, runs the export
//!   pipeline and reports what was stored
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Extension, Router, routing::get};
//! use discostore::api::{health, store_artist};
//!
//! let app = Router::new()
//!     .route("/health", get(health))
//!     .route("/artist/{artist_name}/store", get(store_artist))
//!     .layer(Extension(pipeline));
//! ```

mod health;
mod store;

pub use health::{health, index};
pub use store::store_artist;
