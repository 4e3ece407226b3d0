use axum::response::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn index() -> &'static str {
    "Spotify discography export service. Usage: /artist/<artist_name>/store"
}
