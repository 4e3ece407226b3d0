#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Extension, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use discostore::{
    config::SpotifySettings,
    error::StorageError,
    pipeline::{Pipeline, PipelineSettings},
    spotify::fetcher::RetryPolicy,
    storage::ObjectStore,
};
use serde_json::{Value, json};

pub const TEST_TOKEN: &str = "test-token";

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Tracks how many requests are inside a handler at once.
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    pub fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard { gauge: self }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct GaugeGuard<'a> {
    gauge: &'a Gauge,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An album of the fake catalog with its track ids in listing order.
#[derive(Clone)]
pub struct FakeAlbum {
    pub id: String,
    pub tracks: Vec<String>,
}

/// In-process stand-in for the Spotify accounts service and Web API.
pub struct FakeCatalog {
    pub artist_name: String,
    pub artist_id: String,
    pub albums: Vec<FakeAlbum>,
    /// Album ids listed by `/artists/{id}/albums`, duplicates allowed.
    pub album_listing: Vec<String>,
    /// An album batch containing this id answers HTTP 500.
    pub failing_album_id: Option<String>,
    pub token_status: StatusCode,
    pub delay: Duration,
    pub gauge: Gauge,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeCatalog {
    /// Artist `artist_name` whose albums hold `track_counts[i]` tracks each.
    /// Albums are named `a1`, `a2`, ... and tracks `a1-t1`, `a1-t2`, ...
    pub fn new(artist_name: &str, track_counts: &[usize]) -> Self {
        let albums: Vec<FakeAlbum> = track_counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let id = format!("a{}", i + 1);
                FakeAlbum {
                    tracks: (1..=*count).map(|t| format!("{}-t{}", id, t)).collect(),
                    id,
                }
            })
            .collect();

        Self {
            artist_name: artist_name.to_string(),
            artist_id: "artist-x".to_string(),
            album_listing: albums.iter().map(|a| a.id.clone()).collect(),
            albums,
            failing_album_id: None,
            token_status: StatusCode::OK,
            delay: Duration::ZERO,
            gauge: Gauge::default(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, route: &str) -> usize {
        self.calls.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    fn record(&self, route: &'static str) {
        *self.calls.lock().unwrap().entry(route).or_insert(0) += 1;
    }

    fn album(&self, id: &str) -> Option<&FakeAlbum> {
        self.albums.iter().find(|a| a.id == id)
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/api/token", post(token))
            .route("/v1/search", get(search))
            .route("/v1/artists/{id}", get(artist))
            .route("/v1/artists/{id}/albums", get(artist_albums))
            .route("/v1/albums", get(several_albums))
            .route("/v1/albums/{id}/tracks", get(album_tracks))
            .route("/v1/tracks", get(several_tracks))
            .layer(Extension(self))
    }

    /// Starts the fake and returns its base URL.
    pub async fn serve(self: Arc<Self>) -> String {
        spawn(self.router()).await
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TEST_TOKEN))
}

fn paginate(items: Vec<Value>, params: &HashMap<String, String>) -> Value {
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20);
    let offset = params
        .get("offset")
        .and_then(|o| o.parse::<usize>().ok())
        .unwrap_or(0);
    let total = items.len();
    let page: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
    let next = if offset + limit < total {
        Value::String(format!("offset={}", offset + limit))
    } else {
        Value::Null
    };

    json!({
        "items": page,
        "total": total,
        "limit": limit,
        "offset": offset,
        "next": next,
    })
}

fn ids_param(params: &HashMap<String, String>) -> Vec<String> {
    params
        .get("ids")
        .map(|ids| ids.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

async fn token(Extension(fake): Extension<Arc<FakeCatalog>>, headers: HeaderMap) -> Response {
    fake.record("token");
    let basic = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !basic || fake.token_status != StatusCode::OK {
        let status = if basic {
            fake.token_status
        } else {
            StatusCode::UNAUTHORIZED
        };
        return (status, Json(json!({"error": "invalid_client"}))).into_response();
    }

    Json(json!({
        "access_token": TEST_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

async fn search(
    Extension(fake): Extension<Arc<FakeCatalog>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    fake.record("search");
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let _inside = fake.gauge.enter();
    tokio::time::sleep(fake.delay).await;

    let query = params.get("q").cloned().unwrap_or_default();
    let items = if query.eq_ignore_ascii_case(&fake.artist_name) {
        vec![json!({"id": fake.artist_id, "name": fake.artist_name, "type": "artist"})]
    } else {
        Vec::new()
    };

    Json(json!({ "artists": paginate(items, &params) })).into_response()
}

async fn artist(
    Extension(fake): Extension<Arc<FakeCatalog>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    fake.record("artist");
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let _inside = fake.gauge.enter();
    tokio::time::sleep(fake.delay).await;

    if id != fake.artist_id {
        return StatusCode::NOT_FOUND.into_response();
    }

    Json(json!({
        "id": fake.artist_id,
        "name": fake.artist_name,
        "type": "artist",
        "genres": ["synthpop"],
        "followers": {"total": 1000}
    }))
    .into_response()
}

async fn artist_albums(
    Extension(fake): Extension<Arc<FakeCatalog>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    fake.record("artist_albums");
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let _inside = fake.gauge.enter();
    tokio::time::sleep(fake.delay).await;

    if id != fake.artist_id {
        return StatusCode::NOT_FOUND.into_response();
    }

    let items = fake
        .album_listing
        .iter()
        .map(|id| json!({"id": id, "name": format!("Album {}", id), "type": "album"}))
        .collect();

    Json(paginate(items, &params)).into_response()
}

async fn several_albums(
    Extension(fake): Extension<Arc<FakeCatalog>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    fake.record("albums");
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let _inside = fake.gauge.enter();
    tokio::time::sleep(fake.delay).await;

    let ids = ids_param(&params);
    if let Some(failing) = &fake.failing_album_id {
        if ids.contains(failing) {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"status": 500, "message": "Server error"}})),
            )
                .into_response();
        }
    }

    let albums: Vec<Value> = ids
        .iter()
        .map(|id| match fake.album(id) {
            Some(album) => json!({
                "id": album.id,
                "name": format!("Album {}", album.id),
                "type": "album",
                "label": "Fake Records",
                "popularity": 42,
                "total_tracks": album.tracks.len()
            }),
            None => Value::Null,
        })
        .collect();

    Json(json!({ "albums": albums })).into_response()
}

async fn album_tracks(
    Extension(fake): Extension<Arc<FakeCatalog>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    fake.record("album_tracks");
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let _inside = fake.gauge.enter();
    tokio::time::sleep(fake.delay).await;

    let Some(album) = fake.album(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let items = album
        .tracks
        .iter()
        .map(|t| json!({"id": t, "name": format!("Track {}", t), "type": "track"}))
        .collect();

    Json(paginate(items, &params)).into_response()
}

async fn several_tracks(
    Extension(fake): Extension<Arc<FakeCatalog>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    fake.record("tracks");
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let _inside = fake.gauge.enter();
    tokio::time::sleep(fake.delay).await;

    let tracks: Vec<Value> = ids_param(&params)
        .iter()
        .map(|id| {
            let album = fake.albums.iter().find(|a| a.tracks.contains(id));
            match album {
                Some(album) => json!({
                    "id": id,
                    "name": format!("Track {}", id),
                    "type": "track",
                    "popularity": 7,
                    "album": {"id": album.id, "type": "album"}
                }),
                None => Value::Null,
            }
        })
        .collect();

    Json(json!({ "tracks": tracks })).into_response()
}

/// Object store keeping everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
    pub writes: AtomicUsize,
    /// Keys starting with this prefix fail to write.
    pub failing_prefix: Option<String>,
}

impl MemoryStore {
    pub fn failing_on(prefix: &str) -> Self {
        Self {
            failing_prefix: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(body, _)| String::from_utf8(body.clone()).unwrap())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(_, ct)| ct.clone())
    }

    pub fn snapshot(&self) -> BTreeMap<String, (Vec<u8>, String)> {
        self.objects.lock().unwrap().clone()
    }

    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.keys().iter().filter(|k| k.starts_with(prefix)).count()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(prefix) = &self.failing_prefix {
            if key.starts_with(prefix) {
                return Err(StorageError::Status {
                    status: 503,
                    body: "backend unavailable".to_string(),
                });
            }
        }

        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(10),
        max_retry_after: Duration::from_secs(5),
    }
}

pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        retry: fast_retry(),
        ..PipelineSettings::default()
    }
}

pub fn spotify_settings(base_url: &str) -> SpotifySettings {
    SpotifySettings {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        api_url: format!("{}/v1", base_url),
        token_url: format!("{}/api/token", base_url),
        http_timeout: Duration::from_secs(5),
    }
}

/// A pipeline against a running fake catalog.
pub async fn pipeline_for(
    fake: Arc<FakeCatalog>,
    settings: PipelineSettings,
    store: Arc<MemoryStore>,
) -> Pipeline {
    let base_url = fake.serve().await;
    Pipeline::new(&spotify_settings(&base_url), settings, store).unwrap()
}
