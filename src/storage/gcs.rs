use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, header::CONTENT_TYPE};
use tokio::sync::Mutex;

use crate::{
    error::StorageError,
    storage::ObjectStore,
    types::{Credential, TokenResponse},
};

/// Google Cloud Storage backend using the JSON API media upload.
///
/// Authenticates with a static bearer token when one is configured, and
/// otherwise with the service account of the compute metadata server, whose
/// short-lived tokens are cached until shortly before they expire.
pub struct GcsStore {
    client: Client,
    bucket: String,
    api_url: String,
    static_token: Option<String>,
    metadata_url: String,
    token: RwLock<Option<Credential>>,
    refresh: Mutex<()>,
}

impl GcsStore {
    /// Creates the store without contacting the bucket.
    ///
    /// # Arguments
    ///
    /// * `bucket` - Target bucket name
    /// * `api_url` - Storage JSON API base URL
    /// * `static_token` - Bearer token to use instead of the metadata server
    /// * `metadata_url` - Token endpoint of the compute metadata server
    pub fn new(
        bucket: String,
        api_url: String,
        static_token: Option<String>,
        metadata_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            bucket,
            api_url: api_url.trim_end_matches('/').to_string(),
            static_token,
            metadata_url,
            token: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Creates the store and verifies the bucket is reachable.
    pub async fn connect(
        bucket: String,
        api_url: String,
        static_token: Option<String>,
        metadata_url: String,
    ) -> Result<Self, StorageError> {
        let store = Self::new(bucket, api_url, static_token, metadata_url);

        let token = store.access_token().await?;
        let res = store
            .client
            .get(format!(
                "{uri}/storage/v1/b/{bucket}",
                uri = store.api_url,
                bucket = store.bucket
            ))
            .bearer_auth(token)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(StorageError::Status {
                status: res.status().as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        Ok(store)
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        // a concurrent upload may have refreshed while we waited
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let res = self
            .client
            .get(&self.metadata_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StorageError::Credentials(e.to_string()))?;

        if !res.status().is_success() {
            return Err(StorageError::Credentials(format!(
                "metadata server returned HTTP {}",
                res.status().as_u16()
            )));
        }

        let json = res
            .json::<TokenResponse>()
            .await
            .map_err(|e| StorageError::Credentials(e.to_string()))?;
        let credential = Credential::issued(json.access_token, json.expires_in, Utc::now())
            .ok_or_else(|| {
                StorageError::Credentials(format!(
                    "token lifetime of {}s is out of range",
                    json.expires_in
                ))
            })?;
        let token = credential.token.clone();
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);

        Ok(token)
    }

    fn cached_token(&self) -> Option<String> {
        let now = Utc::now();
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|credential| credential.is_valid_at(now))
            .map(|credential| credential.token.clone())
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let token = self.access_token().await?;
        let res = self
            .client
            .post(format!(
                "{uri}/upload/storage/v1/b/{bucket}/o",
                uri = self.api_url,
                bucket = self.bucket
            ))
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(token)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(StorageError::Status {
                status: res.status().as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("gs://{}", self.bucket)
    }
}
