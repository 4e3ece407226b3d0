use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use reqwest::Client;
use tokio::sync::Mutex;

use crate::{error::PipelineError, info, spotify, types::Credential};

/// Caches the client-credentials bearer token shared by every pipeline run.
///
/// A cached credential is handed out without touching the network. Once it is
/// within the expiry margin, the first caller performs the exchange while the
/// others wait on the refresh lock and then reuse the fresh credential.
pub struct TokenCache {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    current: RwLock<Option<Credential>>,
    refresh: Mutex<()>,
}

impl TokenCache {
    pub fn new(client: Client, token_url: String, client_id: String, client_secret: String) -> Self {
        TokenCache {
            client,
            token_url,
            client_id,
            client_secret,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Returns a credential valid for at least the expiry margin.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Auth`] when the exchange fails. The exchange is not
    /// retried here.
    pub async fn get_token(&self) -> Result<Credential, PipelineError> {
        if let Some(credential) = self.cached() {
            return Ok(credential);
        }

        let _guard = self.refresh.lock().await;
        // another caller may have refreshed while we waited
        if let Some(credential) = self.cached() {
            return Ok(credential);
        }

        let credential = spotify::auth::request_client_token(
            &self.client,
            &self.token_url,
            &self.client_id,
            &self.client_secret,
        )
        .await?;
        info!(
            "Obtained Spotify access token valid until {}",
            credential.expires_at.to_rfc3339()
        );

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(credential)
    }

    /// The cached credential, if it is still valid.
    pub fn cached(&self) -> Option<Credential> {
        let now = Utc::now();
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|credential| credential.is_valid_at(now))
            .cloned()
    }
}
