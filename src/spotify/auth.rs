use chrono::Utc;
use reqwest::Client;

use crate::{
    error::PipelineError,
    types::{Credential, TokenResponse},
};

/// Exchanges the application's client id and secret for an access token.
///
/// Uses the OAuth 2.0 client-credentials grant: the id and secret travel as
/// HTTP basic auth and the body carries `grant_type=client_credentials`. The
/// returned credential expires [`crate::types::TOKEN_EXPIRY_MARGIN_SECS`]
/// before the lifetime Spotify declares.
///
/// # Errors
///
/// Any transport failure, non-success status or undecodable body becomes
/// [`PipelineError::Auth`].
pub async fn request_client_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<Credential, PipelineError> {
    let res = client
        .post(token_url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| PipelineError::Auth(e.to_string()))?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(PipelineError::Auth(format!(
            "token endpoint returned HTTP {}: {}",
            status.as_u16(),
            body
        )));
    }

    let json = res
        .json::<TokenResponse>()
        .await
        .map_err(|e| PipelineError::Auth(e.to_string()))?;

    Credential::issued(json.access_token, json.expires_in, Utc::now()).ok_or_else(|| {
        PipelineError::Auth(format!("token lifetime of {}s is out of range", json.expires_in))
    })
}
