use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::{sync::Semaphore, time::sleep};

use crate::{error::PipelineError, utils, warning};

/// How often and how patiently an upstream call is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `base_delay * 2^(n-1)`.
    pub base_delay: Duration,
    /// Ceiling for server supplied `Retry-After` hints.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_retry_after: Duration::from_secs(120),
        }
    }
}

/// Single choke point for every read against the Spotify Web API.
///
/// At most `max_concurrent` requests are in flight at any instant, no matter
/// how many callers share the fetcher. A caller keeps its permit for the whole
/// call, backoff sleeps included, so a rate-limited upstream sees the load
/// drop instead of a burst of replacement requests.
///
/// # Retry Logic
///
/// - `429 Too Many Requests`: waits for `Retry-After` (clamped to
///   `max_retry_after`) or the exponential backoff, then retries
/// - network failures and timeouts: exponential backoff, then retry
/// - any other error status: fails immediately with
///   [`PipelineError::UpstreamHttp`]
/// - after `max_retries` attempts: [`PipelineError::FetchExhausted`]
pub struct ThrottledFetcher {
    client: Client,
    permits: Semaphore,
    policy: RetryPolicy,
}

impl ThrottledFetcher {
    pub fn new(client: Client, max_concurrent: usize, policy: RetryPolicy) -> Self {
        Self {
            client,
            permits: Semaphore::new(max_concurrent.max(1)),
            policy,
        }
    }

    /// Performs an authenticated GET and decodes the body as JSON.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute endpoint URL
    /// * `token` - Bearer token sent in the `Authorization` header
    /// * `query` - Query parameters appended to the URL
    pub async fn get_json(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<Value, PipelineError> {
        let _permit = self.permits.acquire().await?;

        let max_attempts = self.policy.max_retries.max(1);
        let mut attempt = 0;

        while attempt < max_attempts {
            attempt += 1;

            let response = self
                .client
                .get(url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await;

            let delay = match response {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => {
                        return serde_json::from_str(&body).map_err(|e| PipelineError::Malformed {
                            url: url.to_string(),
                            reason: e.to_string(),
                        });
                    }
                    Err(err) => {
                        let delay = self.backoff(attempt);
                        if attempt < max_attempts {
                            warning!(
                                "Reading body from {} failed (attempt {}/{}): {}. Retrying in {:?}",
                                url,
                                attempt,
                                max_attempts,
                                err,
                                delay
                            );
                        }
                        delay
                    }
                },
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let delay = match utils::parse_retry_after(resp.headers()) {
                        Some(hint) if hint > self.policy.max_retry_after => {
                            warning!(
                                "Retry-After of {}s from {} exceeds the {}s ceiling",
                                hint.as_secs(),
                                url,
                                self.policy.max_retry_after.as_secs()
                            );
                            self.policy.max_retry_after
                        }
                        Some(hint) => hint,
                        None => self.backoff(attempt),
                    };
                    if attempt < max_attempts {
                        warning!(
                            "Rate limited on {} (attempt {}/{}). Retrying in {:?}",
                            url,
                            attempt,
                            max_attempts,
                            delay
                        );
                    }
                    delay
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(PipelineError::UpstreamHttp {
                        url: url.to_string(),
                        status,
                        body,
                    });
                }
                Err(err) => {
                    let delay = self.backoff(attempt);
                    if attempt < max_attempts {
                        warning!(
                            "Request to {} failed (attempt {}/{}): {}. Retrying in {:?}",
                            url,
                            attempt,
                            max_attempts,
                            err,
                            delay
                        );
                    }
                    delay
                }
            };

            if attempt < max_attempts {
                sleep(delay).await;
            }
        }

        warning!("Giving up on {} after {} attempts", url, attempt);
        Err(PipelineError::FetchExhausted {
            url: url.to_string(),
            attempts: attempt,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        utils::with_jitter(utils::backoff_delay(self.policy.base_delay, attempt))
    }
}
