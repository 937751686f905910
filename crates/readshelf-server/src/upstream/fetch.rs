//! Retrying JSON fetcher for the upstream book APIs.
//!
//! Retries 429, [500, 600) and transport failures with exponential backoff
//! plus jitter; any other non-2xx fails immediately. A deterministically
//! failing upstream sees exactly `retries` HTTP requests.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use url::Url;

use readshelf_core::{Error, Result};

use crate::config::FetchConfig;

/// Random component added on top of the exponential delay, in milliseconds.
const JITTER_MAX_MS: u64 = 150;

/// HTTP client wrapper enforcing the retry policy.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    retries: u32,
    base_delay: Duration,
}

impl Fetcher {
    pub fn from_config(cfg: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(concat!("readshelf-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            retries: cfg.retries.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
        })
    }

    /// Override the retry policy (tests use a sub-millisecond base delay).
    pub fn with_policy(mut self, retries: u32, base_delay: Duration) -> Self {
        self.retries = retries.max(1);
        self.base_delay = base_delay;
        self
    }

    /// Fetch `url` and decode the body as JSON, retrying per the policy.
    ///
    /// `source` names the upstream ("NYT", "Google Books") in error messages.
    pub async fn fetch_json(&self, source: &str, url: Url) -> Result<Value> {
        let mut attempt: u32 = 0;
        loop {
            let failure = match self.client.get(url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if (200..300).contains(&status) {
                        return resp.json::<Value>().await.map_err(|e| {
                            Error::unexpected_payload(format!("{source} body was not JSON: {e}"))
                        });
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err =
                        Error::upstream(status, format!("{source} upstream error {status}"), &body);
                    if !is_retryable_status(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => Error::Network(format!("{source} request failed: {e}")),
            };

            attempt += 1;
            if attempt >= self.retries {
                tracing::warn!(source = %source, attempts = attempt, error = %failure, "upstream fetch exhausted retries");
                return Err(failure);
            }

            let delay = backoff_delay(self.base_delay, attempt);
            tracing::debug!(source = %source, attempt = attempt, delay_ms = delay.as_millis() as u64, error = %failure, "retrying upstream fetch");
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Delay before retry number `attempt` (1-based): exponential in the attempt
/// plus up to [`JITTER_MAX_MS`] of jitter.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=JITTER_MAX_MS));
    deterministic_backoff(base, attempt) + jitter
}

fn deterministic_backoff(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}
