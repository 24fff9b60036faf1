//! Blocking JSON GET with exponential backoff, shared by the HTTP bar sources.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::error::EngineError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.pow(attempt.saturating_sub(1))
    }
}

pub fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, EngineError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .map_err(|e| EngineError::Io(std::io::Error::other(e)))
}

/// GET `url` and decode the body. 429, 5xx, connect errors and timeouts are
/// retried; 404 and other client errors fail immediately.
pub fn get_json<T: DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: &str,
    query: &[(&str, String)],
    symbol: &str,
    policy: &RetryPolicy,
) -> Result<T, EngineError> {
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
            std::thread::sleep(delay);
        }

        match client.get(url).query(query).send() {
            Ok(resp) => {
                let status = resp.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    warn!(symbol, %status, attempt, "transient HTTP failure");
                    last_error = Some(format!("HTTP {status}"));
                    continue;
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(EngineError::data_unavailable(symbol, "symbol not found"));
                }

                if !status.is_success() {
                    return Err(EngineError::data_unavailable(symbol, format!("HTTP {status}")));
                }

                return resp.json::<T>().map_err(|e| {
                    EngineError::data_unavailable(symbol, format!("failed to parse response: {e}"))
                });
            }
            Err(e) if e.is_connect() || e.is_timeout() => {
                warn!(symbol, attempt, error = %e, "network failure");
                last_error = Some(e.to_string());
            }
            Err(e) => return Err(EngineError::data_unavailable(symbol, e.to_string())),
        }
    }

    Err(EngineError::data_unavailable(
        symbol,
        format!(
            "max retries exceeded: {}",
            last_error.unwrap_or_else(|| "unknown error".into())
        ),
    ))
}
