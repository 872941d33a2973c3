//! Low-level REST client for a Cosmos light-client daemon.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::RpcError;

/// Retry configuration for REST calls.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (zero based).
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = std::cmp::min(
            self.initial_delay_ms.saturating_mul(factor),
            self.max_delay_ms,
        );
        Duration::from_millis(delay)
    }
}

/// Low-level REST client for the chain's HTTP endpoint.
#[derive(Clone)]
pub struct RestClient {
    url: String,
    client: reqwest::Client,
    retry_config: RetryConfig,
}

impl RestClient {
    /// Create a new REST client with the given base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_retry_config(url, RetryConfig::default())
    }

    /// Create a new REST client with custom retry configuration.
    pub fn with_retry_config(url: impl Into<String>, retry_config: RetryConfig) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self {
            url,
            client: reqwest::Client::new(),
            retry_config,
        }
    }

    /// Get the base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }

    /// GET `path` and decode the JSON body, retrying transient failures.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, RpcError> {
        let total_attempts = self.retry_config.max_retries + 1;

        for attempt in 0..total_attempts {
            match self.try_get::<R>(path).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < total_attempts - 1 => {
                    let delay = self.retry_config.delay(attempt);
                    tracing::warn!(
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying GET"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(RpcError::Timeout(total_attempts))
    }

    /// GET `path` and return the `result` member of the response body.
    ///
    /// Light-client query endpoints wrap their payload as
    /// `{"height": "...", "result": ...}`; an unwrapped body is returned as is.
    pub async fn get_result(&self, path: &str) -> Result<Value, RpcError> {
        let body: Value = self.get(path).await?;
        Ok(unwrap_result(body))
    }

    async fn try_get<R: DeserializeOwned>(&self, path: &str) -> Result<R, RpcError> {
        tracing::debug!(path, "GET");
        let response = self.client.get(self.endpoint(path)).send().await?;
        Self::decode(response).await
    }

    /// POST a JSON body to `path` and decode the response.
    ///
    /// Posts are never retried here: a lost response does not tell whether
    /// the chain accepted the transaction.
    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, RpcError> {
        tracing::debug!(path, "POST");
        let response = self
            .client
            .post(self.endpoint(path))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, RpcError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RpcError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("url", &self.url)
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

/// Extract `result` from a light-client response body.
///
/// Some routes (`node_info`) are not wrapped; their body is the payload.
pub(crate) fn unwrap_result(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Light-client errors come back as `{"error": "..."}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
