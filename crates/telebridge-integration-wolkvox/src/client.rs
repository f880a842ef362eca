//! Wolkvox REST client
//!
//! Every request carries the token and server headers, a hard timeout, and is
//! retried with exponential backoff on 429, 5xx and transport timeouts.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::WolkvoxConfig;
use crate::error::WolkvoxError;

const TOKEN_HEADER: &str = "wolkvox-token";
const SERVER_HEADER: &str = "wolkvox_server";

/// Wolkvox API client
pub struct WolkvoxClient {
    http: Client,
    config: WolkvoxConfig,
    base: String,
}

impl WolkvoxClient {
    pub fn new(config: WolkvoxConfig) -> Result<Self, WolkvoxError> {
        if config.token.trim().is_empty() {
            return Err(WolkvoxError::Config("token is empty".into()));
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        let base = config.api_base();
        Ok(Self { http, config, base })
    }

    pub fn config(&self) -> &WolkvoxConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, WolkvoxError> {
        let url = self.url(path);
        self.send_with_retry(path, || self.http.get(&url).query(query))
            .await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, WolkvoxError> {
        let url = self.url(path);
        self.send_with_retry(path, || self.http.post(&url).json(body))
            .await
    }

    async fn send_with_retry<F>(&self, operation: &str, build: F) -> Result<Value, WolkvoxError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            let request = build()
                .header(TOKEN_HEADER, &self.config.token)
                .header(SERVER_HEADER, &self.config.server);

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await?;
                    if status.is_success() {
                        debug!(operation, attempt, "Wolkvox request succeeded");
                        return parse_envelope(&body);
                    }
                    if !is_retryable(status) {
                        return Err(WolkvoxError::Status {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    WolkvoxError::Status {
                        status: status.as_u16(),
                        body,
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => WolkvoxError::Http(e),
                Err(e) => return Err(WolkvoxError::Http(e)),
            };

            if attempt >= self.config.max_attempts {
                warn!(operation, attempt, error = %error, "Wolkvox request failed, giving up");
                return Err(error);
            }

            let delay = backoff_delay(
                self.config.retry_base_delay,
                self.config.retry_max_delay,
                attempt,
            );
            warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Wolkvox request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// 429 and 5xx are transient; everything else is final.
pub(crate) fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry number `attempt` (1-based): base, 2×base, 4×base… capped at `max`.
pub(crate) fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(max)
}

/// Unwrap the `{code, error, msg, data}` envelope.
///
/// Some endpoints report failures with HTTP 200 and a non-200 `code`.
pub(crate) fn parse_envelope(body: &str) -> Result<Value, WolkvoxError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| WolkvoxError::Decode(e.to_string()))?;

    let code = match value.get("code") {
        Some(Value::String(s)) => s.parse::<u16>().ok(),
        Some(Value::Number(n)) => n.as_u64().map(|n| n as u16),
        _ => None,
    };
    if let Some(code) = code {
        if !(200..300).contains(&code) {
            let message = value
                .get("error")
                .or_else(|| value.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(WolkvoxError::Status {
                status: code,
                body: message,
            });
        }
    }

    Ok(value.get("data").cloned().unwrap_or(value))
}
