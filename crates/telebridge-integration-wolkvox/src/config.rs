//! Wolkvox configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Platform limit is 30s; requests give up just before it.
const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 4_000;

/// Configuration for the Wolkvox integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolkvoxConfig {
    /// API token (`wolkvox-token` header)
    pub token: String,
    /// Server identifier (`wolkvox_server` header)
    pub server: String,
    /// Override for the API base URL
    pub base_url: Option<String>,
    pub timeout: Duration,
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl WolkvoxConfig {
    pub fn new(token: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            server: server.into(),
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the total attempt cap (at least one)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    /// API root, derived from the server id unless overridden
    pub fn api_base(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://wv{}.wolkvox.com/api/v2", self.server),
        }
    }
}
