//! Telebridge Admin API Client

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// API Client for the Telebridge admin API
pub struct TelebridgeClient {
    client: Client,
    base_url: String,
    api_key: String,
}

// ============================================
// API Response Types
// ============================================

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub call_id: String,
    pub caller: String,
    pub state: String,
    pub start_time: DateTime<Utc>,
    pub duration_ms: Option<i64>,
    pub transfer_queue: Option<String>,
    pub stats: SessionStats,
}

#[derive(Debug, Deserialize)]
pub struct SessionStats {
    pub audio_packets_received: u64,
    pub audio_packets_sent: u64,
    pub user_utterances: u64,
    pub agent_responses: u64,
    pub tool_calls: u64,
}

#[derive(Debug, Deserialize)]
pub struct OrchestratorStatus {
    pub is_running: bool,
    pub active_calls: usize,
    pub calls: Vec<ActiveCall>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveCall {
    pub call_id: String,
    pub agent_id: String,
    pub phone_number: String,
    pub start_time: DateTime<Utc>,
    pub should_transfer: bool,
}

#[derive(Debug, Deserialize)]
pub struct TransferResponse {
    pub call_id: String,
    pub status: String,
    pub skill_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ForceTransferRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
}

impl TelebridgeClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Test connection with health check
    pub async fn health(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    /// Check that the key is accepted by a protected endpoint
    pub async fn verify_key(&self) -> Result<()> {
        self.list_sessions().await.map(|_| ())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionResponse>> {
        let request = self.authorized(self.client.get(self.url("/api/sessions")));
        parse(send(request).await?).await
    }

    pub async fn orchestrator_status(&self) -> Result<OrchestratorStatus> {
        let request = self.authorized(self.client.get(self.url("/api/orchestrator/status")));
        parse(send(request).await?).await
    }

    pub async fn start_orchestrator(&self) -> Result<OrchestratorStatus> {
        let request = self.authorized(self.client.post(self.url("/api/orchestrator/start")));
        parse(send(request).await?).await
    }

    pub async fn stop_orchestrator(&self) -> Result<OrchestratorStatus> {
        let request = self.authorized(self.client.post(self.url("/api/orchestrator/stop")));
        parse(send(request).await?).await
    }

    pub async fn force_transfer(
        &self,
        call_id: &str,
        skill_id: Option<String>,
    ) -> Result<TransferResponse> {
        let path = format!(
            "/api/orchestrator/calls/{}/transfer",
            urlencoding::encode(call_id)
        );
        let request = self
            .authorized(self.client.post(self.url(&path)))
            .json(&ForceTransferRequest { skill_id });
        parse(send(request).await?).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let resp = request
        .send()
        .await
        .context("Failed to connect to Telebridge API")?;
    tracing::debug!(status = %resp.status(), url = %resp.url(), "API response");

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("API error ({}): {}", status, body);
    }
    Ok(resp)
}

async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T> {
    resp.json().await.context("Failed to parse response")
}
