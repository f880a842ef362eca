//! Orchestrator DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use telebridge::ActiveCall;

use crate::application::{OrchestratorStatus, TransferOutcome};

/// Orchestrator status snapshot
#[derive(Debug, Serialize, ToSchema)]
pub struct OrchestratorStatusResponse {
    pub is_running: bool,
    pub active_calls: usize,
    pub calls: Vec<ActiveCallResponse>,
}

impl OrchestratorStatusResponse {
    pub fn from_domain(status: OrchestratorStatus) -> Self {
        Self {
            is_running: status.is_running,
            active_calls: status.active_calls,
            calls: status
                .calls
                .into_iter()
                .map(ActiveCallResponse::from_domain)
                .collect(),
        }
    }
}

/// Contact-center call tracked by the orchestrator
#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveCallResponse {
    pub call_id: String,
    pub agent_id: String,
    pub phone_number: String,
    pub start_time: DateTime<Utc>,
    pub agent_connected: bool,
    pub should_transfer: bool,
    pub transfer_reason: Option<String>,
}

impl ActiveCallResponse {
    pub fn from_domain(call: ActiveCall) -> Self {
        Self {
            call_id: call.call_id,
            agent_id: call.agent_id,
            phone_number: call.phone_number,
            start_time: call.start_time,
            agent_connected: call.agent_connected,
            should_transfer: call.should_transfer,
            transfer_reason: call.transfer_reason.map(|r| r.to_string()),
        }
    }
}

/// Request to force a transfer
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ForceTransferRequest {
    /// Target skill; the configured default is used when omitted
    pub skill_id: Option<String>,
}

/// Transcript fragment for a tracked call
#[derive(Debug, Deserialize, ToSchema)]
pub struct TranscriptRequest {
    pub text: String,
}

/// Result of a transfer attempt
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    pub call_id: String,
    /// completed | already_in_progress | failed
    pub status: String,
    pub skill_id: Option<String>,
    pub error: Option<String>,
}

impl TransferResponse {
    pub fn from_outcome(call_id: &str, outcome: TransferOutcome) -> Self {
        let (status, skill_id, error) = match outcome {
            TransferOutcome::Completed { skill_id } => ("completed", Some(skill_id), None),
            TransferOutcome::AlreadyInProgress => ("already_in_progress", None, None),
            TransferOutcome::Failed { error } => ("failed", None, Some(error)),
        };
        Self {
            call_id: call_id.to_string(),
            status: status.to_string(),
            skill_id,
            error,
        }
    }
}

/// Response to a transcript fragment
#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptResponse {
    pub call_id: String,
    /// Present when the fragment triggered a keyword transfer
    pub transfer: Option<TransferResponse>,
}
