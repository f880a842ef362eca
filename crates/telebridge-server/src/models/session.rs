//! Session DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use telebridge::SessionSnapshot;

/// Live (or recently ended) call bridge
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub call_id: String,
    pub caller: String,
    pub called_number: Option<String>,
    /// initializing | connected | streaming | transferring | ended
    pub state: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub transfer_queue: Option<String>,
    pub transfer_reason: Option<String>,
    pub stats: SessionStatsResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStatsResponse {
    pub audio_packets_received: u64,
    pub audio_packets_sent: u64,
    pub user_utterances: u64,
    pub agent_responses: u64,
    pub tool_calls: u64,
}

impl SessionResponse {
    pub fn from_domain(snapshot: SessionSnapshot) -> Self {
        let SessionSnapshot {
            state,
            metadata,
            stats,
        } = snapshot;
        Self {
            call_id: metadata.call_id,
            caller: metadata.caller,
            called_number: metadata.called_number,
            state: state.to_string(),
            start_time: metadata.start_time,
            end_time: metadata.end_time,
            duration_ms: metadata.duration_ms,
            transfer_queue: metadata.transfer_queue,
            transfer_reason: metadata.transfer_reason,
            stats: SessionStatsResponse {
                audio_packets_received: stats.audio_packets_received,
                audio_packets_sent: stats.audio_packets_sent,
                user_utterances: stats.user_utterances,
                agent_responses: stats.agent_responses,
                tool_calls: stats.tool_calls,
            },
        }
    }
}
