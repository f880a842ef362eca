//! Contact-center records exchanged through the `ContactCenter` port

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Real-time view of a human agent on the contact-center platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeAgent {
    pub agent_id: String,
    pub name: Option<String>,
    pub status: String,
    /// Remote party on the agent's current call, when the platform reports it
    pub phone_number: Option<String>,
    pub skill_id: Option<String>,
}

/// Request to move a call to a skill/queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTransfer {
    pub agent_id: Option<String>,
    pub skill_id: String,
    pub phone_number: String,
    pub summary: String,
}

/// Interaction record written after a call is handed off or finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionLog {
    pub call_id: String,
    pub phone_number: String,
    pub transcript: String,
    pub summary: String,
    pub duration_secs: i64,
    pub outcome: String,
    pub recorded_at: DateTime<Utc>,
}
