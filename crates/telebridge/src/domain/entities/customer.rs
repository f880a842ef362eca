//! Customer data used by agent tools

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub policy_number: String,
    pub product: String,
    pub status: String,
    #[serde(default)]
    pub open_claims: u32,
}

/// Customer as returned by a [`CustomerDirectory`](crate::ports::CustomerDirectory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub policies: Vec<PolicySummary>,
}

/// Context saved by the agent ahead of a human handoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffContext {
    pub call_id: Option<String>,
    pub phone_number: Option<String>,
    pub summary: String,
    pub department: Option<String>,
    pub notes: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl HandoffContext {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            call_id: None,
            phone_number: None,
            summary: summary.into(),
            department: None,
            notes: None,
            saved_at: Utc::now(),
        }
    }
}
