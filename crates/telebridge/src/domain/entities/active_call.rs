//! ActiveCall - orchestrator-side record of a contact-center call

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::TransferReason;

/// A call detected by polling the contact center.
///
/// `call_id` is generated by the orchestrator and is unrelated to
/// [`CallSession`](crate::domain::CallSession) ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveCall {
    pub call_id: String,
    pub agent_id: String,
    pub phone_number: String,
    pub start_time: DateTime<Utc>,
    pub agent_connected: bool,
    pub transcript: String,
    pub summary: String,
    pub should_transfer: bool,
    pub transfer_reason: Option<TransferReason>,
}

impl ActiveCall {
    pub fn new(agent_id: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            call_id: format!("call-{}", Uuid::new_v4()),
            agent_id: agent_id.into(),
            phone_number: phone_number.into(),
            start_time: Utc::now(),
            agent_connected: false,
            transcript: String::new(),
            summary: String::new(),
            should_transfer: false,
            transfer_reason: None,
        }
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.start_time
    }

    pub fn exceeds(&self, max: Duration, now: DateTime<Utc>) -> bool {
        self.elapsed(now) >= max
    }

    /// Mark the call for transfer. Returns `false` if it already was.
    pub fn mark_for_transfer(&mut self, reason: TransferReason) -> bool {
        if self.should_transfer {
            return false;
        }
        self.should_transfer = true;
        self.transfer_reason = Some(reason);
        true
    }

    pub fn append_transcript(&mut self, text: &str) {
        if !self.transcript.is_empty() {
            self.transcript.push('\n');
        }
        self.transcript.push_str(text.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_for_transfer_once() {
        let mut call = ActiveCall::new("1001", "3001112233");
        assert!(call.mark_for_transfer(TransferReason::Manual));
        assert!(!call.mark_for_transfer(TransferReason::MaxDurationExceeded));
        assert_eq!(call.transfer_reason, Some(TransferReason::Manual));
    }

    #[test]
    fn test_exceeds_zero_duration() {
        let call = ActiveCall::new("1001", "3001112233");
        assert!(call.exceeds(Duration::zero(), Utc::now()));
        assert!(!call.exceeds(Duration::minutes(10), Utc::now()));
    }

    #[test]
    fn test_transcript_lines() {
        let mut call = ActiveCall::new("1001", "3001112233");
        call.append_transcript("hola ");
        call.append_transcript("quiero un asesor");
        assert_eq!(call.transcript, "hola\nquiero un asesor");
    }
}
