//! Call Control Port
//!
//! Moves a live carrier call to a SIP destination (warm handoff).

use async_trait::async_trait;

use crate::domain::errors::DomainError;
use crate::domain::value_objects::TelephonyProvider;

#[async_trait]
pub trait CallTransferer: Send + Sync {
    /// Transfer `call_handle` (Telnyx call_control_id, Twilio CallSid) to `target`
    async fn transfer(&self, call_handle: &str, target: &str) -> Result<(), DomainError>;

    fn provider(&self) -> TelephonyProvider;
}
