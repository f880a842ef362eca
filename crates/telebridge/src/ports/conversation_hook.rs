//! Conversation Hook Port
//!
//! Called by the orchestrator when it detects or drops a contact-center call.
//! Real audio for those calls travels a different path, so the default hook
//! only records that the call was seen.

use async_trait::async_trait;

use crate::domain::entities::ActiveCall;
use crate::domain::errors::DomainError;

#[async_trait]
pub trait ConversationHook: Send + Sync {
    /// Attach the conversational agent to a newly detected call.
    ///
    /// Returns whether the agent is now considered connected.
    async fn on_call_detected(&self, _call: &ActiveCall) -> Result<bool, DomainError> {
        Ok(true)
    }

    /// Release whatever `on_call_detected` attached.
    async fn on_call_finished(&self, _call: &ActiveCall, _reason: &str) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Marker-only hook
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConversationHook;

impl ConversationHook for NoopConversationHook {}
