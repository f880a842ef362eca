//! Contact Center Port
//!
//! Operations the orchestrator and handoff logic need from the
//! contact-center platform.

use async_trait::async_trait;

use crate::domain::entities::{InteractionLog, RealtimeAgent, SkillTransfer};
use crate::domain::errors::DomainError;

#[async_trait]
pub trait ContactCenter: Send + Sync {
    /// List agents in real time, optionally filtered by status (e.g. "Talk")
    async fn list_agents(&self, status: Option<&str>) -> Result<Vec<RealtimeAgent>, DomainError>;

    /// Transfer a call to a skill/queue
    async fn transfer_to_skill(&self, transfer: &SkillTransfer) -> Result<(), DomainError>;

    /// Record an interaction (transcript, summary, duration)
    async fn log_interaction(&self, log: &InteractionLog) -> Result<(), DomainError>;

    /// Get the platform name (e.g., "wolkvox")
    fn name(&self) -> &str;

    /// Check if the platform API is reachable and accepts our credentials
    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(true)
    }
}
