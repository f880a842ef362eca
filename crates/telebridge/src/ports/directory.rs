//! Customer Directory Port

use async_trait::async_trait;

use crate::domain::entities::CustomerRecord;
use crate::domain::errors::DomainError;

/// Read-only customer lookups used by the agent's tools
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<CustomerRecord>, DomainError>;

    async fn find_by_policy(&self, policy_number: &str)
        -> Result<Option<CustomerRecord>, DomainError>;
}
