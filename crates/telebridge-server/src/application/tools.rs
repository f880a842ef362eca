//! Client tool execution
//!
//! Answers the agent's data tools (customer lookup, context saving). Call
//! control tools (transfer, end call) are handled by the bridge itself.

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use telebridge::ports::{ContactCenter, CustomerDirectory};
use telebridge::{
    CustomerRecord, DomainError, HandoffContext, InteractionLog, ToolCall, ToolKind, ToolResult,
};

use super::best_effort::best_effort;

/// Contexts older than this are dropped on the next save
pub const DEFAULT_CONTEXT_RETENTION: Duration = Duration::from_secs(3600);

/// Handoff contexts saved by the agent, keyed by call id (or phone number)
pub struct ContextStore {
    entries: DashMap<String, HandoffContext>,
    retention: chrono::Duration,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_CONTEXT_RETENTION)
    }
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::days(1)),
        }
    }

    /// Store `context`, evicting entries past the retention window.
    pub fn save(&self, key: impl Into<String>, context: HandoffContext) {
        let cutoff = Utc::now() - self.retention;
        let before = self.entries.len();
        self.entries.retain(|_, c| c.saved_at > cutoff);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!(evicted, "Expired handoff contexts dropped");
        }
        self.entries.insert(key.into(), context);
    }

    pub fn get(&self, key: &str) -> Option<HandoffContext> {
        self.entries
            .get(key)
            .map(|entry| entry.value().clone())
            .filter(|c| !self.is_expired(c))
    }

    pub fn take(&self, key: &str) -> Option<HandoffContext> {
        self.entries
            .remove(key)
            .map(|(_, context)| context)
            .filter(|c| !self.is_expired(c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_expired(&self, context: &HandoffContext) -> bool {
        context.saved_at <= Utc::now() - self.retention
    }
}

/// Outcome of a customer lookup
#[derive(Debug, Clone, Serialize)]
pub struct LookupOutcome {
    pub found: bool,
    pub customer: Option<CustomerRecord>,
    pub message: String,
}

pub struct ToolExecutor {
    directory: Arc<dyn CustomerDirectory>,
    contexts: Arc<ContextStore>,
    contact_center: Option<Arc<dyn ContactCenter>>,
}

impl ToolExecutor {
    pub fn new(directory: Arc<dyn CustomerDirectory>, contexts: Arc<ContextStore>) -> Self {
        Self {
            directory,
            contexts,
            contact_center: None,
        }
    }

    /// Also forward saved contexts to the contact center as interaction notes
    pub fn with_contact_center(mut self, contact_center: Arc<dyn ContactCenter>) -> Self {
        self.contact_center = Some(contact_center);
        self
    }

    pub fn contexts(&self) -> &Arc<ContextStore> {
        &self.contexts
    }

    /// Run a data tool for `call_id`. Errors become error-flagged results.
    pub async fn execute(&self, call: &ToolCall, call_id: &str, caller: &str) -> ToolResult {
        debug!(call_id, tool = call.kind.name(), tool_call_id = %call.id, "Executing client tool");

        match &call.kind {
            ToolKind::LookupPolicy {
                phone_number,
                policy_number,
            } => {
                let phone = phone_number.as_deref().or(Some(caller));
                match self.lookup(phone, policy_number.as_deref()).await {
                    Ok(outcome) => ToolResult::success(&call.id, json!(outcome)),
                    Err(e) => {
                        warn!(call_id, error = %e, "Customer lookup failed");
                        ToolResult::failure(&call.id, format!("lookup failed: {e}"))
                    }
                }
            }
            ToolKind::SaveContext {
                phone_number,
                summary,
                department,
                notes,
            } => {
                let context = HandoffContext {
                    call_id: Some(call_id.to_string()),
                    phone_number: phone_number.clone().or_else(|| Some(caller.to_string())),
                    summary: summary.clone(),
                    department: department.clone(),
                    notes: notes.clone(),
                    saved_at: Utc::now(),
                };
                ToolResult::success(&call.id, self.save_context(context).await)
            }
            ToolKind::Unknown { name, .. } => {
                warn!(call_id, tool = %name, "Unknown client tool requested");
                ToolResult::failure(&call.id, format!("unknown tool: {name}"))
            }
            ToolKind::TransferCall { .. } | ToolKind::EndCall { .. } => ToolResult::failure(
                &call.id,
                format!("{} is handled by the call bridge", call.kind.name()),
            ),
        }
    }

    /// Look a customer up by phone number, falling back to policy number.
    pub async fn lookup(
        &self,
        phone_number: Option<&str>,
        policy_number: Option<&str>,
    ) -> Result<LookupOutcome, DomainError> {
        if phone_number.is_none() && policy_number.is_none() {
            return Err(DomainError::Validation(
                "phone_number or policy_number is required".into(),
            ));
        }

        let mut customer = None;
        if let Some(phone) = phone_number {
            customer = self.directory.find_by_phone(phone).await?;
        }
        if customer.is_none() {
            if let Some(policy) = policy_number {
                customer = self.directory.find_by_policy(policy).await?;
            }
        }

        Ok(match customer {
            Some(customer) => LookupOutcome {
                found: true,
                message: format!(
                    "Customer {} has {} policies",
                    customer.full_name,
                    customer.policies.len()
                ),
                customer: Some(customer),
            },
            None => LookupOutcome {
                found: false,
                customer: None,
                message: "No customer found".into(),
            },
        })
    }

    /// Save a handoff context. Always reports success.
    pub async fn save_context(&self, context: HandoffContext) -> Value {
        let key = context
            .call_id
            .clone()
            .or_else(|| context.phone_number.clone())
            .unwrap_or_else(|| format!("context-{}", context.saved_at.timestamp_millis()));

        if let Some(contact_center) = &self.contact_center {
            let note = InteractionLog {
                call_id: key.clone(),
                phone_number: context.phone_number.clone().unwrap_or_default(),
                transcript: String::new(),
                summary: context.summary.clone(),
                duration_secs: 0,
                outcome: "context_saved".into(),
                recorded_at: context.saved_at,
            };
            best_effort("save_context.log_interaction", contact_center.log_interaction(&note))
                .await;
        }

        self.contexts.save(key.clone(), context);
        info!(key = %key, "📝 Handoff context saved");
        json!({ "success": true, "message": "Context saved" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::directory::JsonCustomerDirectory;
    use async_trait::async_trait;
    use telebridge::{PolicySummary, RealtimeAgent, SkillTransfer};

    struct FailingContactCenter;

    #[async_trait]
    impl ContactCenter for FailingContactCenter {
        async fn list_agents(&self, _: Option<&str>) -> Result<Vec<RealtimeAgent>, DomainError> {
            Ok(Vec::new())
        }
        async fn transfer_to_skill(&self, _: &SkillTransfer) -> Result<(), DomainError> {
            Ok(())
        }
        async fn log_interaction(&self, _: &InteractionLog) -> Result<(), DomainError> {
            Err(DomainError::ExternalService("down".into()))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    fn executor() -> ToolExecutor {
        let directory = JsonCustomerDirectory::from_records(vec![CustomerRecord {
            customer_id: "C-1".into(),
            full_name: "Laura Gómez".into(),
            phone_number: "+57 300 111 2233".into(),
            document_id: None,
            policies: vec![PolicySummary {
                policy_number: "POL-77".into(),
                product: "Autos".into(),
                status: "active".into(),
                open_claims: 1,
            }],
        }]);
        ToolExecutor::new(Arc::new(directory), Arc::new(ContextStore::new()))
    }

    #[tokio::test]
    async fn test_lookup_uses_caller_when_no_phone_given() {
        let call = ToolCall::from_wire("t1", "lookup_policy", &json!({}));
        let result = executor().execute(&call, "call-1", "3001112233").await;

        assert!(!result.is_error);
        assert_eq!(result.tool_call_id, "t1");
        assert_eq!(result.result["found"], true);
        assert_eq!(result.result["customer"]["customer_id"], "C-1");
    }

    #[tokio::test]
    async fn test_lookup_by_policy_fallback() {
        let outcome = executor()
            .lookup(Some("999"), Some("POL-77"))
            .await
            .unwrap();
        assert!(outcome.found);
    }

    #[tokio::test]
    async fn test_lookup_requires_a_key() {
        let err = executor().lookup(None, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let call = ToolCall::from_wire("t2", "teleport", &json!({}));
        let result = executor().execute(&call, "call-1", "300").await;
        assert!(result.is_error);
    }

    #[test]
    fn test_context_store_evicts_old_entries() {
        let store = ContextStore::with_retention(Duration::from_secs(60));
        let mut stale = HandoffContext::new("old call");
        stale.saved_at = Utc::now() - chrono::Duration::minutes(5);
        store.entries.insert("3001112233".into(), stale);
        assert!(store.get("3001112233").is_none());

        for i in 0..100 {
            store.save(format!("context-{i}"), HandoffContext::new("fresh"));
        }
        assert_eq!(store.len(), 100);
        assert!(store.take("context-7").is_some());
        assert_eq!(store.len(), 99);
    }

    #[test]
    fn test_context_store_sweeps_on_save() {
        let store = ContextStore::with_retention(Duration::from_millis(20));
        store.save("a", HandoffContext::new("first"));
        std::thread::sleep(Duration::from_millis(40));
        store.save("b", HandoffContext::new("second"));
        assert_eq!(store.len(), 1);
        assert!(store.get("b").is_some());
    }

    #[tokio::test]
    async fn test_save_context_succeeds_when_logging_fails() {
        let executor = executor().with_contact_center(Arc::new(FailingContactCenter));
        let call = ToolCall::from_wire(
            "t3",
            "save_context",
            &json!({"summary": "choque leve", "department": "AUTOS"}),
        );

        let result = executor.execute(&call, "call-9", "3001112233").await;

        assert!(!result.is_error);
        assert_eq!(result.result["success"], true);
        let saved = executor.contexts().get("call-9").unwrap();
        assert_eq!(saved.department.as_deref(), Some("AUTOS"));
        assert_eq!(saved.phone_number.as_deref(), Some("3001112233"));
    }
}
