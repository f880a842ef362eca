//! In-memory port implementations shared by application tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use telebridge::ports::{
    AgentCommand, AgentConnector, AgentEvent, AgentLink, CallTransferer, ContactCenter,
    ConversationContext,
};
use telebridge::{
    DomainError, InteractionLog, RealtimeAgent, SkillTransfer, TelephonyProvider,
};

use super::tools::{ContextStore, ToolExecutor};
use crate::adapters::directory::JsonCustomerDirectory;

/// Hands out one pre-built channel link, then fails.
pub struct ChannelConnector {
    link: Mutex<Option<AgentLink>>,
}

impl ChannelConnector {
    /// Connector plus the agent-side ends of its link.
    pub fn new() -> (Self, mpsc::Receiver<AgentCommand>, mpsc::Sender<AgentEvent>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        let connector = Self {
            link: Mutex::new(Some(AgentLink {
                commands: command_tx,
                events: event_rx,
            })),
        };
        (connector, command_rx, event_tx)
    }

    pub fn failing() -> Self {
        Self {
            link: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AgentConnector for ChannelConnector {
    async fn connect(&self, _: &ConversationContext) -> Result<AgentLink, DomainError> {
        self.link
            .lock()
            .take()
            .ok_or_else(|| DomainError::connection("agent unavailable"))
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Contact center that records every call in order.
#[derive(Default)]
pub struct RecordingContactCenter {
    pub agents: Mutex<Vec<RealtimeAgent>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub transfers: Mutex<Vec<SkillTransfer>>,
    pub logs: Mutex<Vec<InteractionLog>>,
    pub fail_listing: AtomicBool,
    pub fail_transfer: AtomicBool,
    pub fail_logging: AtomicBool,
    pub unhealthy: AtomicBool,
    /// `transfer_to_skill` never completes
    pub hang_transfer: AtomicBool,
    /// The next `list_agents` sleeps this long, then fails
    pub stall_next_listing: Mutex<Option<Duration>>,
    pub listed_at: Mutex<Vec<Instant>>,
}

impl RecordingContactCenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_on_call(&self, agents: &[(&str, &str)]) {
        *self.agents.lock() = agents
            .iter()
            .map(|(agent_id, phone)| RealtimeAgent {
                agent_id: agent_id.to_string(),
                name: None,
                status: "Talk".into(),
                phone_number: Some(phone.to_string()),
                skill_id: None,
            })
            .collect();
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ContactCenter for RecordingContactCenter {
    async fn list_agents(&self, status: Option<&str>) -> Result<Vec<RealtimeAgent>, DomainError> {
        self.calls.lock().push("list_agents");
        self.listed_at.lock().push(Instant::now());
        let stall = self.stall_next_listing.lock().take();
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
            return Err(DomainError::Timeout("listing stalled".into()));
        }
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(DomainError::ExternalService("listing unavailable".into()));
        }
        let agents = self.agents.lock().clone();
        Ok(agents
            .into_iter()
            .filter(|a| status.map_or(true, |s| a.status.eq_ignore_ascii_case(s)))
            .collect())
    }

    async fn transfer_to_skill(&self, transfer: &SkillTransfer) -> Result<(), DomainError> {
        self.calls.lock().push("transfer_to_skill");
        tokio::task::yield_now().await;
        if self.hang_transfer.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_transfer.load(Ordering::SeqCst) {
            return Err(DomainError::ExternalService("transfer rejected".into()));
        }
        self.transfers.lock().push(transfer.clone());
        Ok(())
    }

    async fn log_interaction(&self, log: &InteractionLog) -> Result<(), DomainError> {
        self.calls.lock().push("log_interaction");
        if self.fail_logging.load(Ordering::SeqCst) {
            return Err(DomainError::ExternalService("logging unavailable".into()));
        }
        self.logs.lock().push(log.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(!self.unhealthy.load(Ordering::SeqCst))
    }
}

/// Call transferer that records `(call_handle, target)` pairs.
#[derive(Default)]
pub struct RecordingTransferer {
    pub transfers: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl CallTransferer for RecordingTransferer {
    async fn transfer(&self, call_handle: &str, target: &str) -> Result<(), DomainError> {
        self.transfers
            .lock()
            .push((call_handle.to_string(), target.to_string()));
        Ok(())
    }

    fn provider(&self) -> TelephonyProvider {
        TelephonyProvider::Telnyx
    }
}

pub fn tool_executor() -> Arc<ToolExecutor> {
    Arc::new(ToolExecutor::new(
        Arc::new(JsonCustomerDirectory::empty()),
        Arc::new(ContextStore::new()),
    ))
}
