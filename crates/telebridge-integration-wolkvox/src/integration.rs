//! Wolkvox implementation of the ContactCenter port

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use telebridge::ports::ContactCenter;
use telebridge::{DomainError, InteractionLog, RealtimeAgent, SkillTransfer};

use crate::client::WolkvoxClient;
use crate::config::WolkvoxConfig;
use crate::error::WolkvoxError;

const REALTIME_AGENTS_PATH: &str = "real_time.php";
const TRANSFER_PATH: &str = "routing.php?api=transfer_skill";
const INTERACTION_LOG_PATH: &str = "crm.php?api=save_interaction";

/// Wolkvox contact center
pub struct WolkvoxContactCenter {
    client: WolkvoxClient,
}

impl WolkvoxContactCenter {
    pub fn new(config: WolkvoxConfig) -> Result<Self, WolkvoxError> {
        Ok(Self {
            client: WolkvoxClient::new(config)?,
        })
    }
}

#[async_trait]
impl ContactCenter for WolkvoxContactCenter {
    async fn list_agents(&self, status: Option<&str>) -> Result<Vec<RealtimeAgent>, DomainError> {
        let data = self
            .client
            .get(REALTIME_AGENTS_PATH, &[("api", "agents")])
            .await?;
        let agents = parse_agents(&data)?;
        debug!(count = agents.len(), "Fetched real-time agents");

        Ok(match status {
            Some(wanted) => agents
                .into_iter()
                .filter(|agent| agent.status.eq_ignore_ascii_case(wanted))
                .collect(),
            None => agents,
        })
    }

    async fn transfer_to_skill(&self, transfer: &SkillTransfer) -> Result<(), DomainError> {
        let body = json!({
            "agent_id": transfer.agent_id,
            "skill_id": transfer.skill_id,
            "customer_phone": transfer.phone_number,
            "comment": transfer.summary,
        });
        self.client.post(TRANSFER_PATH, &body).await?;
        info!(
            skill_id = %transfer.skill_id,
            phone = %transfer.phone_number,
            "🔀 Transferred call to skill"
        );
        Ok(())
    }

    async fn log_interaction(&self, log: &InteractionLog) -> Result<(), DomainError> {
        let body = json!({
            "conn_id": log.call_id,
            "customer_phone": log.phone_number,
            "transcript": log.transcript,
            "summary": log.summary,
            "duration": log.duration_secs,
            "result": log.outcome,
            "date": log.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        self.client.post(INTERACTION_LOG_PATH, &body).await?;
        debug!(call_id = %log.call_id, "Logged interaction");
        Ok(())
    }

    fn name(&self) -> &str {
        "wolkvox"
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        self.client
            .get(REALTIME_AGENTS_PATH, &[("api", "agents")])
            .await?;
        Ok(true)
    }
}

/// Map the real-time agents payload; accepts a bare array or `{agents: [...]}`.
fn parse_agents(data: &Value) -> Result<Vec<RealtimeAgent>, DomainError> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("agents") {
            Some(Value::Array(items)) => items,
            _ => return Err(WolkvoxError::Decode("missing agents array".into()).into()),
        },
        Value::Null => return Ok(Vec::new()),
        _ => return Err(WolkvoxError::Decode("unexpected agents payload".into()).into()),
    };

    Ok(items.iter().filter_map(parse_agent).collect())
}

fn parse_agent(item: &Value) -> Option<RealtimeAgent> {
    let agent_id = text(item, &["agent_id", "id_agent", "id"])?;
    Some(RealtimeAgent {
        agent_id,
        name: text(item, &["agent_name", "name"]),
        status: text(item, &["status", "agent_status", "state"]).unwrap_or_default(),
        phone_number: text(item, &["customer_phone", "phone", "ani"]),
        skill_id: text(item, &["skill_id", "skill"]),
    })
}

fn text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
