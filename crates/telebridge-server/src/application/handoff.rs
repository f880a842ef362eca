//! Handoff Coordinator
//!
//! Follows a bridge's events, places carrier-level transfers when the agent
//! asks for one and writes the interaction log once the bridge stops.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use telebridge::domain::services::handoff::{build_summary, SummaryInput};
use telebridge::ports::{CallTransferer, ContactCenter};
use telebridge::InteractionLog;

use super::best_effort::best_effort;
use super::bridge::{AudioBridge, BridgeEvent};
use super::tools::ContextStore;

/// Department to SIP target mapping for carrier transfers
#[derive(Debug, Clone, Default)]
pub struct TransferRouting {
    department_skills: HashMap<String, String>,
    sip_domain: Option<String>,
    default_skill: Option<String>,
}

impl TransferRouting {
    pub fn new(
        department_skills: HashMap<String, String>,
        sip_domain: Option<String>,
        default_skill: Option<String>,
    ) -> Self {
        let department_skills = department_skills
            .into_iter()
            .map(|(department, skill)| (department.to_uppercase(), skill))
            .collect();
        Self {
            department_skills,
            sip_domain,
            default_skill,
        }
    }

    /// Parse `PC=101,AUTOS=102` into a department map. Malformed pairs are skipped.
    pub fn parse_department_skills(raw: &str) -> HashMap<String, String> {
        raw.split(',')
            .filter_map(|pair| {
                let (department, skill) = pair.split_once('=')?;
                let (department, skill) = (department.trim(), skill.trim());
                if department.is_empty() || skill.is_empty() {
                    return None;
                }
                Some((department.to_uppercase(), skill.to_string()))
            })
            .collect()
    }

    pub fn skill_for(&self, department: &str) -> Option<String> {
        self.department_skills
            .get(&department.trim().to_uppercase())
            .or(self.default_skill.as_ref())
            .cloned()
    }

    /// `sip:<skill>@<domain>` for a department, when both parts are known.
    pub fn sip_target(&self, department: &str) -> Option<String> {
        let domain = self.sip_domain.as_deref()?;
        let skill = self.skill_for(department)?;
        Some(format!("sip:{}@{}", skill, domain))
    }
}

/// Per-call follower of [`AudioBridge`] events
pub struct HandoffCoordinator {
    bridge: Arc<AudioBridge>,
    routing: TransferRouting,
    transferer: Option<Arc<dyn CallTransferer>>,
    contact_center: Option<Arc<dyn ContactCenter>>,
    contexts: Option<Arc<ContextStore>>,
}

#[derive(Default)]
struct CallLog {
    transcript: Vec<String>,
    transfer: Option<(String, Option<String>)>,
    transferred: bool,
}

impl HandoffCoordinator {
    pub fn new(bridge: Arc<AudioBridge>, routing: TransferRouting) -> Self {
        Self {
            bridge,
            routing,
            transferer: None,
            contact_center: None,
            contexts: None,
        }
    }

    pub fn with_transferer(mut self, transferer: Arc<dyn CallTransferer>) -> Self {
        self.transferer = Some(transferer);
        self
    }

    pub fn with_contact_center(mut self, contact_center: Arc<dyn ContactCenter>) -> Self {
        self.contact_center = Some(contact_center);
        self
    }

    pub fn with_contexts(mut self, contexts: Arc<ContextStore>) -> Self {
        self.contexts = Some(contexts);
        self
    }

    /// Subscribe now and follow the bridge on a background task.
    ///
    /// Call before [`AudioBridge::start`] so no event is missed.
    pub fn spawn(self) -> JoinHandle<()> {
        let events = self.bridge.subscribe();
        tokio::spawn(self.run(events))
    }

    async fn run(self, mut events: broadcast::Receiver<BridgeEvent>) {
        let call_id = self.bridge.session().call_id().to_string();
        let mut log = CallLog::default();

        loop {
            match events.recv().await {
                Ok(BridgeEvent::StreamStarted { stream_id }) => {
                    debug!(call_id = %call_id, stream_id = %stream_id, "Handoff coordinator attached");
                }
                Ok(BridgeEvent::UserTranscript(text)) => {
                    log.transcript.push(format!("Caller: {}", text));
                }
                Ok(BridgeEvent::AgentResponse(text)) => {
                    log.transcript.push(format!("Agent: {}", text));
                }
                Ok(BridgeEvent::Transfer { department, reason }) => {
                    if log.transfer.is_some() {
                        debug!(call_id = %call_id, "Transfer already requested, ignoring");
                        continue;
                    }
                    log.transferred = self.transfer(&call_id, &department).await;
                    log.transfer = Some((department, reason));
                }
                Ok(BridgeEvent::Stopped) => {
                    self.write_log(&call_id, &log).await;
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(call_id = %call_id, skipped, "Handoff coordinator lagged behind bridge events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn transfer(&self, call_id: &str, department: &str) -> bool {
        let Some(transferer) = &self.transferer else {
            warn!(call_id, department, "No call control configured - transfer skipped");
            return false;
        };
        let Some(call_handle) = self.bridge.call_handle() else {
            warn!(call_id, department, "Carrier call handle unknown - transfer skipped");
            return false;
        };
        let Some(target) = self.routing.sip_target(department) else {
            warn!(call_id, department, "No SIP route for department - transfer skipped");
            return false;
        };

        match transferer.transfer(&call_handle, &target).await {
            Ok(()) => {
                info!(
                    call_id,
                    provider = %transferer.provider(),
                    target = %target,
                    "📞 Call transferred to {}",
                    department
                );
                true
            }
            Err(e) => {
                error!(call_id, target = %target, error = %e, "Carrier transfer failed");
                false
            }
        }
    }

    async fn write_log(&self, call_id: &str, log: &CallLog) {
        let Some(contact_center) = &self.contact_center else {
            return;
        };

        let session = self.bridge.session();
        let metadata = session.metadata();
        let transcript = log.transcript.join("\n");
        let reason = match &log.transfer {
            Some((department, Some(reason))) => format!("{} ({})", reason, department),
            Some((department, None)) => format!("transfer to {}", department),
            None => "completed by assistant".to_string(),
        };
        let duration_ms = metadata.duration_ms.unwrap_or_default();

        let mut summary = build_summary(&SummaryInput {
            phone_number: &metadata.caller,
            bot_duration: chrono::Duration::milliseconds(duration_ms),
            reason: &reason,
            transcript: &transcript,
        });
        let stats = session.stats();
        summary.push_str(&format!(
            "\nStats: {} caller utterances, {} agent responses, {} tool calls",
            stats.user_utterances, stats.agent_responses, stats.tool_calls
        ));
        if let Some(context) = self.contexts.as_ref().and_then(|c| c.take(call_id)) {
            summary.push_str("\nAgent notes: ");
            summary.push_str(&context.summary);
            if let Some(notes) = context.notes.filter(|n| !n.is_empty()) {
                summary.push('\n');
                summary.push_str(&notes);
            }
        }

        let outcome = match (&log.transfer, log.transferred) {
            (Some(_), true) => "transferred",
            (Some(_), false) => "transfer_failed",
            (None, _) => "completed",
        };

        let entry = InteractionLog {
            call_id: call_id.to_string(),
            phone_number: metadata.caller.clone(),
            transcript,
            summary,
            duration_secs: duration_ms / 1000,
            outcome: outcome.to_string(),
            recorded_at: Utc::now(),
        };
        best_effort("handoff.log_interaction", contact_center.log_interaction(&entry)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::media_stream::MediaStreamProtocol;
    use crate::application::bridge::BridgeConfig;
    use crate::application::testing::{
        tool_executor, ChannelConnector, RecordingContactCenter, RecordingTransferer,
    };
    use serde_json::json;
    use std::time::Duration;
    use telebridge::ports::AgentEvent;
    use telebridge::{CallSession, HandoffContext, TelephonyProvider, ToolCall};
    use tokio::sync::mpsc;

    fn routing() -> TransferRouting {
        TransferRouting::new(
            TransferRouting::parse_department_skills("pc=101, AUTOS=102"),
            Some("pbx.example.com".into()),
            Some("100".into()),
        )
    }

    #[test]
    fn test_parse_department_skills() {
        let skills = TransferRouting::parse_department_skills("PC=101,autos = 102,broken,=5,X=");
        assert_eq!(skills.len(), 2);
        assert_eq!(skills["PC"], "101");
        assert_eq!(skills["AUTOS"], "102");
    }

    #[test]
    fn test_sip_target_resolution() {
        let routing = routing();
        assert_eq!(routing.sip_target("pc").as_deref(), Some("sip:101@pbx.example.com"));
        assert_eq!(routing.sip_target("Autos").as_deref(), Some("sip:102@pbx.example.com"));
        assert_eq!(routing.sip_target("vida").as_deref(), Some("sip:100@pbx.example.com"));

        let no_domain = TransferRouting::new(HashMap::new(), None, Some("100".into()));
        assert_eq!(no_domain.sip_target("pc"), None);
    }

    #[tokio::test]
    async fn test_transfer_then_log_on_stop() {
        let (telephony_tx, _telephony_rx) = mpsc::channel(64);
        let (connector, mut agent_commands, agent_events) = ChannelConnector::new();
        let tools = tool_executor();
        let contexts = tools.contexts().clone();
        let session = Arc::new(CallSession::new("abc123", "+573001112233", None));
        let bridge = AudioBridge::new(
            session,
            MediaStreamProtocol::new(TelephonyProvider::Telnyx),
            telephony_tx,
            Arc::new(connector),
            tools,
            BridgeConfig::default(),
        );

        let transferer = Arc::new(RecordingTransferer::default());
        let contact_center = RecordingContactCenter::new();
        let task = HandoffCoordinator::new(bridge.clone(), routing())
            .with_transferer(transferer.clone())
            .with_contact_center(contact_center.clone())
            .with_contexts(contexts.clone())
            .spawn();

        bridge.start().await.unwrap();
        bridge.handle_telephony_message(
            &json!({
                "event": "start",
                "stream_id": "st-1",
                "start": {
                    "call_control_id": "v3:ctrl",
                    "custom_parameters": {"call_id": "abc123"}
                }
            })
            .to_string(),
        );

        agent_events
            .send(AgentEvent::UserTranscript {
                text: "hola".into(),
                is_final: true,
            })
            .await
            .unwrap();
        agent_events
            .send(AgentEvent::AgentResponse("Con gusto".into()))
            .await
            .unwrap();
        contexts.save("abc123", HandoffContext::new("Siniestro de auto"));
        agent_events
            .send(AgentEvent::ToolCall(ToolCall::from_wire(
                "tc-1",
                "transfer_call",
                &json!({"department": "PC", "reason": "siniestro"}),
            )))
            .await
            .unwrap();
        // tool result acknowledges the transfer
        tokio::time::timeout(Duration::from_secs(1), agent_commands.recv())
            .await
            .unwrap()
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while transferer.transfers.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(
            transferer.transfers.lock()[0],
            ("v3:ctrl".to_string(), "sip:101@pbx.example.com".to_string())
        );

        bridge.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        let logs = contact_center.logs.lock();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].call_id, "abc123");
        assert_eq!(logs[0].outcome, "transferred");
        assert_eq!(logs[0].transcript, "Caller: hola\nAgent: Con gusto");
        assert!(logs[0].summary.contains("Transfer reason: siniestro (PC)"));
        assert!(logs[0].summary.contains("Agent notes: Siniestro de auto"));
        assert!(contexts.get("abc123").is_none());
    }

    #[tokio::test]
    async fn test_stop_without_transfer_logs_completed() {
        let (telephony_tx, _telephony_rx) = mpsc::channel(64);
        let (connector, _agent_commands, _agent_events) = ChannelConnector::new();
        let session = Arc::new(CallSession::new("xyz", "+15550001111", None));
        let bridge = AudioBridge::new(
            session,
            MediaStreamProtocol::new(TelephonyProvider::Twilio),
            telephony_tx,
            Arc::new(connector),
            tool_executor(),
            BridgeConfig::default(),
        );
        let contact_center = RecordingContactCenter::new();
        contact_center
            .fail_logging
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let task = HandoffCoordinator::new(bridge.clone(), TransferRouting::default())
            .with_contact_center(contact_center.clone())
            .spawn();

        bridge.start().await.unwrap();
        bridge.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(contact_center.calls(), vec!["log_interaction"]);
    }
}
