//! Audio Bridge
//!
//! Links one carrier media stream to one conversational-agent connection.
//! Audio is converted and forwarded per frame without awaiting; frames that
//! cannot be delivered immediately are dropped.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use telebridge::domain::services::audio;
use telebridge::ports::{AgentCommand, AgentConnector, AgentEvent, AgentLink, ConversationContext};
use telebridge::{CallSession, CallState, DomainError, ToolCall, ToolKind, ToolResult};

use super::tools::ToolExecutor;
use crate::adapters::media_stream::{MediaStreamProtocol, MediaTrack, StreamStart, TelephonyEvent};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub connect_timeout: Duration,
    /// Delay between an end-call tool call and hanging up
    pub end_call_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            end_call_grace: Duration::from_secs(5),
        }
    }
}

/// Events published by a bridge
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    StreamStarted { stream_id: String },
    UserTranscript(String),
    AgentResponse(String),
    Transfer {
        department: String,
        reason: Option<String>,
    },
    Stopped,
}

#[derive(Default)]
struct Links {
    stream_id: Option<String>,
    call_handle: Option<String>,
    telephony: Option<mpsc::Sender<String>>,
    agent: Option<mpsc::Sender<AgentCommand>>,
}

pub struct AudioBridge {
    session: Arc<CallSession>,
    protocol: MediaStreamProtocol,
    connector: Arc<dyn AgentConnector>,
    tools: Arc<ToolExecutor>,
    config: BridgeConfig,
    links: Mutex<Links>,
    streaming: AtomicBool,
    stopped: AtomicBool,
    events: broadcast::Sender<BridgeEvent>,
    shutdown: watch::Sender<bool>,
}

impl AudioBridge {
    /// `telephony` receives outbound frames for the carrier socket writer.
    pub fn new(
        session: Arc<CallSession>,
        protocol: MediaStreamProtocol,
        telephony: mpsc::Sender<String>,
        connector: Arc<dyn AgentConnector>,
        tools: Arc<ToolExecutor>,
        config: BridgeConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            session,
            protocol,
            connector,
            tools,
            config,
            links: Mutex::new(Links {
                telephony: Some(telephony),
                ..Links::default()
            }),
            streaming: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            events,
            shutdown,
        })
    }

    pub fn session(&self) -> &Arc<CallSession> {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Resolves once the bridge has stopped.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    pub fn call_handle(&self) -> Option<String> {
        self.links.lock().call_handle.clone()
    }

    pub fn stream_id(&self) -> Option<String> {
        self.links.lock().stream_id.clone()
    }

    /// Connect the agent leg and start pumping its events.
    ///
    /// On failure the session is ended and the error returned; the caller
    /// closes the carrier socket.
    pub async fn start(self: &Arc<Self>) -> Result<(), DomainError> {
        let context = ConversationContext {
            call_id: self.session.call_id().to_string(),
            caller: self.session.caller().to_string(),
            called_number: self.session.called_number().map(str::to_string),
        };

        let link = match timeout(self.config.connect_timeout, self.connector.connect(&context)).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                error!(call_id = %context.call_id, error = %e, "❌ Agent connection failed");
                self.session.end();
                return Err(e);
            }
            Err(_) => {
                error!(
                    call_id = %context.call_id,
                    timeout_ms = self.config.connect_timeout.as_millis() as u64,
                    "❌ Agent connection timed out"
                );
                self.session.end();
                return Err(DomainError::Timeout(format!(
                    "agent connection for call {} after {:?}",
                    context.call_id, self.config.connect_timeout
                )));
            }
        };

        let AgentLink { commands, events } = link;
        self.links.lock().agent = Some(commands);
        self.session.set_state(CallState::Connected);
        info!(call_id = %context.call_id, connector = self.connector.name(), "🔗 Bridge connected to agent");

        tokio::spawn(Arc::clone(self).pump_agent_events(events));
        Ok(())
    }

    async fn pump_agent_events(self: Arc<Self>, mut events: mpsc::Receiver<AgentEvent>) {
        let mut shutdown = self.shutdown_signal();
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_agent_event(event).await,
                    None => {
                        if !self.is_stopped() {
                            warn!(call_id = %self.session.call_id(), "Agent event stream closed");
                            self.stop();
                        }
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Handle one raw carrier frame. Malformed frames are logged and dropped.
    pub fn handle_telephony_message(&self, raw: &str) {
        match self.protocol.decode(raw) {
            Ok(event) => self.handle_telephony_event(event),
            Err(e) => warn!(call_id = %self.session.call_id(), error = %e, "Dropping telephony frame"),
        }
    }

    pub fn handle_telephony_event(&self, event: TelephonyEvent) {
        match event {
            TelephonyEvent::Connected => debug!(call_id = %self.session.call_id(), "Media stream connected"),
            TelephonyEvent::Start(start) => self.on_stream_start(start),
            TelephonyEvent::Media { track, payload } => self.on_inbound_media(track, &payload),
            TelephonyEvent::Stop => {
                self.streaming.store(false, Ordering::SeqCst);
                info!(call_id = %self.session.call_id(), "Media stream stopped");
            }
            TelephonyEvent::Mark { name } => {
                trace!(call_id = %self.session.call_id(), mark = ?name, "Media mark");
            }
            TelephonyEvent::Other(kind) => {
                debug!(call_id = %self.session.call_id(), kind = %kind, "Ignoring media event");
            }
        }
    }

    fn on_stream_start(&self, start: StreamStart) {
        if self.is_stopped() {
            return;
        }
        {
            let mut links = self.links.lock();
            links.stream_id = Some(start.stream_id.clone());
            links.call_handle = start.call_handle.clone();
        }
        self.streaming.store(true, Ordering::SeqCst);
        self.session.set_state(CallState::Streaming);
        info!(
            call_id = %self.session.call_id(),
            stream_id = %start.stream_id,
            provider = %self.protocol.provider(),
            "▶️ Media stream started"
        );
        let _ = self.events.send(BridgeEvent::StreamStarted {
            stream_id: start.stream_id,
        });
    }

    fn on_inbound_media(&self, track: MediaTrack, payload: &str) {
        if track != MediaTrack::Inbound {
            return;
        }
        self.session.record_audio_received();

        let mulaw = match B64.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(call_id = %self.session.call_id(), error = %e, "Invalid media payload");
                return;
            }
        };
        let pcm = audio::telephony_to_agent(&mulaw);

        let links = self.links.lock();
        match links.agent.as_ref() {
            Some(agent) => {
                if let Err(e) = agent.try_send(AgentCommand::Audio(pcm)) {
                    trace!(call_id = %self.session.call_id(), error = %e, "Dropping inbound frame");
                }
            }
            None => trace!(call_id = %self.session.call_id(), "Agent not ready, dropping inbound frame"),
        }
    }

    fn on_agent_audio(&self, pcm: &[u8]) {
        if !self.is_streaming() {
            trace!(call_id = %self.session.call_id(), "Not streaming, dropping agent audio");
            return;
        }
        let payload = B64.encode(audio::agent_to_telephony(pcm));

        let links = self.links.lock();
        let Some(telephony) = links.telephony.as_ref() else {
            return;
        };
        let frame = self.protocol.encode_media(links.stream_id.as_deref(), &payload);
        match telephony.try_send(frame) {
            Ok(()) => self.session.record_audio_sent(),
            Err(e) => trace!(call_id = %self.session.call_id(), error = %e, "Dropping outbound frame"),
        }
    }

    async fn handle_agent_event(self: &Arc<Self>, event: AgentEvent) {
        let call_id = self.session.call_id();
        match event {
            AgentEvent::Audio(pcm) => self.on_agent_audio(&pcm),
            AgentEvent::UserTranscript { text, is_final } => {
                if is_final {
                    self.session.record_user_utterance();
                    debug!(call_id, text = %text, "User said");
                    let _ = self.events.send(BridgeEvent::UserTranscript(text));
                }
            }
            AgentEvent::AgentResponse(text) => {
                self.session.record_agent_response();
                debug!(call_id, text = %text, "Agent said");
                let _ = self.events.send(BridgeEvent::AgentResponse(text));
            }
            AgentEvent::ToolCall(call) => {
                // tool results may wait on a full command queue; audio must not
                let bridge = Arc::clone(self);
                tokio::spawn(async move { bridge.on_tool_call(call).await });
            }
            AgentEvent::ConversationEnded => {
                info!(call_id, "Agent ended the conversation");
                self.stop();
            }
            AgentEvent::Disconnected { code, reason } => {
                if !self.session.is_ended() {
                    warn!(call_id, code = ?code, reason = %reason, "Agent disconnected, ending call");
                    self.stop();
                }
            }
            AgentEvent::Error(message) => {
                warn!(call_id, error = %message, "Agent reported an error");
            }
        }
    }

    async fn on_tool_call(self: &Arc<Self>, call: ToolCall) {
        self.session.record_tool_call();
        let call_id = self.session.call_id();
        info!(call_id, tool = call.kind.name(), tool_call_id = %call.id, "🛠️ Agent tool call");

        let result = match &call.kind {
            ToolKind::TransferCall { department, reason } => {
                if self.session.set_transfer(department.clone(), reason.clone()) {
                    let _ = self.events.send(BridgeEvent::Transfer {
                        department: department.clone(),
                        reason: reason.clone(),
                    });
                }
                ToolResult::success(&call.id, json!({ "status": "transferring", "department": department }))
            }
            ToolKind::EndCall { reason } => {
                info!(call_id, reason = ?reason, "Ending call after grace period");
                self.stop_after(self.config.end_call_grace);
                ToolResult::success(&call.id, json!({ "status": "ending" }))
            }
            _ => {
                self.tools
                    .execute(&call, call_id, self.session.caller())
                    .await
            }
        };

        let agent = self.links.lock().agent.clone();
        match agent {
            Some(agent) => {
                if agent.send(AgentCommand::ToolResult(result)).await.is_err() {
                    warn!(call_id, tool_call_id = %call.id, "Agent gone before tool result was sent");
                }
            }
            None => debug!(call_id, tool_call_id = %call.id, "Bridge stopped, tool result dropped"),
        }
    }

    /// Stop after `delay`, unless stopped earlier.
    pub fn stop_after(self: &Arc<Self>, delay: Duration) {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bridge.stop();
        });
    }

    /// Tear the call down. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.streaming.store(false, Ordering::SeqCst);

        let (agent, telephony) = {
            let mut links = self.links.lock();
            (links.agent.take(), links.telephony.take())
        };
        if let Some(agent) = agent {
            let _ = agent.try_send(AgentCommand::Close);
        }
        // dropping the last sender closes the carrier socket writer
        drop(telephony);

        self.session.end();
        let _ = self.shutdown.send(true);
        let _ = self.events.send(BridgeEvent::Stopped);
        info!(call_id = %self.session.call_id(), "⏹️ Bridge stopped");
    }
}
