//! ElevenLabs conversational agent connector
//!
//! One websocket per call. A reader task decodes server messages into
//! [`AgentEvent`]s and answers pings; a writer task drains bridge commands
//! and pongs onto the socket.

pub mod protocol;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use telebridge::ports::{AgentCommand, AgentConnector, AgentEvent, AgentLink, ConversationContext};
use telebridge::DomainError;

use protocol::ServerMessage;

pub const DEFAULT_WS_URL: &str = "wss://api.elevenlabs.io/v1/convai/conversation";

const COMMAND_BUFFER: usize = 256;
const EVENT_BUFFER: usize = 256;
const PONG_BUFFER: usize = 8;

type AgentSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub agent_id: String,
    pub ws_url: String,
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            agent_id: agent_id.into(),
            ws_url: DEFAULT_WS_URL.to_string(),
        }
    }

    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}?agent_id={}", self.ws_url, self.agent_id)
    }
}

pub struct ElevenLabsConnector {
    config: ElevenLabsConfig,
}

impl ElevenLabsConnector {
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AgentConnector for ElevenLabsConnector {
    async fn connect(&self, context: &ConversationContext) -> Result<AgentLink, DomainError> {
        let mut request = self
            .config
            .endpoint()
            .into_client_request()
            .map_err(|e| DomainError::connection(format!("invalid agent endpoint: {e}")))?;
        let api_key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|e| DomainError::connection(format!("invalid agent API key: {e}")))?;
        request.headers_mut().insert("xi-api-key", api_key);

        let (socket, _) = connect_async(request)
            .await
            .map_err(|e| DomainError::connection(format!("agent websocket: {e}")))?;
        let (mut sink, stream) = socket.split();

        sink.send(Message::Text(protocol::initiation_message(context).into()))
            .await
            .map_err(|e| DomainError::connection(format!("agent initiation: {e}")))?;

        info!(call_id = %context.call_id, agent_id = %self.config.agent_id, "🤖 Agent connected");

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (pong_tx, pong_rx) = mpsc::channel(PONG_BUFFER);

        tokio::spawn(write_loop(sink, command_rx, pong_rx, context.call_id.clone()));
        tokio::spawn(read_loop(stream, event_tx, pong_tx, context.call_id.clone()));

        Ok(AgentLink {
            commands: command_tx,
            events: event_rx,
        })
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

async fn write_loop(
    mut sink: SplitSink<AgentSocket, Message>,
    mut commands: mpsc::Receiver<AgentCommand>,
    mut pongs: mpsc::Receiver<u64>,
    call_id: String,
) {
    loop {
        let frame = tokio::select! {
            biased;
            Some(event_id) = pongs.recv() => protocol::pong_message(event_id),
            command = commands.recv() => match command {
                Some(AgentCommand::Close) | None => break,
                Some(command) => match protocol::encode_command(&command) {
                    Some(frame) => frame,
                    None => continue,
                },
            },
        };

        if let Err(e) = sink.send(Message::Text(frame.into())).await {
            warn!(call_id = %call_id, error = %e, "Agent websocket write failed");
            break;
        }
    }

    let _ = sink.close().await;
    debug!(call_id = %call_id, "Agent writer finished");
}

async fn read_loop(
    mut stream: SplitStream<AgentSocket>,
    events: mpsc::Sender<AgentEvent>,
    pongs: mpsc::Sender<u64>,
    call_id: String,
) {
    let disconnected = loop {
        let message = match stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                let _ = events.send(AgentEvent::Error(e.to_string())).await;
                break AgentEvent::Disconnected {
                    code: None,
                    reason: e.to_string(),
                };
            }
            None => {
                break AgentEvent::Disconnected {
                    code: None,
                    reason: "stream ended".into(),
                }
            }
        };

        match message {
            Message::Text(text) => match protocol::decode_server_message(text.as_str()) {
                Ok(ServerMessage::Event(event)) => {
                    if events.send(event).await.is_err() {
                        debug!(call_id = %call_id, "Bridge dropped agent events, stopping reader");
                        return;
                    }
                }
                Ok(ServerMessage::Ping { event_id }) => {
                    if pongs.try_send(event_id).is_err() {
                        warn!(call_id = %call_id, event_id, "Could not queue pong");
                    }
                }
                Ok(ServerMessage::Informational(kind)) => {
                    debug!(call_id = %call_id, kind = %kind, "Agent informational message");
                }
                Ok(ServerMessage::Unknown(kind)) => {
                    warn!(call_id = %call_id, kind = %kind, "Unknown agent message type, ignoring");
                }
                Err(e) => {
                    warn!(call_id = %call_id, error = %e, "Dropping malformed agent message");
                }
            },
            Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (Some(u16::from(f.code)), f.reason.as_str().to_string()))
                    .unwrap_or((None, String::new()));
                break AgentEvent::Disconnected { code, reason };
            }
            Message::Binary(bytes) => {
                debug!(call_id = %call_id, len = bytes.len(), "Ignoring binary agent frame");
            }
            _ => {}
        }
    };

    info!(call_id = %call_id, "Agent websocket closed");
    let _ = events.send(disconnected).await;
}
