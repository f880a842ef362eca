//! Conversational Agent Port
//!
//! A connection to the conversational-AI agent for one call. Adapters own the
//! websocket; the bridge only sees typed commands and events over channels.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::entities::ToolCall;
use crate::domain::errors::DomainError;

/// Correlation data sent with the conversation initiation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub call_id: String,
    pub caller: String,
    pub called_number: Option<String>,
}

/// Result of a client tool call, correlated by `tool_call_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub result: Value,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, result: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result,
            is_error: false,
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result: Value::String(message.into()),
            is_error: true,
        }
    }
}

/// Bridge → agent
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCommand {
    /// Linear PCM 16 kHz frame
    Audio(Vec<u8>),
    ToolResult(ToolResult),
    Close,
}

/// Agent → bridge
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Linear PCM 16 kHz speech from the agent
    Audio(Vec<u8>),
    UserTranscript { text: String, is_final: bool },
    AgentResponse(String),
    ToolCall(ToolCall),
    ConversationEnded,
    Disconnected { code: Option<u16>, reason: String },
    Error(String),
}

/// Live agent connection handed to a bridge
#[derive(Debug)]
pub struct AgentLink {
    pub commands: mpsc::Sender<AgentCommand>,
    pub events: mpsc::Receiver<AgentEvent>,
}

/// Opens one agent connection per call; connections are never reused.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Connect and send the initiation message.
    ///
    /// The link is ready as soon as this returns; handshake acknowledgements
    /// arriving later are informational.
    async fn connect(&self, context: &ConversationContext) -> Result<AgentLink, DomainError>;

    /// Get the connector name (e.g., "elevenlabs")
    fn name(&self) -> &str;
}
