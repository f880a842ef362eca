//! ElevenLabs Conversational AI wire protocol
//!
//! Pure encode/decode of the JSON messages exchanged on the agent websocket.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde_json::{json, Value};

use telebridge::ports::{AgentCommand, AgentEvent, ConversationContext};
use telebridge::{DomainError, ToolCall};

/// Messages that need no action
const INFORMATIONAL_TYPES: &[&str] = &[
    "conversation_initiation_metadata",
    "interruption",
    "vad_score",
    "agent_response_correction",
    "internal_tentative_agent_response",
    "tentative_agent_response",
    "contextual_update",
];

/// Decoded server message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Event(AgentEvent),
    /// Must be answered with [`pong_message`]
    Ping { event_id: u64 },
    Informational(String),
    Unknown(String),
}

pub fn initiation_message(context: &ConversationContext) -> String {
    let mut dynamic_variables = json!({
        "call_id": context.call_id,
        "caller": context.caller,
    });
    if let Some(called) = &context.called_number {
        dynamic_variables["called"] = json!(called);
    }
    json!({
        "type": "conversation_initiation_client_data",
        "dynamic_variables": dynamic_variables,
    })
    .to_string()
}

pub fn pong_message(event_id: u64) -> String {
    json!({ "type": "pong", "event_id": event_id }).to_string()
}

/// Wire form of a bridge command; `Close` has none.
pub fn encode_command(command: &AgentCommand) -> Option<String> {
    match command {
        AgentCommand::Audio(pcm) => Some(json!({ "user_audio_chunk": B64.encode(pcm) }).to_string()),
        AgentCommand::ToolResult(result) => {
            let result_text = match &result.result {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(
                json!({
                    "type": "client_tool_result",
                    "tool_call_id": result.tool_call_id,
                    "result": result_text,
                    "is_error": result.is_error,
                })
                .to_string(),
            )
        }
        AgentCommand::Close => None,
    }
}

pub fn decode_server_message(raw: &str) -> Result<ServerMessage, DomainError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DomainError::protocol(format!("agent message is not JSON: {e}")))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::protocol("agent message without type"))?;

    let message = match kind {
        "audio" => {
            let encoded = str_at(&value, &["audio_event", "audio_base_64"])
                .ok_or_else(|| DomainError::protocol("audio event without payload"))?;
            let pcm = B64
                .decode(encoded)
                .map_err(|e| DomainError::protocol(format!("invalid agent audio: {e}")))?;
            ServerMessage::Event(AgentEvent::Audio(pcm))
        }
        "user_transcript" => {
            let event = value.get("user_transcription_event");
            let text = event
                .and_then(|e| e.get("user_transcript"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let is_final = event
                .and_then(|e| e.get("is_final"))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            ServerMessage::Event(AgentEvent::UserTranscript { text, is_final })
        }
        "agent_response" => {
            let text = str_at(&value, &["agent_response_event", "agent_response"])
                .unwrap_or_default()
                .to_string();
            ServerMessage::Event(AgentEvent::AgentResponse(text))
        }
        "client_tool_call" => {
            let call = value
                .get("client_tool_call")
                .ok_or_else(|| DomainError::protocol("client_tool_call without body"))?;
            let name = call
                .get("tool_name")
                .and_then(Value::as_str)
                .ok_or_else(|| DomainError::protocol("client_tool_call without tool_name"))?;
            let id = call
                .get("tool_call_id")
                .and_then(Value::as_str)
                .ok_or_else(|| DomainError::protocol("client_tool_call without tool_call_id"))?;
            let parameters = call.get("parameters").cloned().unwrap_or(Value::Null);
            ServerMessage::Event(AgentEvent::ToolCall(ToolCall::from_wire(id, name, &parameters)))
        }
        "conversation_ended" => ServerMessage::Event(AgentEvent::ConversationEnded),
        "ping" => {
            let event_id = value
                .get("ping_event")
                .and_then(|e| e.get("event_id"))
                .and_then(Value::as_u64)
                .ok_or_else(|| DomainError::protocol("ping without event_id"))?;
            ServerMessage::Ping { event_id }
        }
        "error" => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("agent reported an error")
                .to_string();
            ServerMessage::Event(AgentEvent::Error(message))
        }
        other if INFORMATIONAL_TYPES.contains(&other) => ServerMessage::Informational(other.to_string()),
        other => ServerMessage::Unknown(other.to_string()),
    };
    Ok(message)
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use telebridge::{ToolKind, ToolResult};

    #[test]
    fn test_initiation_carries_call_id() {
        let message = initiation_message(&ConversationContext {
            call_id: "abc123".into(),
            caller: "+573001112233".into(),
            called_number: None,
        });
        let value: Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["type"], "conversation_initiation_client_data");
        assert_eq!(value["dynamic_variables"]["call_id"], "abc123");
        assert!(value["dynamic_variables"].get("called").is_none());
    }

    #[test]
    fn test_audio_chunk_is_base64() {
        let message = encode_command(&AgentCommand::Audio(vec![1, 2, 3])).unwrap();
        let value: Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["user_audio_chunk"], "AQID");
        assert!(encode_command(&AgentCommand::Close).is_none());
    }

    #[test]
    fn test_tool_result_shape() {
        let message = encode_command(&AgentCommand::ToolResult(ToolResult::success(
            "tc-1",
            json!({"status": "transferring"}),
        )))
        .unwrap();
        let value: Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["type"], "client_tool_result");
        assert_eq!(value["tool_call_id"], "tc-1");
        assert_eq!(value["is_error"], false);
        assert_eq!(value["result"], r#"{"status":"transferring"}"#);
    }

    #[test]
    fn test_decode_audio() {
        let raw = r#"{"type":"audio","audio_event":{"audio_base_64":"AQID","event_id":3}}"#;
        assert_eq!(
            decode_server_message(raw).unwrap(),
            ServerMessage::Event(AgentEvent::Audio(vec![1, 2, 3]))
        );
    }

    #[test]
    fn test_decode_transcripts() {
        let user = r#"{"type":"user_transcript","user_transcription_event":{"user_transcript":"hola"}}"#;
        assert_eq!(
            decode_server_message(user).unwrap(),
            ServerMessage::Event(AgentEvent::UserTranscript {
                text: "hola".into(),
                is_final: true
            })
        );

        let agent = r#"{"type":"agent_response","agent_response_event":{"agent_response":"Hola"}}"#;
        assert_eq!(
            decode_server_message(agent).unwrap(),
            ServerMessage::Event(AgentEvent::AgentResponse("Hola".into()))
        );
    }

    #[test]
    fn test_decode_tool_call_with_string_parameters() {
        let raw = r#"{
            "type": "client_tool_call",
            "client_tool_call": {
                "tool_name": "transfer_call",
                "tool_call_id": "tc-9",
                "parameters": "{\"department\":\"PC\",\"reason\":\"siniestro\"}"
            }
        }"#;
        let ServerMessage::Event(AgentEvent::ToolCall(call)) = decode_server_message(raw).unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(call.id, "tc-9");
        assert_eq!(
            call.kind,
            ToolKind::TransferCall {
                department: "PC".into(),
                reason: Some("siniestro".into())
            }
        );
    }

    #[test]
    fn test_ping_and_pong() {
        let raw = r#"{"type":"ping","ping_event":{"event_id":42,"ping_ms":50}}"#;
        assert_eq!(decode_server_message(raw).unwrap(), ServerMessage::Ping { event_id: 42 });

        let pong: Value = serde_json::from_str(&pong_message(42)).unwrap();
        assert_eq!(pong["type"], "pong");
        assert_eq!(pong["event_id"], 42);
    }

    #[test]
    fn test_informational_and_unknown_types() {
        assert_eq!(
            decode_server_message(r#"{"type":"conversation_initiation_metadata"}"#).unwrap(),
            ServerMessage::Informational("conversation_initiation_metadata".into())
        );
        assert_eq!(
            decode_server_message(r#"{"type":"brand_new_event"}"#).unwrap(),
            ServerMessage::Unknown("brand_new_event".into())
        );
    }

    #[test]
    fn test_malformed_messages() {
        assert!(decode_server_message("nope").is_err());
        assert!(decode_server_message(r#"{"no_type":true}"#).is_err());
        assert!(decode_server_message(r#"{"type":"audio","audio_event":{}}"#).is_err());
    }
}
