//! Carrier media-stream envelopes (Telnyx and Twilio)
//!
//! Both carriers speak the same event vocabulary (`connected`, `start`,
//! `media`, `stop`, `mark`) with different field casing and a different
//! outbound media shape.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use telebridge::{DomainError, TelephonyProvider};

/// Parsed `start` event
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStart {
    pub stream_id: String,
    pub call_id: String,
    pub caller: String,
    pub called_number: Option<String>,
    /// Carrier handle used for call control (Telnyx call_control_id, Twilio CallSid)
    pub call_handle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTrack {
    Inbound,
    Outbound,
}

/// Inbound media-stream event
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonyEvent {
    Connected,
    Start(StreamStart),
    /// Base64 μ-law payload
    Media { track: MediaTrack, payload: String },
    Stop,
    Mark { name: Option<String> },
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default, alias = "streamSid")]
    stream_id: Option<String>,
    #[serde(default)]
    start: Option<StartPayload>,
    #[serde(default)]
    media: Option<MediaPayload>,
    #[serde(default)]
    mark: Option<MarkPayload>,
}

#[derive(Debug, Deserialize)]
struct StartPayload {
    #[serde(default, alias = "streamSid")]
    stream_id: Option<String>,
    #[serde(default, alias = "callSid")]
    call_control_id: Option<String>,
    #[serde(default)]
    call_session_id: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default, alias = "customParameters")]
    custom_parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MediaPayload {
    #[serde(default)]
    track: Option<String>,
    payload: String,
}

#[derive(Debug, Deserialize)]
struct MarkPayload {
    #[serde(default)]
    name: Option<String>,
}

/// Envelope codec for one carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStreamProtocol {
    provider: TelephonyProvider,
}

impl MediaStreamProtocol {
    pub fn new(provider: TelephonyProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> TelephonyProvider {
        self.provider
    }

    pub fn decode(&self, raw: &str) -> Result<TelephonyEvent, DomainError> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| DomainError::protocol(format!("{} media frame: {e}", self.provider)))?;

        match envelope.event.as_str() {
            "connected" => Ok(TelephonyEvent::Connected),
            "start" => {
                let start = envelope
                    .start
                    .ok_or_else(|| DomainError::protocol("start event without start payload"))?;
                Ok(TelephonyEvent::Start(stream_start(envelope.stream_id, start)))
            }
            "media" => {
                let media = envelope
                    .media
                    .ok_or_else(|| DomainError::protocol("media event without media payload"))?;
                let track = match media.track.as_deref() {
                    Some("outbound") => MediaTrack::Outbound,
                    // single-track streams omit the field
                    _ => MediaTrack::Inbound,
                };
                Ok(TelephonyEvent::Media {
                    track,
                    payload: media.payload,
                })
            }
            "stop" => Ok(TelephonyEvent::Stop),
            "mark" => Ok(TelephonyEvent::Mark {
                name: envelope.mark.and_then(|m| m.name),
            }),
            other => Ok(TelephonyEvent::Other(other.to_string())),
        }
    }

    /// Outbound media frame carrying base64 μ-law audio
    pub fn encode_media(&self, stream_id: Option<&str>, payload: &str) -> String {
        match self.provider {
            TelephonyProvider::Telnyx => json!({
                "event": "media",
                "media": { "payload": payload },
            }),
            TelephonyProvider::Twilio => json!({
                "event": "media",
                "streamSid": stream_id,
                "media": { "payload": payload },
            }),
        }
        .to_string()
    }
}

fn stream_start(envelope_stream_id: Option<String>, start: StartPayload) -> StreamStart {
    let param = |name: &str| -> Option<String> {
        match start.custom_parameters.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    };

    let stream_id = envelope_stream_id
        .or_else(|| start.stream_id.clone())
        .unwrap_or_default();
    let call_id = param("call_id")
        .or_else(|| start.call_control_id.clone())
        .or_else(|| start.call_session_id.clone())
        .unwrap_or_else(|| stream_id.clone());

    StreamStart {
        call_id,
        caller: param("caller")
            .or_else(|| start.from.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        called_number: param("called").or_else(|| start.to.clone()),
        call_handle: start.call_control_id.clone(),
        stream_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telnyx() -> MediaStreamProtocol {
        MediaStreamProtocol::new(TelephonyProvider::Telnyx)
    }

    fn twilio() -> MediaStreamProtocol {
        MediaStreamProtocol::new(TelephonyProvider::Twilio)
    }

    #[test]
    fn test_telnyx_start_with_custom_parameters() {
        let raw = r#"{
            "event": "start",
            "sequence_number": "1",
            "stream_id": "st-1",
            "start": {
                "call_control_id": "v3:ctrl",
                "from": "+573001112233",
                "to": "+5714440000",
                "custom_parameters": {"call_id": "abc123", "caller": "+573009998877"}
            }
        }"#;

        let TelephonyEvent::Start(start) = telnyx().decode(raw).unwrap() else {
            panic!("expected start event");
        };
        assert_eq!(start.stream_id, "st-1");
        assert_eq!(start.call_id, "abc123");
        assert_eq!(start.caller, "+573009998877");
        assert_eq!(start.called_number.as_deref(), Some("+5714440000"));
        assert_eq!(start.call_handle.as_deref(), Some("v3:ctrl"));
    }

    #[test]
    fn test_twilio_start_uses_call_sid() {
        let raw = r#"{
            "event": "start",
            "streamSid": "MZ1",
            "start": {"streamSid": "MZ1", "callSid": "CA9", "customParameters": {}}
        }"#;

        let TelephonyEvent::Start(start) = twilio().decode(raw).unwrap() else {
            panic!("expected start event");
        };
        assert_eq!(start.stream_id, "MZ1");
        assert_eq!(start.call_id, "CA9");
        assert_eq!(start.caller, "unknown");
        assert_eq!(start.call_handle.as_deref(), Some("CA9"));
    }

    #[test]
    fn test_media_tracks() {
        let inbound = r#"{"event":"media","media":{"track":"inbound","payload":"/w=="}}"#;
        let outbound = r#"{"event":"media","media":{"track":"outbound","payload":"/w=="}}"#;
        let untracked = r#"{"event":"media","streamSid":"MZ1","media":{"payload":"/w=="}}"#;

        assert_eq!(
            telnyx().decode(inbound).unwrap(),
            TelephonyEvent::Media {
                track: MediaTrack::Inbound,
                payload: "/w==".into()
            }
        );
        assert!(matches!(
            telnyx().decode(outbound).unwrap(),
            TelephonyEvent::Media { track: MediaTrack::Outbound, .. }
        ));
        assert!(matches!(
            twilio().decode(untracked).unwrap(),
            TelephonyEvent::Media { track: MediaTrack::Inbound, .. }
        ));
    }

    #[test]
    fn test_malformed_frames_are_protocol_errors() {
        assert!(matches!(telnyx().decode("{not json"), Err(DomainError::Protocol(_))));
        assert!(matches!(
            telnyx().decode(r#"{"event":"media"}"#),
            Err(DomainError::Protocol(_))
        ));
    }

    #[test]
    fn test_unknown_event_is_tolerated() {
        assert_eq!(
            twilio().decode(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#).unwrap(),
            TelephonyEvent::Other("dtmf".into())
        );
        assert_eq!(
            telnyx().decode(r#"{"event":"mark","mark":{"name":"greeting"}}"#).unwrap(),
            TelephonyEvent::Mark { name: Some("greeting".into()) }
        );
    }

    #[test]
    fn test_outbound_envelopes_differ_by_carrier() {
        let telnyx_frame: Value = serde_json::from_str(&telnyx().encode_media(Some("st-1"), "AAA=")).unwrap();
        assert_eq!(telnyx_frame["event"], "media");
        assert_eq!(telnyx_frame["media"]["payload"], "AAA=");
        assert!(telnyx_frame.get("streamSid").is_none());

        let twilio_frame: Value = serde_json::from_str(&twilio().encode_media(Some("MZ1"), "AAA=")).unwrap();
        assert_eq!(twilio_frame["streamSid"], "MZ1");
        assert_eq!(twilio_frame["media"]["payload"], "AAA=");
    }
}
