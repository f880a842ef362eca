//! ToolCall - typed client tool invocation from the conversational agent

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Department used when a transfer tool call names none
pub const DEFAULT_DEPARTMENT: &str = "general";

/// A tool invocation, correlated by `id` with the result sent back to the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub kind: ToolKind,
}

/// Known client tools, with a raw fallback for anything else
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolKind {
    TransferCall {
        department: String,
        reason: Option<String>,
    },
    EndCall {
        reason: Option<String>,
    },
    LookupPolicy {
        phone_number: Option<String>,
        policy_number: Option<String>,
    },
    SaveContext {
        phone_number: Option<String>,
        summary: String,
        department: Option<String>,
        notes: Option<String>,
    },
    Unknown {
        name: String,
        parameters: Value,
    },
}

impl ToolKind {
    pub fn name(&self) -> &str {
        match self {
            ToolKind::TransferCall { .. } => "transfer_call",
            ToolKind::EndCall { .. } => "end_call",
            ToolKind::LookupPolicy { .. } => "lookup_policy",
            ToolKind::SaveContext { .. } => "save_context",
            ToolKind::Unknown { name, .. } => name,
        }
    }
}

impl ToolCall {
    /// Build a typed tool call from the agent's tool name and parameters.
    ///
    /// `parameters` may be a JSON object or a string holding JSON.
    pub fn from_wire(id: impl Into<String>, name: &str, parameters: &Value) -> Self {
        let params = normalize_parameters(parameters);
        let kind = match name {
            "transfer_call" | "transfer_to_human" | "transfer_to_department" => {
                ToolKind::TransferCall {
                    department: string_field(&params, &["department", "queue", "skill"])
                        .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
                    reason: string_field(&params, &["reason"]),
                }
            }
            "end_call" | "hang_up" => ToolKind::EndCall {
                reason: string_field(&params, &["reason"]),
            },
            "lookup_policy" | "lookup_by_phone" => ToolKind::LookupPolicy {
                phone_number: string_field(&params, &["phone_number", "phone"]),
                policy_number: string_field(&params, &["policy_number", "policy"]),
            },
            "save_context" => ToolKind::SaveContext {
                phone_number: string_field(&params, &["phone_number", "phone"]),
                summary: string_field(&params, &["summary"]).unwrap_or_default(),
                department: string_field(&params, &["department"]),
                notes: string_field(&params, &["notes"]),
            },
            other => ToolKind::Unknown {
                name: other.to_string(),
                parameters: params,
            },
        };

        Self {
            id: id.into(),
            kind,
        }
    }
}

fn normalize_parameters(parameters: &Value) -> Value {
    match parameters {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| parameters.clone()),
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    }
}

fn string_field(params: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transfer_from_encoded_string() {
        let call = ToolCall::from_wire(
            "tc-1",
            "transfer_call",
            &json!("{\"department\":\"PC\",\"reason\":\"siniestro\"}"),
        );
        assert_eq!(
            call.kind,
            ToolKind::TransferCall {
                department: "PC".into(),
                reason: Some("siniestro".into())
            }
        );
    }

    #[test]
    fn test_transfer_alias_and_object_params() {
        let call = ToolCall::from_wire("tc-2", "transfer_to_human", &json!({"queue": "AUTOS"}));
        assert_eq!(
            call.kind,
            ToolKind::TransferCall {
                department: "AUTOS".into(),
                reason: None
            }
        );
    }

    #[test]
    fn test_transfer_without_department_uses_default() {
        let call = ToolCall::from_wire("tc-3", "transfer_call", &Value::Null);
        assert!(matches!(
            call.kind,
            ToolKind::TransferCall { ref department, .. } if department == DEFAULT_DEPARTMENT
        ));
    }

    #[test]
    fn test_unknown_tool_keeps_raw_parameters() {
        let call = ToolCall::from_wire("tc-4", "book_appointment", &json!({"day": "monday"}));
        assert_eq!(call.kind.name(), "book_appointment");
        assert!(matches!(
            call.kind,
            ToolKind::Unknown { ref parameters, .. } if parameters["day"] == "monday"
        ));
    }

    #[test]
    fn test_numeric_policy_number() {
        let call = ToolCall::from_wire("tc-5", "lookup_policy", &json!({"policy_number": 778899}));
        assert_eq!(
            call.kind,
            ToolKind::LookupPolicy {
                phone_number: None,
                policy_number: Some("778899".into())
            }
        );
    }
}
