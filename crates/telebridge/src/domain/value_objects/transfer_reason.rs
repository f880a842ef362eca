//! TransferReason - why the orchestrator handed a call to a human

use serde::{Deserialize, Serialize};

/// Reason attached to an orchestrator-driven transfer or call end
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransferReason {
    MaxDurationExceeded,
    Manual,
    Keyword(String),
    /// Free-form reason supplied by the conversational agent
    Requested(String),
}

impl std::fmt::Display for TransferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferReason::MaxDurationExceeded => write!(f, "max duration exceeded"),
            TransferReason::Manual => write!(f, "manual transfer"),
            TransferReason::Keyword(keyword) => write!(f, "keyword detected: {}", keyword),
            TransferReason::Requested(reason) => write!(f, "{}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_operator_wording() {
        assert_eq!(
            TransferReason::MaxDurationExceeded.to_string(),
            "max duration exceeded"
        );
        assert_eq!(TransferReason::Manual.to_string(), "manual transfer");
        assert_eq!(
            TransferReason::Keyword("asesor".into()).to_string(),
            "keyword detected: asesor"
        );
    }
}
