//! TelephonyProvider - carrier whose media stream feeds a bridge

use serde::{Deserialize, Serialize};

/// Telephony carrier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TelephonyProvider {
    Telnyx,
    Twilio,
}

impl TelephonyProvider {
    /// Path of the media-stream websocket for this carrier
    pub fn media_path(self) -> &'static str {
        match self {
            TelephonyProvider::Telnyx => "/media/telnyx",
            TelephonyProvider::Twilio => "/media/twilio",
        }
    }
}

impl std::fmt::Display for TelephonyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelephonyProvider::Telnyx => write!(f, "telnyx"),
            TelephonyProvider::Twilio => write!(f, "twilio"),
        }
    }
}

impl std::str::FromStr for TelephonyProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "telnyx" => Ok(TelephonyProvider::Telnyx),
            "twilio" => Ok(TelephonyProvider::Twilio),
            _ => Err(format!("Unknown telephony provider: {}", s)),
        }
    }
}
