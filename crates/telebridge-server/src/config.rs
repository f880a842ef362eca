//! Server configuration
//!
//! Built from a key lookup so the same code reads Shuttle secrets in
//! deployment and the process environment locally.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::application::TransferRouting;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} requires {requires}")]
    Incomplete {
        key: &'static str,
        requires: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct ElevenLabsSettings {
    pub api_key: String,
    pub agent_id: String,
    pub ws_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WolkvoxSettings {
    pub token: String,
    pub server: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub enabled: bool,
    pub poll_interval: Duration,
    pub max_call_duration: Duration,
    pub default_skill: Option<String>,
    pub transfer_keywords: Vec<String>,
    pub on_call_status: String,
}

#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_key: Option<String>,
    pub public_ws_base_url: Option<String>,
    pub elevenlabs: Option<ElevenLabsSettings>,
    pub agent_connect_timeout: Duration,
    pub stream_start_timeout: Duration,
    pub end_call_grace: Duration,
    pub session_retention: Duration,
    pub context_retention: Duration,
    pub wolkvox: Option<WolkvoxSettings>,
    pub orchestrator: OrchestratorSettings,
    pub department_skills: HashMap<String, String>,
    pub transfer_sip_domain: Option<String>,
    pub telnyx_api_key: Option<String>,
    pub twilio: Option<TwilioSettings>,
    pub customer_directory_path: Option<String>,
}

impl ServerConfig {
    /// Read every setting through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let elevenlabs = match (get("ELEVENLABS_API_KEY"), get("ELEVENLABS_AGENT_ID")) {
            (Some(api_key), Some(agent_id)) => Some(ElevenLabsSettings {
                api_key,
                agent_id,
                ws_url: get("ELEVENLABS_WS_URL"),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    key: "ELEVENLABS_API_KEY",
                    requires: "ELEVENLABS_AGENT_ID",
                })
            }
            _ => None,
        };

        let wolkvox = match (get("WOLKVOX_TOKEN"), get("WOLKVOX_SERVER")) {
            (Some(token), Some(server)) => Some(WolkvoxSettings {
                token,
                server,
                base_url: get("WOLKVOX_BASE_URL"),
                timeout: secs(&get, "WOLKVOX_TIMEOUT_SECS", 25)?,
                max_attempts: parse_or(&get, "WOLKVOX_MAX_ATTEMPTS", 3)?,
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    key: "WOLKVOX_TOKEN",
                    requires: "WOLKVOX_SERVER",
                })
            }
            _ => None,
        };

        let orchestrator = OrchestratorSettings {
            enabled: flag(&get, "ORCHESTRATOR_ENABLED")?,
            poll_interval: secs(&get, "ORCHESTRATOR_POLL_SECS", 5)?,
            max_call_duration: secs(&get, "ORCHESTRATOR_MAX_CALL_SECS", 600)?,
            default_skill: get("ORCHESTRATOR_DEFAULT_SKILL"),
            transfer_keywords: get("ORCHESTRATOR_TRANSFER_KEYWORDS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            on_call_status: get("ORCHESTRATOR_ON_CALL_STATUS").unwrap_or_else(|| "Talk".into()),
        };
        if orchestrator.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "ORCHESTRATOR_POLL_SECS",
                value: "0".into(),
            });
        }

        let twilio = match (get("TWILIO_ACCOUNT_SID"), get("TWILIO_AUTH_TOKEN")) {
            (Some(account_sid), Some(auth_token)) => Some(TwilioSettings {
                account_sid,
                auth_token,
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    key: "TWILIO_ACCOUNT_SID",
                    requires: "TWILIO_AUTH_TOKEN",
                })
            }
            _ => None,
        };

        Ok(Self {
            api_key: get("TELEBRIDGE_API_KEY"),
            public_ws_base_url: get("PUBLIC_WS_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            elevenlabs,
            agent_connect_timeout: secs(&get, "AGENT_CONNECT_TIMEOUT_SECS", 10)?,
            stream_start_timeout: secs(&get, "STREAM_START_TIMEOUT_SECS", 10)?,
            end_call_grace: secs(&get, "END_CALL_GRACE_SECS", 5)?,
            session_retention: secs(&get, "SESSION_RETENTION_SECS", 60)?,
            context_retention: secs(&get, "CONTEXT_RETENTION_SECS", 3600)?,
            wolkvox,
            orchestrator,
            department_skills: get("DEPARTMENT_SKILLS")
                .map(|raw| TransferRouting::parse_department_skills(&raw))
                .unwrap_or_default(),
            transfer_sip_domain: get("TRANSFER_SIP_DOMAIN"),
            telnyx_api_key: get("TELNYX_API_KEY"),
            twilio,
            customer_directory_path: get("CUSTOMER_DIRECTORY_PATH"),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn transfer_routing(&self) -> TransferRouting {
        TransferRouting::new(
            self.department_skills.clone(),
            self.transfer_sip_domain.clone(),
            self.orchestrator.default_skill.clone(),
        )
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn secs<G>(get: &G, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default).map(Duration::from_secs)
}

fn flag<G>(get: &G, key: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(false),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
    }
}
