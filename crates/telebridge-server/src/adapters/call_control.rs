//! Carrier call control for SIP transfers
//!
//! - Telnyx: `POST /v2/calls/{call_control_id}/actions/transfer`
//! - Twilio: update the live call with `<Dial><Sip>` TwiML

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use telebridge::domain::services::xml::dial_sip_document;
use telebridge::ports::CallTransferer;
use telebridge::{DomainError, TelephonyProvider};

const TELNYX_API_BASE: &str = "https://api.telnyx.com/v2";
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> Result<Client, DomainError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| DomainError::ExternalService(format!("http client: {e}")))
}

async fn check_response(provider: &str, response: reqwest::Response) -> Result<(), DomainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(DomainError::ExternalService(format!(
        "{provider} transfer failed ({status}): {body}"
    )))
}

pub struct TelnyxCallControl {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TelnyxCallControl {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            base_url: TELNYX_API_BASE.to_string(),
        })
    }
}

#[async_trait]
impl CallTransferer for TelnyxCallControl {
    async fn transfer(&self, call_handle: &str, target: &str) -> Result<(), DomainError> {
        let url = format!("{}/calls/{}/actions/transfer", self.base_url, call_handle);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "to": target }))
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("telnyx: {e}")))?;
        check_response("telnyx", response).await?;
        info!(call_handle, target, "🔀 Telnyx call transferred");
        Ok(())
    }

    fn provider(&self) -> TelephonyProvider {
        TelephonyProvider::Telnyx
    }
}

pub struct TwilioCallControl {
    client: Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
}

impl TwilioCallControl {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            client: http_client()?,
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url: TWILIO_API_BASE.to_string(),
        })
    }
}

#[async_trait]
impl CallTransferer for TwilioCallControl {
    async fn transfer(&self, call_handle: &str, target: &str) -> Result<(), DomainError> {
        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, call_handle
        );
        let twiml = dial_sip_document(target);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Twiml", twiml.as_str())])
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("twilio: {e}")))?;
        check_response("twilio", response).await?;
        info!(call_handle, target, "🔀 Twilio call transferred");
        Ok(())
    }

    fn provider(&self) -> TelephonyProvider {
        TelephonyProvider::Twilio
    }
}
