//! Telephony Routes - carrier call webhooks
//!
//! Answer inbound calls with a document that connects a bidirectional media
//! stream back to this server.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::post,
    Form, Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use telebridge::domain::services::xml::connect_stream_document;
use telebridge::TelephonyProvider;

use crate::AppState;

/// Inbound call webhook fields shared by TeXML and TwiML
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VoiceWebhook {
    #[serde(default, rename = "CallSid", alias = "call_control_id", alias = "CallControlId")]
    pub call_sid: Option<String>,
    #[serde(default, rename = "From", alias = "from")]
    pub from: Option<String>,
    #[serde(default, rename = "To", alias = "to")]
    pub to: Option<String>,
}

/// Answer a Telnyx TeXML call
#[utoipa::path(
    post,
    path = "/telnyx/voice",
    request_body(content = VoiceWebhook, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "TeXML connecting a media stream", content_type = "application/xml", body = String)
    ),
    tag = "Telephony"
)]
pub async fn telnyx_voice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(webhook): Form<VoiceWebhook>,
) -> impl IntoResponse {
    answer(&state, &headers, TelephonyProvider::Telnyx, webhook)
}

/// Answer a Twilio TwiML call
#[utoipa::path(
    post,
    path = "/twilio/voice",
    request_body(content = VoiceWebhook, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "TwiML connecting a media stream", content_type = "application/xml", body = String)
    ),
    tag = "Telephony"
)]
pub async fn twilio_voice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(webhook): Form<VoiceWebhook>,
) -> impl IntoResponse {
    answer(&state, &headers, TelephonyProvider::Twilio, webhook)
}

fn answer(
    state: &AppState,
    headers: &HeaderMap,
    provider: TelephonyProvider,
    webhook: VoiceWebhook,
) -> impl IntoResponse {
    let call_id = webhook
        .call_sid
        .unwrap_or_else(|| format!("call-{}", Uuid::new_v4()));
    let caller = webhook.from.unwrap_or_else(|| "unknown".to_string());
    let called = webhook.to.unwrap_or_default();

    let stream_url = format!(
        "{}{}",
        ws_base_url(state.config.public_ws_base_url.as_deref(), headers),
        provider.media_path()
    );
    let stream_attributes: &[(&str, &str)] = match provider {
        TelephonyProvider::Telnyx => &[("bidirectionalMode", "rtp")],
        TelephonyProvider::Twilio => &[],
    };

    info!(call_id = %call_id, caller = %caller, provider = %provider, "📲 Inbound call answered");

    let document = connect_stream_document(
        &stream_url,
        stream_attributes,
        &[
            ("call_id", call_id.as_str()),
            ("caller", caller.as_str()),
            ("called", called.as_str()),
        ],
    );
    ([(header::CONTENT_TYPE, "application/xml")], document)
}

/// Websocket base URL from configuration, else from the request's Host header.
fn ws_base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = configured {
        return base.to_string();
    }
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("wss://{}", host)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/telnyx/voice", post(telnyx_voice))
        .route("/twilio/voice", post(twilio_voice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{app, test_support};
    use axum::body::{to_bytes, Body};
    use axum::http::{HeaderValue, Request, StatusCode};
    use tower::ServiceExt;

    async fn post_form(state: AppState, uri: &str, body: &'static str) -> (StatusCode, String) {
        let response = app(state)
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/x-www-form-urlencoded")
                    .header("host", "bridge.local")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_twilio_voice_connects_stream() {
        let (status, body) = post_form(
            test_support::state(&[("PUBLIC_WS_BASE_URL", "wss://bridge.example.com")]),
            "/twilio/voice",
            "CallSid=CA123&From=%2B573001112233&To=%2B5715550000&AccountSid=AC1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<Stream url="wss://bridge.example.com/media/twilio">"#));
        assert!(body.contains(r#"<Parameter name="call_id" value="CA123"/>"#));
        assert!(body.contains(r#"<Parameter name="caller" value="+573001112233"/>"#));
        assert!(body.contains(r#"<Parameter name="called" value="+5715550000"/>"#));
    }

    #[tokio::test]
    async fn test_telnyx_voice_uses_host_and_escapes() {
        let (status, body) = post_form(
            test_support::state(&[]),
            "/telnyx/voice",
            "CallSid=v3%3Aabc&From=%3Cscript%3E",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(
            r#"<Stream url="wss://bridge.local/media/telnyx" bidirectionalMode="rtp">"#
        ));
        assert!(body.contains(r#"value="&lt;script&gt;""#));
    }

    #[test]
    fn test_ws_base_url_prefers_config() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8000"));
        assert_eq!(ws_base_url(Some("wss://public"), &headers), "wss://public");
        assert_eq!(ws_base_url(None, &headers), "wss://internal:8000");
        headers.insert("x-forwarded-host", HeaderValue::from_static("edge.example.com"));
        assert_eq!(ws_base_url(None, &headers), "wss://edge.example.com");
    }
}
