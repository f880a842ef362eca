//! OpenAPI Documentation
//!
//! Centralized API documentation using utoipa.

use utoipa::OpenApi;

use crate::models::{
    // Orchestrator models
    ActiveCallResponse,
    // Tool models
    CustomerResponse,
    ForceTransferRequest,
    LookupRequest,
    LookupResponse,
    OrchestratorStatusResponse,
    PolicyResponse,
    SaveContextRequest,
    SaveContextResponse,
    // Session models
    SessionResponse,
    SessionStatsResponse,
    TranscriptRequest,
    TranscriptResponse,
    TransferResponse,
};

// Local route types
use super::telephony::VoiceWebhook;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Telephony endpoints
        super::telephony::telnyx_voice,
        super::telephony::twilio_voice,
        // Tool endpoints
        super::tools::lookup_by_phone,
        super::tools::save_context,
        // Session endpoints
        super::sessions::list_sessions,
        super::sessions::get_session,
        // Orchestrator endpoints
        super::orchestrator::get_status,
        super::orchestrator::start_orchestrator,
        super::orchestrator::stop_orchestrator,
        super::orchestrator::force_transfer,
        super::orchestrator::append_transcript,
    ),
    info(
        title = "Telebridge API",
        version = "0.1.0",
        description = "Telephony audio bridge between carrier media streams and a conversational voice agent, with contact-center handoff.",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Telephony", description = "Telephony - Carrier call webhooks (TeXML/TwiML)"),
        (name = "Tools", description = "Tools - Webhooks called by the conversational agent"),
        (name = "Session", description = "Session - Live call bridges"),
        (name = "Orchestrator", description = "Orchestrator - Contact-center call tracking and transfers"),
    ),
    components(
        schemas(
            // Telephony
            VoiceWebhook,
            // Tools
            LookupRequest,
            LookupResponse,
            CustomerResponse,
            PolicyResponse,
            SaveContextRequest,
            SaveContextResponse,
            // Session
            SessionResponse,
            SessionStatsResponse,
            // Orchestrator
            OrchestratorStatusResponse,
            ActiveCallResponse,
            ForceTransferRequest,
            TranscriptRequest,
            TranscriptResponse,
            TransferResponse,
        )
    ),
)]
pub struct ApiDoc;
