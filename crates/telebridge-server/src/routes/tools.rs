//! Tool Routes - webhooks called by the conversational agent

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;

use telebridge::HandoffContext;

use crate::models::{LookupRequest, LookupResponse, SaveContextRequest, SaveContextResponse};
use crate::routes::error_response;
use crate::AppState;

/// Look a customer up by phone or policy number
#[utoipa::path(
    post,
    path = "/tools/lookup-by-phone",
    request_body = LookupRequest,
    responses(
        (status = 200, description = "Lookup result", body = LookupResponse),
        (status = 400, description = "Neither phone_number nor policy_number given")
    ),
    tag = "Tools"
)]
pub async fn lookup_by_phone(
    State(state): State<AppState>,
    Json(payload): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, (axum::http::StatusCode, String)> {
    let outcome = state
        .tools
        .lookup(
            payload.phone_number.as_deref(),
            payload.policy_number.as_deref(),
        )
        .await
        .map_err(error_response)?;
    Ok(Json(LookupResponse::from_outcome(outcome)))
}

/// Save handoff context. Always answers with success.
#[utoipa::path(
    post,
    path = "/tools/save-context",
    request_body = SaveContextRequest,
    responses(
        (status = 200, description = "Context saved", body = SaveContextResponse)
    ),
    tag = "Tools"
)]
pub async fn save_context(
    State(state): State<AppState>,
    Json(payload): Json<SaveContextRequest>,
) -> Json<SaveContextResponse> {
    let context = HandoffContext {
        call_id: payload.call_id,
        phone_number: payload.phone_number,
        summary: payload.summary,
        department: payload.department,
        notes: payload.notes,
        saved_at: Utc::now(),
    };
    let result = state.tools.save_context(context).await;
    Json(SaveContextResponse {
        success: true,
        message: result["message"]
            .as_str()
            .unwrap_or("Context saved")
            .to_string(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tools/lookup-by-phone", post(lookup_by_phone))
        .route("/tools/save-context", post(save_context))
}
