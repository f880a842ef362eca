//! Orchestrator Routes - contact-center call tracking and transfers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::application::CallOrchestrator;
use crate::models::{
    ForceTransferRequest, OrchestratorStatusResponse, TranscriptRequest, TranscriptResponse,
    TransferResponse,
};
use crate::routes::error_response;
use crate::AppState;

fn orchestrator(state: &AppState) -> Result<Arc<CallOrchestrator>, (StatusCode, String)> {
    state.orchestrator.clone().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Orchestrator not configured".to_string(),
    ))
}

/// Get orchestrator status
#[utoipa::path(
    get,
    path = "/api/orchestrator/status",
    responses(
        (status = 200, description = "Orchestrator status", body = OrchestratorStatusResponse),
        (status = 503, description = "Orchestrator not configured")
    ),
    tag = "Orchestrator"
)]
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<OrchestratorStatusResponse>, (StatusCode, String)> {
    let orchestrator = orchestrator(&state)?;
    Ok(Json(OrchestratorStatusResponse::from_domain(
        orchestrator.get_status(),
    )))
}

/// Start polling the contact center
#[utoipa::path(
    post,
    path = "/api/orchestrator/start",
    responses(
        (status = 200, description = "Orchestrator running", body = OrchestratorStatusResponse),
        (status = 502, description = "Contact center health check failed"),
        (status = 503, description = "Orchestrator not configured")
    ),
    tag = "Orchestrator"
)]
pub async fn start_orchestrator(
    State(state): State<AppState>,
) -> Result<Json<OrchestratorStatusResponse>, (StatusCode, String)> {
    let orchestrator = orchestrator(&state)?;
    orchestrator.start().await.map_err(error_response)?;
    Ok(Json(OrchestratorStatusResponse::from_domain(
        orchestrator.get_status(),
    )))
}

/// Stop polling and end every tracked call
#[utoipa::path(
    post,
    path = "/api/orchestrator/stop",
    responses(
        (status = 200, description = "Orchestrator stopped", body = OrchestratorStatusResponse),
        (status = 503, description = "Orchestrator not configured")
    ),
    tag = "Orchestrator"
)]
pub async fn stop_orchestrator(
    State(state): State<AppState>,
) -> Result<Json<OrchestratorStatusResponse>, (StatusCode, String)> {
    let orchestrator = orchestrator(&state)?;
    orchestrator.stop().await;
    Ok(Json(OrchestratorStatusResponse::from_domain(
        orchestrator.get_status(),
    )))
}

/// Force a tracked call over to a human skill
#[utoipa::path(
    post,
    path = "/api/orchestrator/calls/{call_id}/transfer",
    params(
        ("call_id" = String, Path, description = "Orchestrator call ID")
    ),
    request_body = ForceTransferRequest,
    responses(
        (status = 200, description = "Transfer attempted", body = TransferResponse),
        (status = 404, description = "Call not tracked"),
        (status = 503, description = "Orchestrator not configured")
    ),
    tag = "Orchestrator"
)]
pub async fn force_transfer(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    payload: Option<Json<ForceTransferRequest>>,
) -> Result<Json<TransferResponse>, (StatusCode, String)> {
    let orchestrator = orchestrator(&state)?;
    let skill_id = payload.and_then(|Json(request)| request.skill_id);
    let outcome = orchestrator
        .force_transfer(&call_id, skill_id)
        .await
        .map_err(error_response)?;
    Ok(Json(TransferResponse::from_outcome(&call_id, outcome)))
}

/// Append transcript text; a configured keyword triggers a transfer
#[utoipa::path(
    post,
    path = "/api/orchestrator/calls/{call_id}/transcript",
    params(
        ("call_id" = String, Path, description = "Orchestrator call ID")
    ),
    request_body = TranscriptRequest,
    responses(
        (status = 200, description = "Transcript appended", body = TranscriptResponse),
        (status = 404, description = "Call not tracked"),
        (status = 503, description = "Orchestrator not configured")
    ),
    tag = "Orchestrator"
)]
pub async fn append_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Json(payload): Json<TranscriptRequest>,
) -> Result<Json<TranscriptResponse>, (StatusCode, String)> {
    let orchestrator = orchestrator(&state)?;
    let transfer = orchestrator
        .append_transcript(&call_id, &payload.text)
        .await
        .map_err(error_response)?;
    Ok(Json(TranscriptResponse {
        transfer: transfer.map(|outcome| TransferResponse::from_outcome(&call_id, outcome)),
        call_id,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orchestrator/status", get(get_status))
        .route("/api/orchestrator/start", post(start_orchestrator))
        .route("/api/orchestrator/stop", post(stop_orchestrator))
        .route(
            "/api/orchestrator/calls/:call_id/transfer",
            post(force_transfer),
        )
        .route(
            "/api/orchestrator/calls/:call_id/transcript",
            post(append_transcript),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::RecordingContactCenter;
    use crate::application::OrchestratorConfig;
    use crate::routes::{app, test_support};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use telebridge::ports::NoopConversationHook;
    use tower::ServiceExt;

    async fn json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_orchestrator() {
        let app = app(test_support::state(&[]));
        let response = app
            .oneshot(
                Request::get("/api/orchestrator/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_start_status_and_force_transfer() {
        let cc = RecordingContactCenter::new();
        cc.set_on_call(&[("1001", "3001112233")]);
        let mut state = test_support::state(&[]);
        state.orchestrator = Some(CallOrchestrator::new(
            cc.clone(),
            Arc::new(NoopConversationHook),
            OrchestratorConfig {
                poll_interval: std::time::Duration::from_secs(3600),
                default_skill: Some("100".into()),
                ..OrchestratorConfig::default()
            },
        ));
        let app = app(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/orchestrator/start")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let status = json(response).await;
        assert_eq!(status["is_running"], true);
        assert_eq!(status["active_calls"], 1);
        let call_id = status["calls"][0]["call_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/api/orchestrator/calls/{}/transfer", call_id))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"skill_id":"205"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let transfer = json(response).await;
        assert_eq!(transfer["status"], "completed");
        assert_eq!(transfer["skill_id"], "205");

        let response = app
            .oneshot(
                Request::post("/api/orchestrator/calls/missing/transcript")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"hola"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
