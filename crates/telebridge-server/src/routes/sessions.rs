//! Session Routes - live call bridges

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::models::SessionResponse;
use crate::AppState;

/// List live and recently ended call sessions
#[utoipa::path(
    get,
    path = "/api/sessions",
    responses(
        (status = 200, description = "Call sessions, oldest first", body = Vec<SessionResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Session"
)]
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionResponse>> {
    Json(
        state
            .sessions
            .snapshots()
            .into_iter()
            .map(SessionResponse::from_domain)
            .collect(),
    )
}

/// Get one call session
#[utoipa::path(
    get,
    path = "/api/sessions/{call_id}",
    params(
        ("call_id" = String, Path, description = "Call ID")
    ),
    responses(
        (status = 200, description = "Call session", body = SessionResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Session"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<SessionResponse>, (axum::http::StatusCode, String)> {
    let session = state.sessions.get(&call_id).ok_or((
        axum::http::StatusCode::NOT_FOUND,
        "Session not found".to_string(),
    ))?;
    Ok(Json(SessionResponse::from_domain(session.snapshot())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:call_id", get(get_session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{app, test_support};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_and_get_sessions() {
        let state = test_support::state(&[]);
        let session = state
            .sessions
            .create("abc123", "+573001112233", Some("+5715550000".into()))
            .unwrap();
        session.record_audio_received();
        let app = app(state);

        let response = app
            .clone()
            .oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let sessions: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(sessions[0]["call_id"], "abc123");
        assert_eq!(sessions[0]["state"], "initializing");
        assert_eq!(sessions[0]["stats"]["audio_packets_received"], 1);

        let response = app
            .oneshot(
                Request::get("/api/sessions/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
