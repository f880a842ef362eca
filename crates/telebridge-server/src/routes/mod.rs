//! Telebridge HTTP Routes
//!
//! - /telnyx/voice, /twilio/voice - carrier call webhooks (TeXML/TwiML)
//! - /media/telnyx, /media/twilio - carrier media-stream websockets
//! - /tools/* - agent tool webhooks
//! - /api/sessions - live call bridges
//! - /api/orchestrator/* - contact-center orchestrator control

pub mod media;
pub mod orchestrator;
pub mod sessions;
pub mod swagger;
pub mod telephony;
pub mod tools;

use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use telebridge::DomainError;

use crate::{auth, AppState};

#[derive(Serialize)]
struct HealthCheck {
    status: String,
    message: String,
    version: String,
}

async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        message: "Telebridge is running - calls flow between carrier and agent".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Full application router
pub fn app(state: AppState) -> Router {
    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .merge(sessions::router())
        .merge(orchestrator::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // OpenAPI documentation
    let openapi = swagger::ApiDoc::openapi();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(health_check))
        .merge(telephony::router())
        .merge(media::router())
        .merge(tools::router())
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Map a domain error onto an HTTP error response.
pub fn error_response(error: DomainError) -> (StatusCode, String) {
    let status = match &error {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        DomainError::Connection(_) | DomainError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        DomainError::Protocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::application::{ContextStore, SessionManager, ToolExecutor};
    use crate::adapters::JsonCustomerDirectory;
    use crate::config::ServerConfig;
    use crate::AppState;

    pub fn state(pairs: &[(&str, &str)]) -> AppState {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = ServerConfig::from_lookup(|key| map.get(key).cloned()).unwrap();
        let contexts = Arc::new(ContextStore::new());
        AppState {
            config: Arc::new(config),
            sessions: Arc::new(SessionManager::new(std::time::Duration::from_secs(60))),
            connector: None,
            tools: Arc::new(ToolExecutor::new(
                Arc::new(JsonCustomerDirectory::empty()),
                contexts,
            )),
            contact_center: None,
            orchestrator: None,
            telnyx_control: None,
            twilio_control: None,
        }
    }
}
