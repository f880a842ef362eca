//! Simple API Key Authentication (Bearer Token)

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Outcome of checking a request's credentials
#[derive(Debug, PartialEq, Eq)]
pub enum AuthCheck {
    Disabled,
    Authorized,
    Missing,
    Malformed,
    Invalid,
}

/// Validate the Authorization header against the configured key.
pub fn check_bearer(headers: &HeaderMap, api_key: Option<&str>) -> AuthCheck {
    let api_key = match api_key {
        Some(key) if !key.is_empty() => key,
        _ => return AuthCheck::Disabled,
    };

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if token == api_key => AuthCheck::Authorized,
            Some(_) => AuthCheck::Invalid,
            None => AuthCheck::Malformed,
        },
        None => AuthCheck::Missing,
    }
}

/// Authentication middleware for the admin API
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match check_bearer(request.headers(), state.config.api_key.as_deref()) {
        AuthCheck::Disabled | AuthCheck::Authorized => Ok(next.run(request).await),
        AuthCheck::Missing => {
            tracing::warn!("Missing Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
        AuthCheck::Malformed => {
            tracing::warn!("Invalid Authorization header format");
            Err(StatusCode::UNAUTHORIZED)
        }
        AuthCheck::Invalid => {
            tracing::warn!("Invalid API key attempted");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_check_bearer() {
        let key = Some("s3cret");
        assert_eq!(check_bearer(&headers(Some("Bearer s3cret")), key), AuthCheck::Authorized);
        assert_eq!(check_bearer(&headers(Some("Bearer nope")), key), AuthCheck::Invalid);
        assert_eq!(check_bearer(&headers(Some("Basic s3cret")), key), AuthCheck::Malformed);
        assert_eq!(check_bearer(&headers(None), key), AuthCheck::Missing);
    }

    #[test]
    fn test_no_key_disables_auth() {
        assert_eq!(check_bearer(&headers(None), None), AuthCheck::Disabled);
        assert_eq!(check_bearer(&headers(None), Some("")), AuthCheck::Disabled);
    }
}
