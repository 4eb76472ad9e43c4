use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::cookie::read_cookie;
use super::response::redirect_found;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::gate::GateDecision;
use crate::state::AppState;

/// Session gate middleware. Runs the gate decision for every request, turns
/// redirects into `302 Found` and hands the verified identity to handlers
/// through request extensions.
pub async fn session_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let credential = extract_credential(request.headers(), &state.config.session.cookie_name);

    match state.gate.decide(&path, credential.as_deref()) {
        GateDecision::Allow(identity) => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        GateDecision::RedirectToLogin { location } => {
            tracing::debug!(path = %path, "no valid session, redirecting to login");
            redirect_found(&location)
        }
        GateDecision::RedirectToUnauthorized { location } => {
            tracing::debug!(path = %path, "missing role, redirecting to {}", location);
            redirect_found(&location)
        }
        GateDecision::RedirectToLanding { location } => redirect_found(&location),
    }
}

/// Credential from the session cookie, falling back to a bearer header
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    read_cookie(headers, cookie_name).or_else(|| extract_bearer(headers))
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Handlers behind the gate take `Identity` as an extractor
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{encode_credential, Claims};
    use crate::config::AppConfig;
    use axum::{body::Body, http::HeaderValue, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        let mut config = AppConfig::development();
        config.session.jwt_secret = "unit-secret".to_string();
        let state = AppState::new(config).unwrap();

        Router::new()
            .route("/library", get(|identity: Identity| async move { identity.subject }))
            .layer(middleware::from_fn_with_state(state.clone(), session_gate_middleware))
            .with_state(state)
    }

    #[tokio::test]
    async fn redirects_with_found_and_location() {
        let response = app()
            .oneshot(axum::http::Request::builder().uri("/library").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login?from=%2Flibrary");
    }

    #[tokio::test]
    async fn allowed_request_carries_identity() {
        let claims = Claims::new("u-9", "u9@example.com", vec!["member".into()], chrono::Duration::hours(1));
        let token = encode_credential(&claims, "unit-secret").unwrap();

        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/library")
                    .header(header::COOKIE, format!("auth_token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"u-9");
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("auth_token=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_credential(&headers, "auth_token").as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_credential(&headers, "auth_token").as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_credential(&headers, "auth_token"), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_credential(&headers, "auth_token"), None);
    }
}
