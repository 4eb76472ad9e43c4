// handlers/public/auth/magic_link.rs - passwordless login
//
// POST /api/auth/magic-link asks the backend to email a sign-in link.
// GET  /auth/verify is where that link lands: the one-time token is
// exchanged for a credential, the session cookie is set and the browser is
// sent on to its original destination.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use url::form_urlencoded;

use super::utils::{establish_session, sanitize_redirect};
use crate::backend::MagicLinkRequest;
use crate::error::ApiError;
use crate::middleware::{redirect_found, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MagicLinkBody {
    pub email: String,
    #[serde(default, alias = "redirectTo", alias = "from")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
    #[serde(default, rename = "redirectTo", alias = "redirect_to")]
    pub redirect_to: Option<String>,
}

pub async fn magic_link(
    State(state): State<AppState>,
    Json(body): Json<MagicLinkBody>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }

    let redirect_to = sanitize_redirect(body.redirect_to.as_deref(), &state.config.gate.landing_path);
    state
        .backend
        .request_magic_link(&MagicLinkRequest {
            email: email.to_string(),
            redirect_to: Some(redirect_to),
        })
        .await?;

    // Same answer whether or not the address is known
    Ok(ApiResponse::accepted(json!({ "sent": true })))
}

pub async fn verify_magic_link(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Response {
    let gate = &state.config.gate;
    let failed = || {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("error", "invalid_link")
            .finish();
        redirect_found(&format!("{}?{}", gate.login_path, query))
    };

    let Some(token) = query.token.filter(|t| !t.trim().is_empty()) else {
        return failed();
    };

    let tokens = match state.backend.verify_magic_link(token.trim()).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::info!("magic link rejected: {}", e);
            return failed();
        }
    };

    let session = match establish_session(&state, &tokens) {
        Ok(session) => session,
        Err(_) => return failed(),
    };

    tracing::info!(subject = %session.identity.subject, "magic link login succeeded");
    let target = sanitize_redirect(query.redirect_to.as_deref(), &gate.landing_path);
    let mut response = redirect_found(&target);
    match session.set_cookie.parse() {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(_) => failed(),
    }
}
