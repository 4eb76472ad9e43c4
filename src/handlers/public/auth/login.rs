// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde_json::json;

use super::utils::{establish_session, sanitize_redirect};
use crate::backend::LoginRequest;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
    /// Original destination captured by the gate (`from` query parameter)
    #[serde(default, alias = "from")]
    pub redirect_to: Option<String>,
}

/// POST /api/auth/login - Exchange email and password for a session cookie
///
/// Expected Input:
/// ```json
/// { "email": "user@example.com", "password": "secret", "redirect_to": "/library" }
/// ```
///
/// Expected Output (Success): `Set-Cookie: auth_token=...` and
/// ```json
/// { "success": true, "data": { "user": { ... }, "redirect_to": "/library" } }
/// ```
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let tokens = state
        .backend
        .login(&LoginRequest {
            email: body.email.trim().to_string(),
            password: body.password,
        })
        .await?;

    let session = establish_session(&state, &tokens)?;
    let redirect_to = sanitize_redirect(body.redirect_to.as_deref(), &state.config.gate.landing_path);
    tracing::info!(subject = %session.identity.subject, "password login succeeded");

    Ok((
        [(header::SET_COOKIE, session.set_cookie)],
        ApiResponse::success(json!({
            "user": session.identity,
            "redirect_to": redirect_to,
        })),
    ))
}
