// handlers/public/auth/session.rs - POST /api/auth/logout handler

use axum::{extract::State, http::header, response::IntoResponse};
use serde_json::json;

use crate::middleware::{clear_session_cookie, ApiResponse};
use crate::state::AppState;

/// POST /api/auth/logout - Drop the session cookie
///
/// Public so that a browser holding an expired cookie can still clear it.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie(&state.config.session))],
        ApiResponse::success(json!({ "logged_out": true })),
    )
}
