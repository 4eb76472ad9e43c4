// handlers/protected/admin.rs - User management console API
//
// Reached only with the `admin` role: the gate's role rule on /api/admin
// runs before these handlers. The backend enforces the same rule again.

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    Json,
};
use reqwest::Method;
use serde_json::Value;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
    RawQuery(query): RawQuery,
) -> ApiResult<Value> {
    let users = state
        .backend
        .with_token(identity.token)
        .forward_json(Method::GET, "/admin/users", query.as_deref(), None)
        .await?;

    Ok(ApiResponse::success(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    if email.trim().is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }

    tracing::info!(admin = %identity.subject, "creating user {}", email);
    let created = state
        .backend
        .with_token(identity.token)
        .forward_json(Method::POST, "/admin/users", None, Some(&body))
        .await?;

    Ok(ApiResponse::with_status(created, StatusCode::CREATED))
}
