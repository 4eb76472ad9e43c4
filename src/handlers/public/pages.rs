// handlers/public/pages.rs - Page descriptors reachable without a session
//
// Rendering lives in the browser bundle; these handlers only report which
// page to show and the parameters it needs.

use axum::extract::Query;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
    pub error: Option<String>,
}

/// GET / - Login entry. Signed-in users never get here; the gate forwards
/// them to the landing page.
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "page": "login", "from": null, "error": null })))
}

/// GET /login - Login form, remembering where the user was headed
pub async fn login(Query(query): Query<LoginQuery>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "page": "login",
        "from": query.from,
        "error": query.error,
    })))
}

pub async fn unauthorized() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "page": "unauthorized",
        "message": "You do not have access to this page",
    })))
}
