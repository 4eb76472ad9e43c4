// handlers/protected/pages.rs - Page descriptors behind the session gate

use serde_json::{json, Value};

use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};

fn page(name: &str, identity: &Identity) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "page": name,
        "user": identity,
    })))
}

pub async fn library(identity: Identity) -> ApiResult<Value> {
    page("library", &identity)
}

pub async fn ingest(identity: Identity) -> ApiResult<Value> {
    page("ingest", &identity)
}

/// GET /admin/users - role-gated by the session gate (`admin`)
pub async fn admin_users(identity: Identity) -> ApiResult<Value> {
    page("admin_users", &identity)
}
