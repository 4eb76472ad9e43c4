use axum::extract::{RawQuery, State};
use reqwest::Method;
use serde_json::Value;

use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/library/photos - Photo listing, query string passed through
/// (paging, sort, filters are the backend's business)
pub async fn photos(
    State(state): State<AppState>,
    identity: Identity,
    RawQuery(query): RawQuery,
) -> ApiResult<Value> {
    let photos = state
        .backend
        .with_token(identity.token)
        .forward_json(Method::GET, "/photos", query.as_deref(), None)
        .await?;

    Ok(ApiResponse::success(photos))
}
