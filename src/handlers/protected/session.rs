use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/session - Current identity as verified by the gate
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "subject": "user_id",
///     "email": "user@example.com",
///     "roles": ["member"],
///     "issued_at": "2025-01-01T00:00:00Z",
///     "expires_at": "2025-01-08T00:00:00Z"
///   }
/// }
/// ```
pub async fn whoami(identity: Identity) -> ApiResult<Identity> {
    Ok(ApiResponse::success(identity))
}
