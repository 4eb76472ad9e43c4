use crate::auth::{decode_credential, Identity};
use crate::backend::TokenResponse;
use crate::error::ApiError;
use crate::middleware::session_cookie;
use crate::state::AppState;

/// A verified session ready to be handed to the browser
pub struct EstablishedSession {
    pub identity: Identity,
    pub set_cookie: String,
}

/// Verify a token minted by the backend and build its session cookie.
/// Tokens the gate would reject are refused here so the browser never ends
/// up holding a cookie that loops back to the login page.
pub fn establish_session(state: &AppState, tokens: &TokenResponse) -> Result<EstablishedSession, ApiError> {
    let identity = decode_credential(&tokens.access_token, &state.config.session.jwt_secret).map_err(|e| {
        tracing::warn!("backend issued a credential the gate cannot verify: {}", e);
        ApiError::from(e)
    })?;

    Ok(EstablishedSession {
        set_cookie: session_cookie(&tokens.access_token, &state.config.session),
        identity,
    })
}

/// Only same-origin absolute paths are accepted as post-login targets
pub fn sanitize_redirect(target: Option<&str>, fallback: &str) -> String {
    match target {
        Some(t)
            if t.starts_with('/')
                && !t.starts_with("//")
                && !t.contains('\\')
                && !t.chars().any(|c| c.is_control() || c.is_whitespace())
                && !t.starts_with("/login") =>
        {
            t.to_string()
        }
        _ => fallback.to_string(),
    }
}
