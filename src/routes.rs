use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::session_gate_middleware;
use crate::state::AppState;

/// Full router with the session gate in front of every route
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .merge(public_routes())
        // Behind a valid session
        .merge(page_routes())
        .merge(api_routes())
        .merge(admin_routes())
        // Unknown paths still go through the gate
        .fallback(not_found)
        // Global middleware
        .layer(middleware::from_fn_with_state(state.clone(), session_gate_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::pages::root))
        .route("/login", get(public::pages::login))
        .route("/unauthorized", get(public::pages::unauthorized))
        .route("/health", get(public::health::health))
        // Session plumbing
        .route("/api/auth/login", post(public::auth::login))
        .route("/api/auth/magic-link", post(public::auth::magic_link))
        .route("/api/auth/logout", post(public::auth::logout))
        .route("/auth/verify", get(public::auth::verify_magic_link))
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/library", get(protected::pages::library))
        .route("/ingest", get(protected::pages::ingest))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/session", get(protected::session::whoami))
        .route("/api/library/photos", get(protected::library::photos))
        .route("/api/ingest/status", get(protected::ingest::status))
        .route("/api/ingest/start", post(protected::ingest::start))
        .route("/api/ingest/cancel", post(protected::ingest::cancel))
        .route("/api/ingest/events", get(protected::ingest::events))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(protected::pages::admin_users))
        .route(
            "/api/admin/users",
            get(protected::admin::list_users).post(protected::admin::create_user),
        )
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such route")
}
