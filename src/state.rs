use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::AppConfig;
use crate::gate::SessionGate;

/// Shared state handed to every handler and the gate middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gate: Arc<SessionGate>,
    pub backend: BackendClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let gate = SessionGate::from_config(&config);

        if config.session.jwt_secret.is_empty() {
            tracing::warn!("JWT_SECRET is not set; every credential will be rejected");
        }

        Ok(Self {
            config: Arc::new(config),
            gate: Arc::new(gate),
            backend,
        })
    }
}
