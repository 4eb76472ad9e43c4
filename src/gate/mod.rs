//! Session gate: decides, per request, whether to let it through or where to
//! redirect it. Decisions are pure; the axum adapter lives in
//! `middleware::session_gate`.

pub mod policy;

use url::form_urlencoded;

use crate::auth::{decode_credential, Identity};
use crate::config::{AppConfig, GateConfig};
pub use policy::{classify, PathClass};

/// Outcome of a gate evaluation
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Pass through. Carries the identity when a credential was verified.
    Allow(Option<Identity>),
    /// Send to the login entry point, remembering where the user was going
    RedirectToLogin { location: String },
    /// Authenticated but lacking a required role
    RedirectToUnauthorized { location: String },
    /// Already signed in; skip the login form
    RedirectToLanding { location: String },
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow(_))
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            GateDecision::Allow(_) => None,
            GateDecision::RedirectToLogin { location }
            | GateDecision::RedirectToUnauthorized { location }
            | GateDecision::RedirectToLanding { location } => Some(location),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionGate {
    config: GateConfig,
    secret: String,
    bypass: bool,
}

impl SessionGate {
    pub fn new(config: GateConfig, secret: impl Into<String>, production: bool) -> Self {
        let bypass = config.bypass && !production;
        Self {
            config,
            secret: secret.into(),
            bypass,
        }
    }

    pub fn from_config(app: &AppConfig) -> Self {
        Self::new(app.gate.clone(), app.session.jwt_secret.clone(), app.is_production())
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn classify(&self, path: &str) -> PathClass {
        classify(path, &self.config, self.bypass)
    }

    /// Evaluate a request. Never fails: every credential problem resolves to
    /// a redirect.
    pub fn decide(&self, path: &str, credential: Option<&str>) -> GateDecision {
        match self.classify(path) {
            PathClass::Root => match self.verify(credential) {
                Some(_) => GateDecision::RedirectToLanding {
                    location: self.config.landing_path.clone(),
                },
                None => GateDecision::Allow(None),
            },
            PathClass::Public | PathClass::StaticAsset | PathClass::Bypassed => {
                GateDecision::Allow(None)
            }
            PathClass::Protected => match self.verify(credential) {
                Some(identity) => GateDecision::Allow(Some(identity)),
                None => self.login_redirect(path),
            },
            PathClass::RoleGated(required) => match self.verify(credential) {
                Some(identity) if identity.has_any_role(&required) => {
                    GateDecision::Allow(Some(identity))
                }
                Some(identity) => {
                    tracing::debug!(
                        subject = %identity.subject,
                        path,
                        "role check failed, required one of {:?}",
                        required
                    );
                    GateDecision::RedirectToUnauthorized {
                        location: self.config.unauthorized_path.clone(),
                    }
                }
                None => self.login_redirect(path),
            },
        }
    }

    fn verify(&self, credential: Option<&str>) -> Option<Identity> {
        let token = credential?;
        match decode_credential(token, &self.secret) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::debug!("credential rejected: {}", e);
                None
            }
        }
    }

    fn login_redirect(&self, from: &str) -> GateDecision {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("from", from)
            .finish();
        GateDecision::RedirectToLogin {
            location: format!("{}?{}", self.config.login_path, query),
        }
    }
}
