use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub gate: GateConfig,
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub cookie_name: String,
    pub cookie_max_age_secs: i64,
    pub secure_cookie: bool,
}

/// Path classification table consumed by the session gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub public_paths: Vec<String>,
    pub public_prefixes: Vec<String>,
    pub static_extensions: Vec<String>,
    pub role_rules: Vec<RoleRule>,
    pub login_path: String,
    pub unauthorized_path: String,
    pub landing_path: String,
    /// Skip credential checks entirely. Ignored in production.
    pub bypass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRule {
    pub prefix: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_retries: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("TAGLINE_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }

        // Backend overrides
        if let Ok(v) = env::var("BACKEND_URL") {
            self.backend.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("BACKEND_API_PREFIX") {
            self.backend.api_prefix = v;
        }
        if let Ok(v) = env::var("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.parse().unwrap_or(self.backend.timeout_secs);
        }

        // Session overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.session.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_COOKIE_NAME") {
            self.session.cookie_name = v;
        }
        if let Ok(v) = env::var("AUTH_COOKIE_MAX_AGE_SECS") {
            self.session.cookie_max_age_secs = v.parse().unwrap_or(self.session.cookie_max_age_secs);
        }

        // Gate overrides
        if let Ok(v) = env::var("GATE_PUBLIC_PATHS") {
            self.gate.public_paths = split_list(&v);
        }
        if let Ok(v) = env::var("GATE_PUBLIC_PREFIXES") {
            self.gate.public_prefixes = split_list(&v);
        }
        if let Ok(v) = env::var("AUTH_BYPASS") {
            self.gate.bypass = v.parse().unwrap_or(self.gate.bypass);
        }

        // Progress overrides
        if let Ok(v) = env::var("PROGRESS_BASE_DELAY_MS") {
            self.progress.base_delay_ms = v.parse().unwrap_or(self.progress.base_delay_ms);
        }
        if let Ok(v) = env::var("PROGRESS_MAX_DELAY_MS") {
            self.progress.max_delay_ms = v.parse().unwrap_or(self.progress.max_delay_ms);
        }
        if let Ok(v) = env::var("PROGRESS_MAX_RETRIES") {
            self.progress.max_retries = v.parse().unwrap_or(self.progress.max_retries);
        }

        // Bypass is a local development aid only
        if self.is_production() && self.gate.bypass {
            tracing::warn!("AUTH_BYPASS ignored in production");
            self.gate.bypass = false;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                api_prefix: "/api/v1".to_string(),
                timeout_secs: 30,
            },
            session: SessionConfig {
                jwt_secret: String::new(),
                cookie_name: "auth_token".to_string(),
                cookie_max_age_secs: 60 * 60 * 24 * 7, // 1 week
                secure_cookie: false,
            },
            gate: GateConfig::default(),
            progress: ProgressConfig {
                base_delay_ms: 1000,
                max_delay_ms: 30_000,
                max_retries: 5,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.backend.timeout_secs = 15;
        config.session.secure_cookie = true;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.backend.timeout_secs = 10;
        config.session.secure_cookie = true;
        config
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            public_paths: ["/", "/login", "/unauthorized", "/health", "/auth/verify"]
                .into_iter()
                .map(String::from)
                .collect(),
            public_prefixes: ["/api/auth/", "/_next/", "/static/"]
                .into_iter()
                .map(String::from)
                .collect(),
            static_extensions: [
                "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "css", "js", "map", "woff",
                "woff2", "txt",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            role_rules: vec![
                RoleRule {
                    prefix: "/admin".to_string(),
                    roles: vec!["admin".to_string()],
                },
                RoleRule {
                    prefix: "/api/admin".to_string(),
                    roles: vec!["admin".to_string()],
                },
            ],
            login_path: "/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            landing_path: "/library".to_string(),
            bypass: false,
        }
    }
}

impl ProgressConfig {
    pub fn base_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.max_delay_ms)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        $crate::config::CONFIG.is_production()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.session.cookie_name, "auth_token");
        assert_eq!(config.session.cookie_max_age_secs, 604_800);
        assert!(!config.session.secure_cookie);
        assert_eq!(config.progress.max_retries, 5);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert!(config.session.secure_cookie);
        assert!(!config.gate.bypass);
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list("/a, /b,,"), vec!["/a".to_string(), "/b".to_string()]);
    }
}
