use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{error_message, BackendError, JobStatus, LoginRequest, MagicLinkRequest, TokenResponse};
use crate::config::BackendConfig;

/// HTTP client for the Tagline backend. Cheap to clone; `with_token` returns
/// a copy that forwards the caller's credential.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    /// No overall timeout: event streams stay open indefinitely
    stream_http: reqwest::Client,
    base_url: String,
    api_prefix: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let stream_http = reqwest::Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            http,
            stream_http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_prefix: config.api_prefix.clone(),
            token: None,
        })
    }

    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn login(&self, payload: &LoginRequest) -> Result<TokenResponse, BackendError> {
        let resp = self.request(Method::POST, "/auth/login").json(payload).send().await?;
        decode(check(resp).await?).await
    }

    pub async fn request_magic_link(&self, payload: &MagicLinkRequest) -> Result<Value, BackendError> {
        let resp = self
            .request(Method::POST, "/auth/magic-link")
            .json(payload)
            .send()
            .await?;
        decode_or_empty(check(resp).await?).await
    }

    pub async fn verify_magic_link(&self, token: &str) -> Result<TokenResponse, BackendError> {
        let resp = self
            .request(Method::POST, "/auth/magic-link/verify")
            .json(&json!({ "token": token }))
            .send()
            .await?;
        decode(check(resp).await?).await
    }

    pub async fn ingest_status(&self) -> Result<JobStatus, BackendError> {
        let resp = self.request(Method::GET, "/ingest/status").send().await?;
        decode(check(resp).await?).await
    }

    /// Start an ingest run. A run already in progress surfaces as `Conflict`.
    pub async fn start_ingest(&self, dry_run: bool) -> Result<Value, BackendError> {
        let resp = self
            .request(Method::POST, "/ingest/start")
            .json(&json!({ "dry_run": dry_run }))
            .send()
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Conflict(
                error_message(&body).unwrap_or_else(|| "An ingest job is already running".to_string()),
            ));
        }

        decode_or_empty(check(resp).await?).await
    }

    pub async fn cancel_ingest(&self) -> Result<Value, BackendError> {
        let resp = self.request(Method::POST, "/ingest/cancel").send().await?;
        decode_or_empty(check(resp).await?).await
    }

    /// Open the ingest event stream. The caller owns the streaming body.
    pub async fn open_event_stream(&self, since: Option<DateTime<Utc>>) -> Result<Response, BackendError> {
        let mut builder = self
            .stream_http
            .get(self.url("/ingest/events"))
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache");

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(since) = since {
            builder = builder.query(&[("since", since.to_rfc3339_opts(SecondsFormat::Millis, true))]);
        }

        check(builder.send().await?).await
    }

    /// Forward a JSON call verbatim (library and admin endpoints)
    pub async fn forward_json(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, BackendError> {
        let mut url = self.url(path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        decode_or_empty(check(builder.send().await?).await?).await
    }

    /// Liveness probe used by the health endpoint
    pub async fn ping(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Turn non-2xx responses into a `BackendError` carrying the backend's message
async fn check(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Backend request failed")
            .to_string()
    });

    Err(match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        _ => BackendError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

async fn decode_or_empty(resp: Response) -> Result<Value, BackendError> {
    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
}
