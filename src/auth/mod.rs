use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims carried by a Tagline credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Older tokens carry a single role string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, email: impl Into<String>, roles: Vec<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            email: email.into(),
            roles,
            role: None,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Role set with the legacy single-role claim merged in
    pub fn role_set(&self) -> Vec<String> {
        let mut roles = self.roles.clone();
        if let Some(role) = &self.role {
            if !roles.iter().any(|r| r == role) {
                roles.push(role.clone());
            }
        }
        roles
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Missing credential")]
    Missing,

    #[error("Malformed credential: {0}")]
    Malformed(String),

    #[error("Credential expired")]
    Expired,

    #[error("Credential signature invalid")]
    InvalidSignature,

    #[error("JWT secret not configured")]
    SecretNotConfigured,
}

/// Verified identity extracted from a credential
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub subject: String,
    pub email: String,
    pub roles: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Raw token, forwarded to the backend on proxied calls
    #[serde(skip)]
    pub token: String,
}

impl Identity {
    pub fn has_any_role(&self, required: &[String]) -> bool {
        required.iter().any(|r| self.roles.iter().any(|own| own == r))
    }
}

/// Decode and verify a credential. The only decode path in the crate: the
/// session gate and every handler that needs the identity go through here.
pub fn decode_credential(token: &str, secret: &str) -> Result<Identity, CredentialError> {
    if secret.is_empty() {
        return Err(CredentialError::SecretNotConfigured);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(CredentialError::Missing);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => CredentialError::Expired,
        ErrorKind::InvalidSignature => CredentialError::InvalidSignature,
        _ => CredentialError::Malformed(e.to_string()),
    })?;

    let claims = token_data.claims;
    let roles = claims.role_set();
    Ok(Identity {
        subject: claims.sub,
        email: claims.email,
        roles,
        issued_at: timestamp(claims.iat)?,
        expires_at: timestamp(claims.exp)?,
        token: token.to_string(),
    })
}

/// Sign claims with the shared secret. Tokens are normally minted by the
/// backend; this is used by the CLI and tests.
pub fn encode_credential(claims: &Claims, secret: &str) -> Result<String, CredentialError> {
    if secret.is_empty() {
        return Err(CredentialError::SecretNotConfigured);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| CredentialError::Malformed(e.to_string()))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, CredentialError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| CredentialError::Malformed(format!("timestamp out of range: {}", secs)))
}
