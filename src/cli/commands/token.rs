use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::auth::{decode_credential, encode_credential, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Sign a credential with JWT_SECRET (local development only)")]
    Mint {
        #[arg(help = "Subject identifier")]
        subject: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long = "role", help = "Role label, repeatable")]
        roles: Vec<String>,
        #[arg(long, default_value_t = 24, help = "Lifetime in hours (negative for an expired token)")]
        hours: i64,
    },

    #[command(about = "Verify a credential and show its identity")]
    Inspect {
        #[arg(help = "Credential to verify")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let app = config::config();
    let secret = &app.session.jwt_secret;

    match cmd {
        TokenCommands::Mint { subject, email, roles, hours } => {
            if crate::is_production!() {
                anyhow::bail!("refusing to mint credentials in production");
            }
            let claims = Claims::new(subject, email, roles, lifetime(hours)?);
            let token = encode_credential(&claims, secret).context("failed to sign credential")?;
            output_success(&output_format, "credential minted", Some(json!({ "token": token })))
        }
        TokenCommands::Inspect { token } => {
            let identity = decode_credential(&token, secret).context("credential rejected")?;
            output_success(&output_format, "credential valid", Some(serde_json::to_value(&identity)?))
        }
    }
}

/// Credential lifetime, refusing values that would overflow the expiry
fn lifetime(hours: i64) -> anyhow::Result<Duration> {
    Duration::try_hours(hours)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .with_context(|| format!("--hours {} is out of range", hours))
}
