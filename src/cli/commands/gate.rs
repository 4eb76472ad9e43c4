use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::gate::{GateDecision, SessionGate};

#[derive(Subcommand)]
pub enum GateCommands {
    #[command(about = "Show how the gate would handle a request to PATH")]
    Check {
        #[arg(help = "Request path, e.g. /admin/users")]
        path: String,
    },
}

pub async fn handle(cmd: GateCommands, token: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        GateCommands::Check { path } => {
            let app = config::config();
            let gate = SessionGate::from_config(app);
            let class = gate.classify(&path);
            let decision = gate.decide(&path, token.as_deref());

            let (outcome, location, subject) = match &decision {
                GateDecision::Allow(identity) => ("allow", None, identity.as_ref().map(|i| i.subject.clone())),
                GateDecision::RedirectToLogin { location } => ("redirect_login", Some(location.clone()), None),
                GateDecision::RedirectToUnauthorized { location } => {
                    ("redirect_unauthorized", Some(location.clone()), None)
                }
                GateDecision::RedirectToLanding { location } => ("redirect_landing", Some(location.clone()), None),
            };

            let message = match &location {
                Some(location) => format!("{} {} -> {}", outcome, path, location),
                None => format!("{} {}", outcome, path),
            };

            output_success(
                &output_format,
                &message,
                Some(json!({
                    "path": path,
                    "class": format!("{:?}", class),
                    "decision": outcome,
                    "location": location,
                    "subject": subject,
                })),
            )
        }
    }
}
