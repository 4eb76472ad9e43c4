pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "tagline")]
#[command(about = "Tagline CLI - session gate checks and media ingest control")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "TAGLINE_TOKEN", hide_env_values = true, help = "Session credential (JWT)")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Evaluate the session gate for a path")]
    Gate {
        #[command(subcommand)]
        cmd: commands::gate::GateCommands,
    },

    #[command(about = "Media ingest job control and live progress")]
    Ingest {
        #[command(subcommand)]
        cmd: commands::ingest::IngestCommands,
    },

    #[command(about = "Mint and inspect development credentials")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let token = cli.token;

    match cli.command {
        Commands::Gate { cmd } => commands::gate::handle(cmd, token, output_format).await,
        Commands::Ingest { cmd } => commands::ingest::handle(cmd, token, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
    }
}
