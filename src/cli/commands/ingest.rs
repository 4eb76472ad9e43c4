use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::backend::{BackendClient, BackendError, JobState};
use crate::cli::utils::{output_error, output_event, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::progress::{ConnectionState, LiveProgressClient};

#[derive(Subcommand)]
pub enum IngestCommands {
    #[command(about = "Show the current ingest job status")]
    Status,

    #[command(about = "Start an ingest job")]
    Start {
        #[arg(long, help = "Scan without writing anything")]
        dry_run: bool,
    },

    #[command(about = "Cancel the running ingest job")]
    Cancel,

    #[command(about = "Follow live ingest progress until interrupted")]
    Watch {
        #[arg(long, help = "Resume from this RFC3339 timestamp")]
        since: Option<DateTime<Utc>>,

        #[arg(long, help = "Exit once the job reaches a terminal state")]
        until_done: bool,
    },
}

fn backend(token: Option<String>) -> anyhow::Result<BackendClient> {
    let client = BackendClient::new(&config::config().backend).context("failed to build backend client")?;
    Ok(match token {
        Some(token) => client.with_token(token),
        None => client,
    })
}

pub async fn handle(cmd: IngestCommands, token: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = backend(token)?;

    match cmd {
        IngestCommands::Status => {
            let status = client.ingest_status().await?;
            let message = match &status.job_id {
                Some(job) => format!("job {} is {:?}", job, status.status),
                None => format!("ingest is {:?}", status.status),
            };
            output_success(&output_format, &message, Some(serde_json::to_value(&status)?))
        }
        IngestCommands::Start { dry_run } => match client.start_ingest(dry_run).await {
            Ok(result) => output_success(&output_format, "ingest started", Some(result)),
            Err(BackendError::Conflict(message)) => {
                output_error(&output_format, &message, Some("ALREADY_RUNNING"))?;
                std::process::exit(1);
            }
            Err(e) => Err(e.into()),
        },
        IngestCommands::Cancel => {
            let result = client.cancel_ingest().await?;
            output_success(&output_format, "ingest cancelled", Some(result))
        }
        IngestCommands::Watch { since, until_done } => watch(client, since, until_done, output_format).await,
    }
}

async fn watch(
    client: BackendClient,
    since: Option<DateTime<Utc>>,
    until_done: bool,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let progress = LiveProgressClient::for_backend(client, &config::config().progress);
    if let Some(since) = since {
        progress.resume_from(since);
    }

    let format = output_format.clone();
    progress.subscribe(move |event| {
        if let Err(e) = output_event(&format, event) {
            tracing::warn!("failed to print progress event: {}", e);
        }
    });

    let mut state = progress.watch_state();
    let mut status = progress.watch_status();
    progress.start();

    let gave_up = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break false,
            changed = state.changed() => {
                if changed.is_err() || *state.borrow_and_update() == ConnectionState::Disconnected {
                    break true;
                }
            }
            changed = status.changed(), if until_done => {
                if changed.is_err() {
                    continue;
                }
                let finished = status
                    .borrow_and_update()
                    .as_ref()
                    .map_or(false, |s| matches!(s.status, JobState::Completed | JobState::Failed | JobState::Cancelled));
                if finished {
                    break false;
                }
            }
        }
    };

    let watermark = progress.watermark();
    progress.stop().await;

    if gave_up {
        output_error(&output_format, "progress channel unavailable, gave up reconnecting", Some("DISCONNECTED"))?;
        std::process::exit(1);
    }

    output_success(
        &output_format,
        "stopped watching",
        Some(json!({
            "watermark": watermark,
            "status": progress.job_status(),
        })),
    )
}
