use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use magpie::action::ActionSequence;
use magpie::chrome::ChromeSession;
use magpie::config::EngineConfig;
use magpie::harvester::ExtractedRecord;
use magpie::http::ReqwestApi;
use magpie::logging::TracingLog;
use magpie::orchestrator::{Orchestrator, RunContext};

/// Replay a declarative action sequence against a seed URL and collect the
/// extracted records.
#[derive(Parser)]
#[command(name = "magpie", version, about)]
struct Cli {
    /// Seed URL or API endpoint the sequence runs against
    #[arg(long)]
    url: String,

    /// Path to the authored action sequence (JSON)
    #[arg(long)]
    actions: PathBuf,

    /// Where to write the records as JSON; prints to stdout when absent
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    record_count: usize,
    failure_count: usize,
    records: Vec<ExtractedRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("magpie=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;

    let raw = std::fs::read_to_string(&cli.actions)
        .with_context(|| format!("reading action file {}", cli.actions.display()))?;
    let sequence = ActionSequence::from_json(&raw)?;
    info!("Loaded {} actions from {}", sequence.actions.len(), cli.actions.display());

    let page = ChromeSession::launch(&config.browser)?;
    let api = ReqwestApi::new(&config.http)?;
    let log = TracingLog;

    let orchestrator = Orchestrator::new(&page, &api, &log, &config);
    let started_at = Utc::now();
    let outcome = orchestrator
        .run(&sequence, &RunContext::new(cli.url.clone()))
        .await?;
    let finished_at = Utc::now();

    for failure in &outcome.failures {
        warn!("{}: {}", failure.context, failure.error);
    }

    let report = RunReport {
        started_at,
        finished_at,
        record_count: outcome.records.len(),
        failure_count: outcome.failures.len(),
        records: outcome.records,
    };
    let rendered = serde_json::to_string_pretty(&report)?;

    match &cli.out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing records to {}", path.display()))?;
            info!(
                "Wrote {} records to {}",
                report.record_count,
                path.display()
            );
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
