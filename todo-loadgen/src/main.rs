//! # Todo Load Generator
//!
//! Runs a named load plan against a todo API and prints a summary.
//! Exits with status 99 when a threshold is breached.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p todo-loadgen -- --scenario mixed
//! cargo run -p todo-loadgen -- --scenario create-users --vus 10 --duration 30s
//! cargo run -p todo-loadgen -- --scenario signups --threshold 'http_req_failed:rate<0.01'
//! ```

use clap::Parser;
use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};
use todo_loadgen::{
    client::ApiClient,
    metrics::{Metrics, Threshold},
    plan::{self, Overrides, PlanName, RunPlan},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when at least one threshold fails
const THRESHOLDS_FAILED: u8 = 99;

#[derive(Debug, Parser)]
#[command(name = "todo-loadgen", version, about = "Load generator for the todo API")]
struct Cli {
    /// Base URL of the API under test
    #[arg(long, env = "LOADGEN_BASE_URL", default_value = "http://localhost:3000")]
    base_url: String,

    /// Plan to run
    #[arg(long, value_enum, default_value = "mixed")]
    scenario: PlanName,

    /// Number of virtual users (replaces the plan's executor)
    #[arg(long)]
    vus: Option<usize>,

    /// Run for a fixed time, e.g. 30s or 2m (replaces the plan's executor)
    #[arg(long, value_parser = plan::parse_duration)]
    duration: Option<Duration>,

    /// Iterations per virtual user (replaces the plan's executor)
    #[arg(long)]
    iterations: Option<u64>,

    /// Extra pass/fail criterion, e.g. 'http_req_duration:p(95)<200'
    #[arg(long = "threshold")]
    thresholds: Vec<Threshold>,

    /// Per-request timeout
    #[arg(long, value_parser = plan::parse_duration, default_value = "10s")]
    request_timeout: Duration,

    /// Write the summary as JSON to this file
    #[arg(long)]
    summary_export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_loadgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let overrides = Overrides {
        vus: cli.vus,
        duration: cli.duration,
        iterations: cli.iterations,
    };
    let run_plan = RunPlan::build(cli.scenario, &overrides, cli.thresholds)?;

    tracing::info!(
        plan = run_plan.name,
        base_url = %cli.base_url,
        max_vus = run_plan.max_vus(),
        "Todo load generator v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let client = ApiClient::new(&cli.base_url, cli.request_timeout, Arc::new(Metrics::new()))?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, stopping virtual users...");
                cancel.cancel();
            }
        }
    });

    let summary = plan::run(&run_plan, &client, cancel).await?;
    println!("{}", summary);

    if let Some(path) = &cli.summary_export {
        tokio::fs::write(path, serde_json::to_vec_pretty(&summary)?).await?;
        tracing::info!("Summary written to {}", path.display());
    }

    let mut failed = false;
    for threshold in &run_plan.thresholds {
        let outcome = threshold.evaluate(&summary);
        let actual = outcome
            .actual
            .map_or_else(|| "no data".to_string(), |v| format!("{:.4}", v));
        let mark = if outcome.passed { "✓" } else { "✗" };
        println!("{} {} (actual: {})", mark, outcome.threshold, actual);
        failed |= !outcome.passed;
    }

    if failed {
        tracing::error!("Thresholds on metrics have been crossed");
        return Ok(ExitCode::from(THRESHOLDS_FAILED));
    }

    Ok(ExitCode::SUCCESS)
}
