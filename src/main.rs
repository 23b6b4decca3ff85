//! feedback-pulse binary entrypoint.
//! Runs one ingestion batch and exits.

use clap::Parser;
use std::process::ExitCode;

use feedback_pulse::cli::Args;
use feedback_pulse::runner;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; missing file is fine.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let path = args.config_path();

    match runner::launch(&path).await {
        Ok(summary) => {
            tracing::info!(
                target: "pipeline",
                cache_entries = summary.cache_entries,
                outcome = ?summary.report.outcome,
                "run finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "run failed");
            eprintln!("feedback-pulse: {e:#}");
            ExitCode::FAILURE
        }
    }
}
