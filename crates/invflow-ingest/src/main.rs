//! Invflow - inventory fetch, convert and statistics pipeline

use anyhow::Result;
use clap::Parser;
use invflow_common::fs::human_size;
use invflow_common::logging::{init_logging, LogConfig, LogLevel};
use invflow_ingest::{Cli, ExitOutcome, PipelineRunner};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("invflow")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;
    info!("Started");

    let config = cli.pipeline_config()?;
    let runner = PipelineRunner::new(config)?;
    let outcome = runner.run().await;

    match &outcome {
        ExitOutcome::Completed(report) => {
            info!(
                records = report.records,
                dataset = %report.dataset_path.display(),
                dataset_size = %human_size(report.dataset_bytes),
                stats = %report.stats_path.display(),
                stats_size = %human_size(report.stats_bytes),
                "Pipeline complete"
            );
        },
        ExitOutcome::Failed(e) => {
            error!(stage = %e.stage, "{}", e);
        },
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
