//! Command-line interface for the `invflow` binary

use crate::config::{
    PipelineConfig, RetryPolicy, WorkflowFile, DEFAULT_BACKOFF_FACTOR_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_TIMEOUT_SECS,
};
use crate::convert::FieldCountPolicy;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Invflow - fetch an inventory TSV, convert it to JSON and compute column statistics
#[derive(Parser, Debug)]
#[command(name = "invflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Workflow file (JSON) naming the fetch, convert and stats steps
    #[arg(short, long, env = "INVFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that relative artifact paths resolve against
    #[arg(short, long, env = "INVFLOW_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Source URL, overriding the workflow file
    #[arg(long, env = "INVFLOW_URL")]
    pub url: Option<String>,

    /// Column to compute statistics over, overriding the workflow file
    #[arg(long, env = "INVFLOW_COLUMN")]
    pub column: Option<String>,

    /// Total fetch attempts, first request included
    #[arg(long, env = "INVFLOW_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds; doubles after each failed attempt
    #[arg(long, env = "INVFLOW_BACKOFF_MS", default_value_t = DEFAULT_BACKOFF_FACTOR_MS)]
    pub backoff_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "INVFLOW_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Also retry on 401, 403 and 404
    #[arg(long)]
    pub strict_retry: bool,

    /// Fill missing trailing fields with empty strings instead of failing
    #[arg(long)]
    pub pad_short_rows: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve flags, environment and the optional workflow file into a
    /// validated [`PipelineConfig`].
    pub fn pipeline_config(&self) -> invflow_common::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => WorkflowFile::load(path)?.resolve(&self.data_dir)?,
            None => PipelineConfig::with_data_dir(&self.data_dir),
        };

        if let Some(url) = &self.url {
            config.source_url = url.clone();
        }
        if let Some(column) = &self.column {
            config.column = column.clone();
        }

        let policy = if self.strict_retry {
            RetryPolicy::strict()
        } else {
            RetryPolicy::default()
        };
        config.retry = policy
            .with_max_attempts(self.max_attempts)
            .with_backoff_factor(Duration::from_millis(self.backoff_ms))
            .with_timeout(Duration::from_secs(self.timeout_secs));

        config.field_policy = if self.pad_short_rows {
            FieldCountPolicy::PadShort
        } else {
            FieldCountPolicy::Strict
        };

        config.validate()?;
        Ok(config)
    }
}
