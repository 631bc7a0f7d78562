//! Inventory pipeline orchestration
//!
//! Runs the fixed sequence `fetching -> converting -> loading ->
//! computing-stats`. Each stage's output is the next stage's input and the
//! first failure ends the run:
//!
//! 1. Fetch the TSV from the source URL (retried inside the fetcher only)
//! 2. Convert it and write the JSON dataset
//! 3. Load the dataset back from disk
//! 4. Compute column statistics and write them
//!
//! There is no resume. A failed run leaves no artifact from the failed
//! stage onwards and must be started again from the beginning.

use crate::config::PipelineConfig;
use crate::convert::{write_dataset, TsvToJsonConverter};
use crate::fetcher::RetryingFetcher;
use crate::{loader, stats};
use invflow_common::{fs, InvflowError, StatisticsResult};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn, Instrument};

/// One step of the pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Fetching,
    Converting,
    Loading,
    ComputingStats,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Converting => "converting",
            Stage::Loading => "loading",
            Stage::ComputingStats => "computing-stats",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a run: which stage and why
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: InvflowError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: InvflowError) -> Self {
        Self { stage, source }
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub source_url: String,
    pub records: usize,
    pub dataset_path: PathBuf,
    pub dataset_bytes: u64,
    pub stats_path: PathBuf,
    pub stats_bytes: u64,
    pub statistics: StatisticsResult,
}

/// Final state of a run
#[derive(Debug)]
pub enum ExitOutcome {
    Completed(PipelineReport),
    Failed(PipelineError),
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Completed(_))
    }

    /// Process exit status: 0 success, 2 network retries exhausted, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExitOutcome::Completed(_) => 0,
            ExitOutcome::Failed(e) if e.source.is_connection_exhausted() => 2,
            ExitOutcome::Failed(_) => 1,
        }
    }

    pub fn into_result(self) -> Result<PipelineReport, PipelineError> {
        match self {
            ExitOutcome::Completed(report) => Ok(report),
            ExitOutcome::Failed(e) => Err(e),
        }
    }
}

fn at(stage: Stage) -> impl FnOnce(InvflowError) -> PipelineError {
    move |source| PipelineError::new(stage, source)
}

/// Runs one configured pipeline
pub struct PipelineRunner {
    config: PipelineConfig,
    fetcher: RetryingFetcher,
    converter: TsvToJsonConverter,
}

impl PipelineRunner {
    /// Validate `config` and build the stage components. No I/O happens here.
    pub fn new(config: PipelineConfig) -> invflow_common::Result<Self> {
        config.validate()?;
        let fetcher = RetryingFetcher::new(config.retry.clone())?;
        let converter = TsvToJsonConverter::new().with_policy(config.field_policy);

        Ok(Self {
            config,
            fetcher,
            converter,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once, in order.
    pub async fn run(&self) -> ExitOutcome {
        info!(
            url = %self.config.source_url,
            dataset = %self.config.dataset_path.display(),
            stats = %self.config.stats_path.display(),
            column = %self.config.column,
            "Starting inventory pipeline"
        );

        match self.execute().await {
            Ok(report) => {
                info!(
                    records = report.records,
                    maximum = report.statistics.maximum,
                    minimum = report.statistics.minimum,
                    median = report.statistics.median,
                    "Pipeline finished"
                );
                ExitOutcome::Completed(report)
            },
            Err(e) => {
                error!(stage = %e.stage, error = %e.source, "Pipeline failed");
                self.discard_artifacts_from(e.stage);
                ExitOutcome::Failed(e)
            },
        }
    }

    async fn execute(&self) -> Result<PipelineReport, PipelineError> {
        let config = &self.config;

        let text = self
            .fetcher
            .fetch(&config.source_url)
            .instrument(info_span!("stage", name = %Stage::Fetching))
            .await
            .map_err(at(Stage::Fetching))?;

        let (records, dataset_bytes) = {
            let _span = info_span!("stage", name = %Stage::Converting).entered();
            let dataset = self.converter.convert(&text).map_err(at(Stage::Converting))?;
            fs::ensure_parent_dir(&config.dataset_path).map_err(at(Stage::Converting))?;
            let bytes = write_dataset(&dataset, &config.dataset_path)
                .map_err(at(Stage::Converting))?;
            log_artifact("dataset", &config.dataset_path, bytes);
            (dataset.len(), bytes)
        };

        let dataset = {
            let _span = info_span!("stage", name = %Stage::Loading).entered();
            loader::load(&config.dataset_path).map_err(at(Stage::Loading))?
        };

        let (statistics, stats_bytes) = {
            let _span = info_span!("stage", name = %Stage::ComputingStats).entered();
            fs::ensure_parent_dir(&config.stats_path).map_err(at(Stage::ComputingStats))?;
            let statistics = stats::compute_and_write(&dataset, &config.column, &config.stats_path)
                .map_err(at(Stage::ComputingStats))?;
            let bytes = fs::file_size(&config.stats_path).map_err(at(Stage::ComputingStats))?;
            log_artifact("statistics", &config.stats_path, bytes);
            (statistics, bytes)
        };

        Ok(PipelineReport {
            source_url: config.source_url.clone(),
            records,
            dataset_path: config.dataset_path.clone(),
            dataset_bytes,
            stats_path: config.stats_path.clone(),
            stats_bytes,
            statistics,
        })
    }

    /// Remove artifacts that the failed stage or a later one would have produced.
    fn discard_artifacts_from(&self, failed: Stage) {
        let mut stale = Vec::new();
        if failed <= Stage::Converting {
            stale.push(&self.config.dataset_path);
        }
        stale.push(&self.config.stats_path);

        for path in stale {
            match fs::remove_if_exists(path) {
                Ok(true) => warn!(path = %path.display(), "Removed stale artifact"),
                Ok(false) => {},
                Err(e) => warn!(path = %path.display(), error = %e, "Could not remove stale artifact"),
            }
        }
    }
}

fn log_artifact(kind: &str, path: &Path, bytes: u64) {
    info!(
        kind,
        path = %path.display(),
        size = %fs::human_size(bytes),
        "Wrote artifact"
    );
}
