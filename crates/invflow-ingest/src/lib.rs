//! Invflow Ingest Library
//!
//! Retrieves a tab-separated inventory, converts it to JSON and computes
//! maximum, minimum and median over one numeric column.
//!
//! # Stages
//!
//! - **fetcher**: HTTP GET with bounded exponential-backoff retry
//! - **convert**: TSV text to an ordered list of records, written as JSON
//! - **loader**: JSON dataset back into memory
//! - **stats**: column statistics, written as JSON
//! - **pipeline**: runs the stages in order and reports the failing stage
//!
//! # Example
//!
//! ```no_run
//! use invflow_ingest::{PipelineConfig, PipelineRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runner = PipelineRunner::new(PipelineConfig::with_data_dir("./data"))?;
//!     let report = runner.run().await.into_result()?;
//!     tracing::info!(median = report.statistics.median, "Done");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod config;
pub mod convert;
pub mod fetcher;
pub mod loader;
pub mod pipeline;
pub mod stats;

// Re-export commonly used types
pub use cli::Cli;
pub use config::{PipelineConfig, RetryPolicy, WorkflowFile};
pub use convert::{FieldCountPolicy, TsvToJsonConverter};
pub use fetcher::RetryingFetcher;
pub use pipeline::{ExitOutcome, PipelineError, PipelineReport, PipelineRunner, Stage};
