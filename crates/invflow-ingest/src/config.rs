//! Pipeline configuration
//!
//! [`PipelineConfig`] is built once, either from defaults or from a workflow
//! file, and handed to the runner. Nothing is recomputed from the execution
//! context after that.

use crate::convert::FieldCountPolicy;
use invflow_common::{fs, InvflowError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

// ============================================================================
// Defaults
// ============================================================================

/// Inventory published for the workflow exercise.
pub const DEFAULT_INVENTORY_URL: &str =
    "https://raw.githubusercontent.com/enigma-io/workflow-interview-challenge/master/inventory.tsv";

pub const DEFAULT_DATASET_FILE: &str = "data.json";

pub const DEFAULT_STATS_FILE: &str = "stats.json";

pub const DEFAULT_COLUMN: &str = "Volume 2015";

/// Total GET attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub const DEFAULT_BACKOFF_FACTOR_MS: u64 = 100;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Added on top of the defaults by [`RetryPolicy::strict`].
pub const STRICT_EXTRA_RETRY_STATUSES: [u16; 3] = [401, 403, 404];

// ============================================================================
// Retry policy
// ============================================================================

/// Bounded retry with exponential backoff for the fetch stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of requests allowed, first attempt included
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles after each further one
    pub backoff_factor: Duration,

    /// HTTP statuses that are retried instead of failing immediately
    pub retry_statuses: Vec<u16>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: Duration::from_millis(DEFAULT_BACKOFF_FACTOR_MS),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    /// Default policy that also retries 401, 403 and 404.
    pub fn strict() -> Self {
        let mut policy = Self::default();
        policy.retry_statuses.extend(STRICT_EXTRA_RETRY_STATUSES);
        policy
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based):
    /// `backoff_factor * 2^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let multiplier = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff_factor.saturating_mul(multiplier)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(InvflowError::invalid_argument("max attempts must be at least 1"));
        }

        if self.timeout.is_zero() {
            return Err(InvflowError::invalid_argument("request timeout must be greater than 0"));
        }

        Ok(())
    }
}

// ============================================================================
// Pipeline configuration
// ============================================================================

/// Everything a pipeline run needs, resolved up front
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub source_url: String,

    /// Intermediate JSON dataset written by the convert stage
    pub dataset_path: PathBuf,

    /// Statistics output
    pub stats_path: PathBuf,

    pub column: String,
    pub retry: RetryPolicy,
    pub field_policy: FieldCountPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_data_dir(".")
    }
}

impl PipelineConfig {
    pub fn new(
        source_url: impl Into<String>,
        dataset_path: impl Into<PathBuf>,
        stats_path: impl Into<PathBuf>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            dataset_path: dataset_path.into(),
            stats_path: stats_path.into(),
            column: column.into(),
            retry: RetryPolicy::default(),
            field_policy: FieldCountPolicy::default(),
        }
    }

    /// Default URL, file names and column, with artifacts under `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self::new(
            DEFAULT_INVENTORY_URL,
            data_dir.join(DEFAULT_DATASET_FILE),
            data_dir.join(DEFAULT_STATS_FILE),
            DEFAULT_COLUMN,
        )
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_field_policy(mut self, policy: FieldCountPolicy) -> Self {
        self.field_policy = policy;
        self
    }

    /// Reject absent inputs before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.source_url.trim().is_empty() {
            return Err(InvflowError::invalid_argument("source URL cannot be empty"));
        }

        if self.dataset_path.as_os_str().is_empty() {
            return Err(InvflowError::invalid_argument("dataset path cannot be empty"));
        }

        if self.stats_path.as_os_str().is_empty() {
            return Err(InvflowError::invalid_argument("statistics path cannot be empty"));
        }

        if fs::normalize_path(&self.dataset_path)? == fs::normalize_path(&self.stats_path)? {
            return Err(InvflowError::invalid_argument(format!(
                "dataset and statistics paths must differ, both resolve to '{}'",
                self.stats_path.display()
            )));
        }

        if self.column.trim().is_empty() {
            return Err(InvflowError::invalid_argument("column name cannot be empty"));
        }

        self.retry.validate()
    }
}

// ============================================================================
// Workflow file
// ============================================================================

pub const FETCH_STEP: &str = "fetch";
pub const CONVERT_STEP: &str = "convert";
pub const STATS_STEP: &str = "stats";

/// On-disk description of which step reads from which file.
///
/// ```json
/// {
///   "workflow": [
///     { "name": "fetch", "input": "https://example.org/data/", "filename": "inventory.tsv" },
///     { "name": "convert", "input": "fetch", "filename": "data.json" },
///     { "name": "stats", "input": "data.json", "filename": "stats.json",
///       "extra": [{ "column_name": "Volume 2015" }] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowFile {
    pub workflow: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub input: String,

    #[serde(default)]
    pub extra: Vec<StepExtra>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepExtra {
    #[serde(default)]
    pub column_name: Option<String>,
}

impl WorkflowFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| InvflowError::io(path, e))?;
        Self::from_json(&content).map_err(|e| match e {
            InvflowError::MalformedData(msg) => {
                InvflowError::malformed(format!("{}: {}", path.display(), msg))
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| InvflowError::malformed(format!("invalid workflow file: {}", e)))
    }

    pub fn step(&self, name: &str) -> Result<&WorkflowStep> {
        self.workflow
            .iter()
            .find(|step| step.name == name)
            .ok_or_else(|| {
                InvflowError::invalid_argument(format!("workflow has no '{}' step", name))
            })
    }

    /// Resolve the three steps into a [`PipelineConfig`].
    ///
    /// Relative artifact paths are joined onto `data_dir`.
    pub fn resolve(&self, data_dir: impl AsRef<Path>) -> Result<PipelineConfig> {
        let data_dir = data_dir.as_ref();
        let fetch = self.step(FETCH_STEP)?;
        let convert = self.step(CONVERT_STEP)?;
        let stats = self.step(STATS_STEP)?;

        let source_url = join_source_url(&fetch.input, &fetch.filename)?;

        if !convert.input.is_empty() && convert.input != FETCH_STEP {
            return Err(InvflowError::invalid_argument(format!(
                "'{}' step must read from '{}', not '{}'",
                CONVERT_STEP, FETCH_STEP, convert.input
            )));
        }
        if convert.filename.trim().is_empty() {
            return Err(InvflowError::invalid_argument(format!(
                "'{}' step needs a filename",
                CONVERT_STEP
            )));
        }
        if stats.input != convert.filename {
            return Err(InvflowError::invalid_argument(format!(
                "'{}' step reads '{}' but '{}' writes '{}'",
                STATS_STEP, stats.input, CONVERT_STEP, convert.filename
            )));
        }
        if stats.filename.trim().is_empty() {
            return Err(InvflowError::invalid_argument(format!(
                "'{}' step needs a filename",
                STATS_STEP
            )));
        }

        let column = stats
            .extra
            .first()
            .and_then(|extra| extra.column_name.clone())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                InvflowError::invalid_argument(format!(
                    "'{}' step needs extra[0].column_name",
                    STATS_STEP
                ))
            })?;

        Ok(PipelineConfig::new(
            source_url,
            resolve_path(data_dir, &convert.filename),
            resolve_path(data_dir, &stats.filename),
            column,
        ))
    }
}

fn resolve_path(data_dir: &Path, name: &str) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        path
    } else {
        data_dir.join(path)
    }
}

/// `base` joined with `filename`; an empty file name keeps `base` as is.
fn join_source_url(base: &str, filename: &str) -> Result<String> {
    if base.trim().is_empty() {
        return Err(InvflowError::invalid_argument(format!(
            "'{}' step needs an input URL",
            FETCH_STEP
        )));
    }

    if filename.is_empty() {
        return Ok(base.to_string());
    }

    let mut base_url = Url::parse(base)
        .map_err(|e| InvflowError::invalid_argument(format!("invalid URL '{}': {}", base, e)))?;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    base_url
        .join(filename)
        .map(String::from)
        .map_err(|e| InvflowError::invalid_argument(format!("invalid file name '{}': {}", filename, e)))
}
