//! Invflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error handling and I/O helpers for the invflow workspace.
//!
//! - **Error Handling**: [`InvflowError`], the failure taxonomy of every stage
//! - **Types**: [`Record`], [`InventoryDataset`], [`StatisticsResult`]
//! - **Filesystem**: atomic artifact writes, directory bootstrap, size reporting
//! - **Logging**: `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use invflow_common::{fs, InventoryDataset, Result};
//! use std::path::Path;
//!
//! fn save(dataset: &InventoryDataset) -> Result<()> {
//!     let path = Path::new("data/data.json");
//!     fs::ensure_parent_dir(path)?;
//!     let bytes = fs::write_json_atomic(path, dataset, true)?;
//!     tracing::info!(size = %fs::human_size(bytes), "Saved dataset");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fs;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{InvflowError, Result};
pub use types::{InventoryDataset, Record, StatisticsResult};
