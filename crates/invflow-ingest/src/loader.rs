//! Reads a persisted inventory back into memory

use invflow_common::{InventoryDataset, InvflowError, Result};
use std::path::Path;
use tracing::debug;

/// Load the JSON array of string-valued objects at `path`.
///
/// Record order equals array order and key order equals object order.
pub fn load(path: impl AsRef<Path>) -> Result<InventoryDataset> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(InvflowError::invalid_argument("dataset path cannot be empty"));
    }

    let metadata = std::fs::metadata(path).map_err(|e| InvflowError::io(path, e))?;
    if !metadata.is_file() {
        return Err(InvflowError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let bytes = std::fs::read(path).map_err(|e| InvflowError::io(path, e))?;
    let dataset: InventoryDataset = serde_json::from_slice(&bytes)
        .map_err(|e| InvflowError::malformed(format!("{}: {}", path.display(), e)))?;

    debug!(path = %path.display(), records = dataset.len(), "Loaded dataset");
    Ok(dataset)
}
