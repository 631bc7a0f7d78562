//! Filesystem helpers for pipeline artifacts
//!
//! Artifacts are written through a temporary file in the destination
//! directory and then persisted over the target path, so a reader never
//! observes a half-written file and a failed write leaves no file behind.

use crate::error::{InvflowError, Result};
use byte_unit::{Byte, UnitType};
use serde::Serialize;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Create the parent directory of `path` (and its ancestors) if missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| InvflowError::io(parent, e))
        },
        _ => Ok(()),
    }
}

/// Atomically replace `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| InvflowError::io(dir, e))?;
    tmp.write_all(contents)
        .map_err(|e| InvflowError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| InvflowError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| InvflowError::io(path, e.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "Artifact written");
    Ok(())
}

/// Serialize `value` as JSON and atomically write it to `path`.
///
/// Returns the number of bytes written.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<u64> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(|e| InvflowError::malformed(format!("cannot serialize {}: {}", path.display(), e)))?;

    write_atomic(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Delete `path` if it exists. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(InvflowError::io(path, e)),
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
///
/// Symlinks are not followed, so two names for one file through a link
/// still compare unequal.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| InvflowError::io(path, e))?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                normalized.pop();
            },
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Size of the file at `path` in bytes.
pub fn file_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| InvflowError::io(path, e))
}

/// Human readable binary size, e.g. `1.50 KiB`.
pub fn human_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{adjusted:.2}")
}
