//! Error types for invflow
//!
//! Every pipeline stage reports failures through [`InvflowError`]. Only the
//! fetch stage recovers from anything internally; all other variants are
//! terminal for the run that raised them.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for invflow operations
pub type Result<T> = std::result::Result<T, InvflowError>;

/// Main error type for invflow
#[derive(Error, Debug)]
pub enum InvflowError {
    /// A required input (URL, path, column name) is absent, empty or invalid
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file or response could not be parsed into the expected shape
    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Empty input: no header line found")]
    EmptyInput,

    #[error("Row on line {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Column '{column}' is missing from record {record}")]
    MissingColumn { column: String, record: usize },

    #[error("Value '{value}' in column '{column}' of record {record} is not a finite number")]
    NotNumeric {
        column: String,
        record: usize,
        value: String,
    },

    #[error("Statistics requested over an empty dataset")]
    EmptyDataset,

    /// Non-retryable HTTP status, returned without consuming retry budget
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempt(s): {last_error}")]
    ConnectionExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl InvflowError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a malformed data error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedData(msg.into())
    }

    /// Wrap an IO error with the path it happened on.
    ///
    /// `NotFound` IO errors are promoted to [`InvflowError::NotFound`].
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    pub fn is_connection_exhausted(&self) -> bool {
        matches!(self, Self::ConnectionExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_is_promoted() {
        let err = InvflowError::io(
            "missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, InvflowError::NotFound(ref p) if p == Path::new("missing.json")));
    }

    #[test]
    fn test_io_other_kind_keeps_source() {
        let err = InvflowError::io(
            "data.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, InvflowError::Io { .. }));
        assert!(err.to_string().contains("data.json"));
    }

    #[test]
    fn test_display_names_position() {
        let err = InvflowError::NotNumeric {
            column: "Volume 2015".to_string(),
            record: 3,
            value: "n/a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Value 'n/a' in column 'Volume 2015' of record 3 is not a finite number"
        );
    }

    #[test]
    fn test_is_connection_exhausted() {
        let err = InvflowError::ConnectionExhausted {
            url: "http://localhost".to_string(),
            attempts: 3,
            last_error: "HTTP 503".to_string(),
        };
        assert!(err.is_connection_exhausted());
        assert!(!InvflowError::EmptyDataset.is_connection_exhausted());
    }
}
