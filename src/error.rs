//! Error types for hoard.

use thiserror::Error;

/// Common error type for hoard.
#[derive(Error, Debug)]
pub enum HoardError {
    /// Target path escapes the storage root or cannot be normalized.
    ///
    /// Raised at the boundary of every operation that accepts a path,
    /// before any storage is touched.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A declared chunk was absent at assembly time.
    ///
    /// Retryable: the client re-submits the named chunk and triggers the
    /// merge again. Remaining staged chunks are left intact.
    #[error("missing chunk {0}")]
    MissingChunk(u32),

    /// Lookup or delete on a path/id that has neither a record nor a
    /// physical entry.
    #[error("{0} not found")]
    NotFound(String),

    /// Create where the path is already taken by a different record.
    #[error("path already in use: {0}")]
    PathConflict(String),

    /// A subtree delete could not remove every member. The index was left
    /// consistent with whatever physical state remains.
    #[error("partial delete under {path}: {removed} removed, {remaining} remaining")]
    PartialDelete {
        path: String,
        removed: usize,
        remaining: usize,
    },

    /// Invalid input that passed the transport layer but violates a core
    /// contract (chunk index out of range, conflicting chunk totals).
    #[error("validation error: {0}")]
    Validation(String),

    /// Database error.
    ///
    /// Wraps errors from the backing store as strings so the variant does
    /// not tie the public error type to a driver.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for HoardError {
    fn from(e: sqlx::Error) -> Self {
        HoardError::Database(e.to_string())
    }
}

/// Result type alias for hoard operations.
pub type Result<T> = std::result::Result<T, HoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let err = HoardError::InvalidPath("../escape".to_string());
        assert_eq!(err.to_string(), "invalid path: ../escape");
    }

    #[test]
    fn test_missing_chunk_display() {
        let err = HoardError::MissingChunk(3);
        assert_eq!(err.to_string(), "missing chunk 3");
    }

    #[test]
    fn test_not_found_display() {
        let err = HoardError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_path_conflict_display() {
        let err = HoardError::PathConflict("docs/report.pdf".to_string());
        assert_eq!(err.to_string(), "path already in use: docs/report.pdf");
    }

    #[test]
    fn test_partial_delete_display() {
        let err = HoardError::PartialDelete {
            path: "docs".to_string(),
            removed: 2,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "partial delete under docs: 2 removed, 1 remaining"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HoardError = io_err.into();
        assert!(matches!(err, HoardError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(HoardError::Validation("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
