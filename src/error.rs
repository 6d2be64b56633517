//! Error types for CopySpec
//!
//! This module defines the error type shared by the permission model,
//! the filter pipeline and the copy orchestration.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for CopySpec operations
#[derive(Error, Debug)]
pub enum CopySpecError {
    /// I/O error during a copy, including encoding failures raised by filter stages
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// File being read or written when the error occurred
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed permission text, out-of-range mode or bad filter parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not available for this element (e.g. raw file of a filtered element)
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Attempt to mutate a permission value after it was finalized
    #[error("Permission is frozen: {0}")]
    PermissionFrozen(String),

    /// Two elements map to the same destination and the strategy forbids it
    #[error("Duplicate entry '{path}': {reason}")]
    DuplicateEntry {
        /// Destination-relative path shared by the colliding elements
        path: String,
        /// Why the collision was rejected
        reason: String,
    },

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,
}

impl CopySpecError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Check if this error came from user-supplied data rather than the filesystem
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::ConfigError(_) | Self::DuplicateEntry { .. }
        )
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::NotFound(path) => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for CopySpec operations
pub type Result<T> = std::result::Result<T, CopySpecError>;

impl From<std::io::Error> for CopySpecError {
    fn from(err: std::io::Error) -> Self {
        CopySpecError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CopySpecError {
    fn from(err: serde_json::Error) -> Self {
        CopySpecError::ConfigError(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| CopySpecError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CopySpecError::io("/test/path", io_err);
        assert!(err.path().is_some());
        assert_eq!(err.path().unwrap(), &PathBuf::from("/test/path"));
    }

    #[test]
    fn test_with_path_extension() {
        let res: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "bad byte",
        ));
        let err = res.with_path("/src/a.txt").unwrap_err();
        assert!(matches!(err, CopySpecError::Io { .. }));
        assert!(err.to_string().contains("/src/a.txt"));
    }

    #[test]
    fn test_duplicate_entry_message() {
        let err = CopySpecError::DuplicateEntry {
            path: "lib/a.txt".to_string(),
            reason: "strategy is fail".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate entry 'lib/a.txt': strategy is fail");
        assert!(err.path().is_none());
    }

    #[test]
    fn test_user_error_classification() {
        assert!(CopySpecError::invalid_input("x").is_user_error());
        assert!(CopySpecError::config("x").is_user_error());
        assert!(!CopySpecError::unsupported("x").is_user_error());
        assert!(!CopySpecError::NotFound(PathBuf::from("/x")).is_user_error());
    }
}
