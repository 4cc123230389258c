//! Storage error handling
//!
//! Provides typed errors for local mirror operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the local mirror
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Mirror could not be parsed and was moved aside
    #[error("Database at '{path}' is corrupted: {details}. It has been moved to '{backup_path}'.")]
    CorruptDocument {
        path: PathBuf,
        backup_path: PathBuf,
        details: String,
    },

    /// File content is not in the expected format
    #[error("Invalid format in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// Document could not be serialized
    #[error("Failed to serialize database: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Create an error from a failed write with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Create an error from a failed read with path context
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ => StorageError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::CorruptDocument { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions on the data directory.")
            }
            StorageError::CorruptDocument { .. } => {
                Some("The corrupted file was kept next to the database. Recover data from it manually, or pull from the remote repository.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_io(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_read_error_classification() {
        let io_err = io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8");
        let err = StorageError::from_read(io_err, PathBuf::from("/data/database.json"));

        assert!(matches!(err, StorageError::ReadError { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_corrupt_document_display() {
        let err = StorageError::CorruptDocument {
            path: PathBuf::from("/data/database.json"),
            backup_path: PathBuf::from("/data/database.json.corrupt"),
            details: "expected value at line 1 column 1".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("corrupted"));
        assert!(msg.contains("database.json.corrupt"));
        assert!(err.recovery_suggestion().is_some());
    }
}
