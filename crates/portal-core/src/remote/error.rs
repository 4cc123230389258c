//! Remote sync errors

use thiserror::Error;

/// Errors that can occur while talking to the content API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Request never produced a response (DNS, TLS, timeout, ...)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Service answered with a non-success status
    #[error("Remote API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Write rejected because the revision token was stale or missing
    #[error("Remote write conflict ({status}): {message}. The database changed remotely; pull before pushing again.")]
    WriteConflict { status: u16, message: String },

    /// Repository could not be reached with the configured credentials
    #[error("Connection test failed: {message}")]
    Connection { message: String },

    /// Remote file exists but does not hold a valid database
    #[error("Invalid remote database: {0}")]
    InvalidDocument(String),

    /// Remote settings cannot be used to build requests
    #[error("Invalid remote configuration: {0}")]
    Config(String),
}

impl RemoteError {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        RemoteError::Transport {
            message: err.to_string(),
        }
    }

    /// Whether repeating the operation may succeed
    ///
    /// Nothing in this crate retries; callers decide.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::WriteConflict { .. } | RemoteError::Transport { .. }
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Api { status, .. } | RemoteError::WriteConflict { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Classify a rejected replace request
///
/// The contents API answers 409 when the supplied sha does not match the
/// stored blob, and 422 when a sha is required but was not supplied.
pub fn classify_write_failure(status: u16, message: String) -> RemoteError {
    match status {
        409 | 412 => RemoteError::WriteConflict { status, message },
        422 if message.to_lowercase().contains("sha") => {
            RemoteError::WriteConflict { status, message }
        }
        _ => RemoteError::Api { status, message },
    }
}
