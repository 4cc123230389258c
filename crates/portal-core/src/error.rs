//! Errors returned by store operations

use thiserror::Error;

use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Why a login attempt was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Your account has expired. Contact an admin.")]
    AccountExpired,
}

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Bad or missing input; the caller should re-prompt
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("Username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("Bug request {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl PortalError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    /// The authentication failure, if this error is one
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            PortalError::Auth(failure) => Some(*failure),
            _ => None,
        }
    }
}

/// Result type for store operations
pub type PortalResult<T> = Result<T, PortalError>;
