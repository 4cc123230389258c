//! Storage layer
//!
//! Handles the durable local mirror of the portal database.
//!
//! The mirror is a fallback copy: it is written after every mutation and
//! read at startup when the remote repository has no usable document.

pub mod error;
pub mod mirror;

pub use error::{StorageError, StorageResult};
pub use mirror::LocalMirror;
