//! Portal Core Library
//!
//! This crate provides the core functionality for the portal: user
//! accounts, bug requests processed by an admin, and persistence of the
//! whole state as a single JSON document.
//!
//! # Architecture
//!
//! - **Document**: the in-memory state, the unit of persistence and sync
//! - **Local mirror**: a copy on disk written after every mutation
//! - **Remote store**: the same document as a file in a repository,
//!   replaced with optimistic concurrency through the content API
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open(Config::load()?);
//!
//! // Log in and submit a request
//! let user = store.login("alice", "secret")?;
//! store.record_bug_request(&user.username, "62812345", BugType::CrashAndroid)?;
//! ```
//!
//! # Modules
//!
//! - `store`: Session state and operations (main entry point)
//! - `models`: Document, User and BugRequest
//! - `document`: Pure operations over the document
//! - `storage`: Local mirror persistence
//! - `remote`: Content API sync client
//! - `config`: Application configuration

pub mod config;
mod document;
pub mod error;
pub mod models;
pub mod remote;
pub mod storage;
pub mod store;

pub use config::{BootstrapAdmin, Config, RemoteConfig};
pub use error::{AuthFailure, PortalError, PortalResult};
pub use models::{BugRequest, BugType, Document, RequestStatus, Role, User};
pub use remote::{FetchOutcome, RemoteError, RemoteStore, RevisionToken};
pub use storage::{LocalMirror, StorageError};
pub use store::{LoadSource, Store};
