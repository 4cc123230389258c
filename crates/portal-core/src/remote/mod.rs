//! Remote sync for the shared database file
//!
//! Stores the whole document as one JSON file in a repository and replaces
//! it through the repository's content API.
//!
//! ## Protocol
//!
//! 1. Read the file to learn its current revision (absent on first write)
//! 2. Base64-encode the serialized document
//! 3. Replace the file, passing the revision back so the service can
//!    reject the write if the file changed in between
//!
//! ## Usage
//!
//! ```ignore
//! let remote = RemoteStore::github(&remote_config)?;
//! remote.test_connection().await?;
//! remote.save(&document).await?;
//! ```

mod api;
mod client;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod github;

pub use api::{ContentApi, ContentLocation, PutContent, RemoteFile, RevisionToken};
pub use client::{decode_document, encode_document, FetchOutcome, RemoteStore};
pub use error::{classify_write_failure, RemoteError};
pub use github::GithubContentApi;
