//! Content API seam
//!
//! The three repository calls the sync client needs, behind a trait so the
//! optimistic-concurrency protocol can be exercised without a network.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::RemoteError;
use crate::config::RemoteConfig;

/// Opaque identifier of one stored version of the remote file
///
/// Handed back to the service unchanged on the next write; never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the database lives: repository, file path and branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: String,
}

impl ContentLocation {
    /// Validate remote settings into a location
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let (owner, repo) = config
            .repo
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| {
                RemoteError::Config(format!(
                    "repository must be in 'owner/name' form, got '{}'",
                    config.repo
                ))
            })?;

        let path = config.path.trim_matches('/');
        if path.is_empty() {
            return Err(RemoteError::Config("database path must not be empty".to_string()));
        }

        if config.branch.is_empty() {
            return Err(RemoteError::Config("branch must not be empty".to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            branch: config.branch.clone(),
        })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for ContentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}@{}", self.owner, self.repo, self.path, self.branch)
    }
}

/// A file as returned by the content API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Base64 content, possibly wrapped across lines
    pub content: String,
    pub revision: RevisionToken,
}

/// Body of a create-or-replace request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutContent {
    /// Commit message
    pub message: String,
    /// Base64 encoded file content
    pub content: String,
    pub branch: String,
    /// Revision being replaced; absent only for the first write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<RevisionToken>,
}

/// Repository content operations consumed by the sync client
#[allow(async_fn_in_trait)]
pub trait ContentApi {
    /// Fetch a file and its revision; `Ok(None)` when it does not exist
    async fn get_content(&self, location: &ContentLocation)
        -> Result<Option<RemoteFile>, RemoteError>;

    /// Create or replace a file, returning the new revision
    async fn put_content(
        &self,
        location: &ContentLocation,
        request: &PutContent,
    ) -> Result<RevisionToken, RemoteError>;

    /// Check that the repository exists and is accessible
    async fn get_repository(&self, location: &ContentLocation) -> Result<(), RemoteError>;
}
