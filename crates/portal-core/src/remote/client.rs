//! Remote sync client
//!
//! Loads and replaces the database file in a remote repository. Writes use
//! optimistic concurrency: every save first reads the file's current
//! revision and hands it back with the replacement, so the service rejects
//! the write if someone else changed the file in between.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::SecondsFormat;
use tracing::{debug, info, warn};

use super::api::{ContentApi, ContentLocation, PutContent, RevisionToken};
use super::error::RemoteError;
use super::github::GithubContentApi;
use crate::config::RemoteConfig;
use crate::models::{now_millis, Document};

/// Result of reading the remote database
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// No file at the configured path yet
    NotFound,
    /// The stored document and the revision it was read at
    Found {
        document: Document,
        revision: RevisionToken,
    },
}

/// Sync client for the database file in a remote repository
pub struct RemoteStore<A = GithubContentApi> {
    api: A,
    location: ContentLocation,
}

impl RemoteStore<GithubContentApi> {
    /// Create a client for the GitHub contents API
    pub fn github(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let api = GithubContentApi::new(config)?;
        Self::new(api, config)
    }
}

impl<A: ContentApi> RemoteStore<A> {
    /// Create a client over any content API implementation
    pub fn new(api: A, config: &RemoteConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            api,
            location: ContentLocation::from_config(config)?,
        })
    }

    pub fn location(&self) -> &ContentLocation {
        &self.location
    }

    /// Access the underlying content API
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Read the remote document and its revision
    pub async fn fetch(&self) -> Result<FetchOutcome, RemoteError> {
        let Some(file) = self.api.get_content(&self.location).await? else {
            debug!("No remote database at {}", self.location);
            return Ok(FetchOutcome::NotFound);
        };

        let document = decode_document(&file.content)?;
        info!(
            "Fetched remote database {} at revision {}",
            self.location, file.revision
        );
        Ok(FetchOutcome::Found {
            document,
            revision: file.revision,
        })
    }

    /// Revision of the remote file right now, `None` if it does not exist
    ///
    /// Never cached: each call goes to the service.
    pub async fn current_revision(&self) -> Result<Option<RevisionToken>, RemoteError> {
        Ok(self
            .api
            .get_content(&self.location)
            .await?
            .map(|file| file.revision))
    }

    /// Replace the remote document
    ///
    /// Reads the current revision, then submits the replacement conditioned
    /// on it. The revision is omitted only when the file does not exist.
    /// Returns the revision of the newly written file.
    pub async fn save(&self, document: &Document) -> Result<RevisionToken, RemoteError> {
        let sha = self.current_revision().await?;
        if sha.is_none() {
            info!("Creating remote database at {}", self.location);
        }

        let request = PutContent {
            message: format!(
                "Update database: {}",
                now_millis().to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            content: encode_document(document)?,
            branch: self.location.branch.clone(),
            sha,
        };

        match self.api.put_content(&self.location, &request).await {
            Ok(revision) => {
                info!("Saved remote database {} at revision {}", self.location, revision);
                Ok(revision)
            }
            Err(e) => {
                warn!("Saving remote database {} failed: {}", self.location, e);
                Err(e)
            }
        }
    }

    /// Check that the repository is reachable with the configured token
    ///
    /// Only touches the repository, not the database file.
    pub async fn test_connection(&self) -> Result<(), RemoteError> {
        self.api
            .get_repository(&self.location)
            .await
            .map_err(|e| RemoteError::Connection {
                message: format!("cannot access repository {}: {}", self.location.full_name(), e),
            })
    }
}

/// Serialize a document into the content API's base64 payload
pub fn encode_document(document: &Document) -> Result<String, RemoteError> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

/// Parse a base64 payload, which the API wraps at 60 columns
pub fn decode_document(content: &str) -> Result<Document, RemoteError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::InvalidDocument(format!("content is not valid base64: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RemoteError::InvalidDocument(format!("content is not a database: {}", e)))
}
