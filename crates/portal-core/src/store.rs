//! Unified storage interface
//!
//! The `Store` owns the session's document and coordinates between:
//! - the in-memory document (answers every query)
//! - the local mirror (written after every mutation)
//! - the remote repository (read at startup, written only on request)
//!
//! ## Loading
//!
//! The document comes from the first source that yields one: the remote
//! repository, then the local mirror, then a fresh document holding only
//! the bootstrap admin. Loading never fails; each source that cannot be
//! used is logged and skipped.
//!
//! ## Usage
//!
//! ```ignore
//! let remote = RemoteStore::github(&remote_config)?;
//! let mut store = Store::load(config, Some(&remote)).await;
//!
//! store.login("alice", "secret")?;
//! store.record_bug_request("alice", "62812345", BugType::CrashAndroid)?;
//! store.push(&remote).await?;
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::PortalResult;
use crate::models::{now_millis, BugRequest, BugType, Document, User};
use crate::remote::{ContentApi, FetchOutcome, RemoteStore, RevisionToken};
use crate::storage::{LocalMirror, StorageResult};

/// Where the session's document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Mirror,
    Bootstrap,
}

/// Session state for the portal
pub struct Store {
    doc: Document,
    mirror: LocalMirror,
    config: Config,
    /// Username of the logged-in user
    session: Option<String>,
    source: LoadSource,
}

impl Store {
    /// Open the store from the local mirror only
    ///
    /// Falls back to a bootstrap document when the mirror is missing or
    /// unreadable.
    pub fn open(config: Config) -> Self {
        let mirror = LocalMirror::new(config.clone());
        let (doc, source) = load_local(&config, &mirror);
        Self::assemble(config, mirror, doc, source)
    }

    /// Open the store, trying the remote repository first
    pub async fn load<A: ContentApi>(config: Config, remote: Option<&RemoteStore<A>>) -> Self {
        let mirror = LocalMirror::new(config.clone());

        if let Some(remote) = remote {
            match remote.fetch().await {
                Ok(FetchOutcome::Found { document, revision }) => {
                    info!("Loaded database from {} ({})", remote.location(), revision);
                    return Self::assemble(config, mirror, document, LoadSource::Remote);
                }
                Ok(FetchOutcome::NotFound) => {
                    info!("No database at {}, using local mirror", remote.location());
                }
                Err(e) => {
                    warn!("Failed to load remote database, using local mirror: {}", e);
                }
            }
        }

        let (doc, source) = load_local(&config, &mirror);
        Self::assemble(config, mirror, doc, source)
    }

    fn assemble(config: Config, mirror: LocalMirror, doc: Document, source: LoadSource) -> Self {
        let mut store = Self {
            doc,
            mirror,
            config,
            session: None,
            source,
        };
        store.restore_session(now_millis());
        store
    }

    /// Resume a persisted login if the account is still valid
    fn restore_session(&mut self, now: DateTime<Utc>) {
        let username = match self.mirror.load_session() {
            Ok(Some(username)) => username,
            Ok(None) => return,
            Err(e) => {
                warn!("Ignoring unreadable session: {}", e);
                return;
            }
        };

        match self.doc.find_user(&username) {
            Some(user) if !user.is_expired(now) => {
                debug!("Restored session for {}", username);
                self.session = Some(username);
            }
            Some(_) => {
                info!("Session for {} ended: account expired", username);
                self.forget_session();
            }
            None => {
                info!("Session for {} ended: account no longer exists", username);
                self.forget_session();
            }
        }
    }

    fn forget_session(&mut self) {
        self.session = None;
        if let Err(e) = self.mirror.clear_session() {
            warn!("Failed to clear session: {}", e);
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the current document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    // ==================== Session ====================

    /// Check credentials against the current document
    pub fn authenticate(&self, username: &str, password: &str) -> PortalResult<User> {
        Ok(self
            .doc
            .authenticate(username, password, now_millis())?
            .clone())
    }

    /// Authenticate and remember the user for later invocations
    pub fn login(&mut self, username: &str, password: &str) -> PortalResult<User> {
        let user = self.authenticate(username, password)?;
        self.mirror.save_session(&user.username)?;
        self.session = Some(user.username.clone());
        info!("Logged in as {}", user.username);
        Ok(user)
    }

    pub fn logout(&mut self) -> PortalResult<()> {
        self.mirror.clear_session()?;
        if let Some(username) = self.session.take() {
            info!("Logged out {}", username);
        }
        Ok(())
    }

    /// The logged-in user, if any
    pub fn current_user(&self) -> Option<&User> {
        self.session
            .as_deref()
            .and_then(|username| self.doc.find_user(username))
    }

    // ==================== Mutations ====================

    /// Submit a bug request on behalf of `owner`
    pub fn record_bug_request(
        &mut self,
        owner: &str,
        target: &str,
        bug_type: BugType,
    ) -> PortalResult<BugRequest> {
        let request =
            self.commit(|doc, now| doc.record_bug_request(owner, target, bug_type, now))?;
        info!("Recorded bug request {} from {}", request.id, owner);
        Ok(request)
    }

    /// Add a regular account expiring `expiry_days` from now
    pub fn create_user(
        &mut self,
        username: &str,
        password: &str,
        expiry_days: i64,
    ) -> PortalResult<User> {
        let user = self.commit(|doc, now| doc.create_user(username, password, expiry_days, now))?;
        info!("Created user {} (expires {})", user.username, user.expiry);
        Ok(user)
    }

    /// Mark a bug request completed
    ///
    /// Processing an already completed request is a no-op.
    pub fn mark_processed(&mut self, id: i64) -> PortalResult<BugRequest> {
        let (request, changed) = self.commit(|doc, now| doc.mark_processed(id, now))?;
        if changed {
            info!("Processed bug request {}", id);
        } else {
            debug!("Bug request {} was already completed", id);
        }
        Ok(request)
    }

    /// Apply a mutation to a copy of the document and persist it
    ///
    /// The session document is only replaced once the mirror write
    /// succeeded, and nothing is written when the mutation changed nothing.
    fn commit<T>(
        &mut self,
        mutate: impl FnOnce(&mut Document, DateTime<Utc>) -> PortalResult<T>,
    ) -> PortalResult<T> {
        let mut next = self.doc.clone();
        let out = mutate(&mut next, now_millis())?;
        if next != self.doc {
            self.mirror.save(&next)?;
            self.doc = next;
        }
        Ok(out)
    }

    // ==================== Queries ====================

    /// Requests submitted by `username`
    pub fn requests_for(&self, username: &str) -> Vec<&BugRequest> {
        self.doc.requests_for(username).collect()
    }

    /// All requests, in submission order
    pub fn bug_requests(&self) -> &[BugRequest] {
        &self.doc.bug_requests
    }

    pub fn pending_requests(&self) -> Vec<&BugRequest> {
        self.doc.pending_requests().collect()
    }

    /// Non-admin accounts
    pub fn regular_users(&self) -> Vec<&User> {
        self.doc.regular_users().collect()
    }

    pub fn user_count(&self) -> usize {
        self.doc.users.len()
    }

    pub fn request_count(&self) -> usize {
        self.doc.bug_requests.len()
    }

    /// When the local mirror was last written
    pub fn last_saved(&self) -> StorageResult<Option<DateTime<Utc>>> {
        self.mirror.last_saved()
    }

    // ==================== Remote ====================

    /// Write the current document to the remote repository
    pub async fn push<A: ContentApi>(&self, remote: &RemoteStore<A>) -> PortalResult<RevisionToken> {
        Ok(remote.save(&self.doc).await?)
    }

    /// Replace the session document with the remote one
    ///
    /// Returns `false` and leaves everything untouched when the remote
    /// repository has no database yet.
    pub async fn pull<A: ContentApi>(&mut self, remote: &RemoteStore<A>) -> PortalResult<bool> {
        match remote.fetch().await? {
            FetchOutcome::NotFound => Ok(false),
            FetchOutcome::Found { document, revision } => {
                self.mirror.save(&document)?;
                self.doc = document;
                self.source = LoadSource::Remote;
                info!("Pulled database at revision {}", revision);
                Ok(true)
            }
        }
    }
}

/// Read the mirror, or synthesize and persist a bootstrap document
fn load_local(config: &Config, mirror: &LocalMirror) -> (Document, LoadSource) {
    match mirror.load() {
        Ok(Some(doc)) => {
            debug!("Loaded database from {:?}", config.database_path());
            return (doc, LoadSource::Mirror);
        }
        Ok(None) => debug!("No local database at {:?}", config.database_path()),
        Err(e) => warn!("Failed to load local database: {}", e),
    }

    let admin = &config.bootstrap_admin;
    let doc = Document::bootstrap(&admin.username, &admin.password, now_millis());
    if let Err(e) = mirror.save(&doc) {
        warn!("Failed to persist bootstrap database: {}", e);
    }
    info!("Initialized new database with admin account '{}'", admin.username);
    (doc, LoadSource::Bootstrap)
}
