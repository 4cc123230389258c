//! In-memory content API for tests
//!
//! Behaves like the contents API for a single file: revisions change on
//! every write and a replace carrying a stale or missing revision is
//! rejected.

use std::sync::Mutex;

use super::api::{ContentApi, ContentLocation, PutContent, RemoteFile, RevisionToken};
use super::client::encode_document;
use super::error::{classify_write_failure, RemoteError};
use crate::models::Document;

/// Calls made against the fake, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Get,
    Put,
    Repository,
}

#[derive(Default)]
struct State {
    file: Option<RemoteFile>,
    writes: u32,
    read_failure: Option<RemoteError>,
    racer: Option<RevisionToken>,
    repository_denied: bool,
    calls: Vec<Recorded>,
    puts: Vec<PutContent>,
}

#[derive(Default)]
pub struct FakeContentApi {
    state: Mutex<State>,
}

impl FakeContentApi {
    /// A repository without the database file
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose database file holds `doc` at revision `sha`
    pub fn with_document(doc: &Document, sha: &str) -> Self {
        let api = Self::new();
        api.external_write(doc, sha);
        api
    }

    /// Replace the file as another writer would, without recording a call
    pub fn external_write(&self, doc: &Document, sha: &str) {
        let content = encode_document(doc).unwrap();
        self.state().file = Some(RemoteFile {
            content,
            revision: RevisionToken::new(sha),
        });
    }

    /// Fail every read with `err`
    pub fn fail_reads(&self, err: RemoteError) {
        self.state().read_failure = Some(err);
    }

    /// Have another writer land `sha` just before the next replace
    pub fn race_next_put(&self, sha: &str) {
        self.state().racer = Some(RevisionToken::new(sha));
    }

    pub fn deny_repository(&self) {
        self.state().repository_denied = true;
    }

    pub fn puts(&self) -> Vec<PutContent> {
        self.state().puts.clone()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.state().calls.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ContentApi for FakeContentApi {
    async fn get_content(
        &self,
        _location: &ContentLocation,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        let mut state = self.state();
        state.calls.push(Recorded::Get);
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        Ok(state.file.clone())
    }

    async fn put_content(
        &self,
        _location: &ContentLocation,
        request: &PutContent,
    ) -> Result<RevisionToken, RemoteError> {
        let mut state = self.state();
        state.calls.push(Recorded::Put);
        state.puts.push(request.clone());

        if let Some(racer) = state.racer.take() {
            if let Some(file) = state.file.as_mut() {
                file.revision = racer;
            }
        }

        let current = state.file.as_ref().map(|f| f.revision.clone());
        match (&current, &request.sha) {
            (None, None) => {}
            (Some(current), Some(sha)) if current == sha => {}
            (Some(_), None) => {
                return Err(classify_write_failure(
                    422,
                    "Invalid request.\n\n\"sha\" wasn't supplied.".to_string(),
                ));
            }
            (_, Some(sha)) => {
                return Err(classify_write_failure(
                    409,
                    format!("database.json does not match {}", sha),
                ));
            }
        }

        state.writes += 1;
        let revision = RevisionToken::new(format!("sha-write-{}", state.writes));
        state.file = Some(RemoteFile {
            content: request.content.clone(),
            revision: revision.clone(),
        });
        Ok(revision)
    }

    async fn get_repository(&self, _location: &ContentLocation) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.calls.push(Recorded::Repository);
        if state.repository_denied {
            return Err(RemoteError::Api {
                status: 404,
                message: "Not Found".to_string(),
            });
        }
        Ok(())
    }
}
