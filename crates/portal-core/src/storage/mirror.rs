//! Local mirror of the portal database
//!
//! Keeps the whole document on disk so a session can boot without the
//! remote repository. Uses atomic writes (write to temp file, then rename)
//! to prevent corruption.
//!
//! Storage location: `~/.local/share/portal/` (configurable via `Config`)
//!
//! Files:
//! - `database.json` - The serialized document
//! - `last_save` - RFC 3339 timestamp of the last successful save
//! - `current_user` - Username of the logged-in session, if any

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::models::{now_millis, Document};

/// Persistence layer for the local mirror
pub struct LocalMirror {
    config: Config,
}

impl LocalMirror {
    /// Create a new mirror with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Write the document and the last-save timestamp
    pub fn save(&self, doc: &Document) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(doc)?;
        let database_path = self.config.database_path();
        atomic_write(&database_path, &json)?;

        let saved_at = now_millis().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        atomic_write(&self.config.last_save_path(), saved_at.as_bytes())?;

        debug!(
            "Saved database to {:?} ({} users, {} requests)",
            database_path,
            doc.users.len(),
            doc.bug_requests.len()
        );
        Ok(())
    }

    /// Load the document from disk
    ///
    /// Returns `None` if the database file doesn't exist. A file that
    /// cannot be parsed is moved aside and reported as `CorruptDocument`.
    pub fn load(&self) -> StorageResult<Option<Document>> {
        let path = self.config.database_path();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from_read(e, path)),
        };

        match serde_json::from_str(&content) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => Err(self.quarantine(&path, e.to_string())),
        }
    }

    /// Move an unreadable database out of the way
    fn quarantine(&self, path: &Path, details: String) -> StorageError {
        let backup_path = PathBuf::from(format!("{}.corrupt", path.display()));
        if let Err(e) = fs::rename(path, &backup_path) {
            warn!("Could not move corrupt database aside: {}", e);
            return StorageError::InvalidFormat {
                path: path.to_path_buf(),
                details,
            };
        }

        StorageError::CorruptDocument {
            path: path.to_path_buf(),
            backup_path,
            details,
        }
    }

    /// Timestamp of the last successful save, if any
    pub fn last_saved(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let path = self.config.last_save_path();
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };

        DateTime::parse_from_rfc3339(content.trim())
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| StorageError::InvalidFormat {
                path,
                details: e.to_string(),
            })
    }

    /// Persist the logged-in username
    pub fn save_session(&self, username: &str) -> StorageResult<()> {
        atomic_write(&self.config.session_path(), username.as_bytes())
    }

    /// Load the persisted username, if a session exists
    pub fn load_session(&self) -> StorageResult<Option<String>> {
        Ok(read_optional(&self.config.session_path())?
            .map(|name| name.trim_end_matches('\n').to_string())
            .filter(|name| !name.is_empty()))
    }

    /// Forget the persisted session
    pub fn clear_session(&self) -> StorageResult<()> {
        let path = self.config.session_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(e, path)),
        }
    }
}

/// Read a text file, treating a missing file as `None`
fn read_optional(path: &Path) -> StorageResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::from_read(e, path.to_path_buf())),
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BugRequest, BugType, User};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn sample_document() -> Document {
        let now = now_millis();
        Document {
            users: vec![
                User::bootstrap_admin("admin", "changeme", now),
                User::new("alice", "pw", 30, now).unwrap(),
            ],
            bug_requests: vec![BugRequest::new(1, "alice", "62812", BugType::CrashIos, now)],
            last_updated: Some(now),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mirror = LocalMirror::new(config.clone());

        assert!(!config.database_path().exists());
        assert!(mirror.load().unwrap().is_none());
        assert!(mirror.last_saved().unwrap().is_none());

        let doc = sample_document();
        mirror.save(&doc).unwrap();

        assert!(config.database_path().exists());
        assert_eq!(mirror.load().unwrap().unwrap(), doc);
        assert!(mirror.last_saved().unwrap().is_some());
    }

    #[test]
    fn test_corrupt_database_is_moved_aside() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mirror = LocalMirror::new(config.clone());

        fs::write(config.database_path(), "{not json").unwrap();

        let err = mirror.load().unwrap_err();
        match err {
            StorageError::CorruptDocument { backup_path, .. } => {
                assert!(backup_path.exists());
                assert_eq!(fs::read_to_string(backup_path).unwrap(), "{not json");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(!config.database_path().exists());
        assert!(mirror.load().unwrap().is_none());
    }

    #[test]
    fn test_session_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mirror = LocalMirror::new(test_config(&temp_dir));

        assert!(mirror.load_session().unwrap().is_none());

        mirror.save_session("alice").unwrap();
        assert_eq!(mirror.load_session().unwrap().as_deref(), Some("alice"));

        mirror.clear_session().unwrap();
        assert!(mirror.load_session().unwrap().is_none());

        // Clearing twice is fine
        mirror.clear_session().unwrap();
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("file.txt");

        atomic_write(&nested_path, b"test data").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
    }

    #[test]
    fn test_invalid_last_save() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mirror = LocalMirror::new(config.clone());

        fs::write(config.last_save_path(), "yesterday").unwrap();

        assert!(matches!(
            mirror.last_saved(),
            Err(StorageError::InvalidFormat { .. })
        ));
    }
}
