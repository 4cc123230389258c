//! Status command handler

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;

use portal_core::{LoadSource, Store};

use crate::output::{format_date, Output, OutputFormat};

fn source_name(source: LoadSource) -> &'static str {
    match source {
        LoadSource::Remote => "remote",
        LoadSource::Mirror => "mirror",
        LoadSource::Bootstrap => "bootstrap",
    }
}

/// Last mirror save, treating an unreadable timestamp as never saved
fn read_last_saved(store: &Store) -> Option<DateTime<Utc>> {
    match store.last_saved() {
        Ok(saved) => saved,
        Err(e) => {
            warn!("Ignoring unreadable last save time: {}", e);
            None
        }
    }
}

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let config = store.config();
    let last_saved = read_last_saved(store);
    let current_user = store.current_user();
    let pending = store.pending_requests().len();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "source": source_name(store.load_source()),
                    "remote": config.remote.as_ref().map(|r| format!("{}:{}@{}", r.repo, r.path, r.branch)),
                    "data_dir": config.data_dir,
                    "last_saved": last_saved.map(|t| t.to_rfc3339()),
                    "current_user": current_user.map(|u| u.username.clone()),
                    "counts": {
                        "users": store.user_count(),
                        "requests": store.request_count(),
                        "pending": pending
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", source_name(store.load_source()));
        }
        OutputFormat::Human => {
            println!("Portal Status");
            println!("=============");
            println!();
            println!("Database:");
            println!("  Loaded from: {}", source_name(store.load_source()));
            match config.remote {
                Some(ref remote) => {
                    println!("  Remote:      {}:{}@{}", remote.repo, remote.path, remote.branch)
                }
                None => println!("  Remote:      (not configured)"),
            }
            println!();
            println!("Storage:");
            println!("  Location:    {}", config.data_dir.display());
            println!(
                "  Last saved:  {}",
                last_saved
                    .map(format_date)
                    .unwrap_or_else(|| "never".to_string())
            );
            println!();
            println!("Contents:");
            println!("  Users:    {}", store.user_count());
            println!("  Requests: {} ({} pending)", store.request_count(), pending);
            println!();
            match current_user {
                Some(user) => println!("Logged in as {} ({})", user.username, user.role),
                None => println!("Not logged in"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::Config;
    use tempfile::TempDir;

    #[test]
    fn test_unreadable_last_save_reads_as_never() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        let store = Store::open(config.clone());
        assert!(read_last_saved(&store).is_some());

        std::fs::write(config.last_save_path(), "yesterday-ish").unwrap();
        assert!(store.last_saved().is_err());
        assert!(read_last_saved(&store).is_none());
    }
}
