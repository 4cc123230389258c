//! Remote repository command handlers

use anyhow::{bail, Context, Result};

use portal_core::{PortalError, RemoteError, RemoteStore, Store};

use crate::output::Output;

/// Build the client for the configured remote, or explain how to set one
pub fn connect(store: &Store) -> Result<RemoteStore> {
    let Some(ref remote) = store.config().remote else {
        bail!(
            "No remote configured. Set one with:\n  \
             portal config set remote.repo owner/name\n  \
             portal config set remote.token <token>"
        );
    };
    RemoteStore::github(remote).context("Failed to set up remote client")
}

/// Check that the repository is reachable with the configured credentials
pub async fn test(store: &Store, output: &Output) -> Result<()> {
    let remote = connect(store)?;
    output.message(&format!("Connecting to {}...", remote.location()));

    remote.test_connection().await?;

    output.success(&format!("Connected to {}", remote.location()));
    Ok(())
}

/// Upload the current database
pub async fn push(store: &Store, output: &Output) -> Result<()> {
    let remote = connect(store)?;
    output.message(&format!("Pushing database to {}...", remote.location()));

    match store.push(&remote).await {
        Ok(revision) => {
            output.success(&format!("Push complete - revision {}", revision));
            Ok(())
        }
        Err(PortalError::Remote(e @ RemoteError::WriteConflict { .. })) => Err(anyhow::Error::new(e)
            .context("Push rejected. Run `portal remote pull` and repeat your change.")),
        Err(e) => Err(e.into()),
    }
}

/// Replace the local database with the remote copy
pub async fn pull(store: &mut Store, output: &Output) -> Result<()> {
    let remote = connect(store)?;
    output.message(&format!("Pulling database from {}...", remote.location()));

    if store.pull(&remote).await? {
        output.success("Pull complete - database updated");
        output.message(&format!(
            "  Users: {}, Requests: {}",
            store.user_count(),
            store.request_count()
        ));
    } else {
        output.success("Remote has no database yet - nothing to pull");
    }
    Ok(())
}
