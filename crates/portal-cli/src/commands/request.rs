//! Bug request command handlers

use anyhow::{bail, Result};

use portal_core::{BugRequest, BugType, Store};

use super::{require_admin, require_user};
use crate::output::Output;

/// Submit a bug request as the logged-in user
pub fn submit(store: &mut Store, target: String, bug_type: BugType, output: &Output) -> Result<()> {
    let user = require_user(store)?;
    if user.is_admin() {
        bail!("Admin accounts cannot submit bug requests. Log in as a regular user.");
    }

    let request = store.record_bug_request(&user.username, &target, bug_type)?;

    if output.is_json() || output.is_quiet() {
        output.print_request(&request);
    } else {
        output.success(&format!(
            "Bug request sent: {} ({})",
            request.target_number,
            request.bug_type.display_name()
        ));
    }
    Ok(())
}

/// List requests: all of them for admins, own requests otherwise
pub fn list(store: &Store, pending_only: bool, output: &Output) -> Result<()> {
    let user = require_user(store)?;

    let requests: Vec<&BugRequest> = if user.is_admin() {
        store.bug_requests().iter().collect()
    } else {
        store.requests_for(&user.username)
    };
    let requests: Vec<&BugRequest> = requests
        .into_iter()
        .filter(|r| !pending_only || r.is_pending())
        .collect();

    output.print_requests(&requests, user.is_admin());
    Ok(())
}

/// Mark a request completed (admin only)
pub fn process(store: &mut Store, id: i64, output: &Output) -> Result<()> {
    require_admin(store)?;

    let request = store.mark_processed(id)?;

    if output.is_json() || output.is_quiet() {
        output.print_request(&request);
    } else {
        output.success(&format!("Request {} processed", request.id));
        output.message(&format!(
            "  Target: {}  Type: {}",
            request.target_number,
            request.bug_type.display_name()
        ));
    }
    Ok(())
}
