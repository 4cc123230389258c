//! User management command handlers (admin only)

use anyhow::Result;

use portal_core::models::now_millis;
use portal_core::Store;

use super::require_admin;
use crate::output::{format_date, Output};

/// Create a regular account
pub fn add(
    store: &mut Store,
    username: String,
    password: String,
    days: i64,
    output: &Output,
) -> Result<()> {
    require_admin(store)?;

    let user = store.create_user(&username, &password, days)?;

    if output.is_json() || output.is_quiet() {
        output.print_user(&user, now_millis());
    } else {
        output.success(&format!(
            "User {} added (expires {})",
            user.username,
            format_date(user.expiry)
        ));
    }
    Ok(())
}

/// List regular accounts with their expiry state
pub fn list(store: &Store, output: &Output) -> Result<()> {
    require_admin(store)?;
    output.print_users(&store.regular_users(), now_millis());
    Ok(())
}
