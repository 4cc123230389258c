//! Login, logout and whoami handlers

use anyhow::Result;

use portal_core::models::now_millis;
use portal_core::Store;

use super::require_user;
use crate::output::Output;

/// Log in and remember the session
pub fn login(store: &mut Store, username: &str, password: &str, output: &Output) -> Result<()> {
    let user = store.login(username, password)?;
    output.success(&format!("Welcome back, {}!", user.username));
    Ok(())
}

pub fn logout(store: &mut Store, output: &Output) -> Result<()> {
    store.logout()?;
    output.success("Logged out successfully");
    Ok(())
}

/// Show the logged-in account
pub fn whoami(store: &Store, output: &Output) -> Result<()> {
    let user = require_user(store)?;
    output.print_user(&user, now_millis());
    Ok(())
}
