//! Command handlers

pub mod config;
pub mod remote;
pub mod request;
pub mod session;
pub mod status;
pub mod user;

use anyhow::{bail, Result};

use portal_core::{Store, User};

/// The logged-in user, or an error telling how to log in
pub fn require_user(store: &Store) -> Result<User> {
    match store.current_user() {
        Some(user) => Ok(user.clone()),
        None => bail!("Not logged in. Log in with:\n  portal login <username> --password <password>"),
    }
}

/// The logged-in user, who must be an admin
pub fn require_admin(store: &Store) -> Result<User> {
    let user = require_user(store)?;
    if !user.is_admin() {
        bail!("This command requires an admin account.");
    }
    Ok(user)
}
