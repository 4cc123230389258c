//! In-memory document operations
//!
//! Pure functions over a [`Document`]: lookups, authentication and the
//! mutations behind each store operation. Nothing here touches disk; the
//! caller supplies the current time so behavior is deterministic in tests.

use chrono::{DateTime, Utc};

use crate::error::{AuthFailure, PortalError, PortalResult};
use crate::models::{BugRequest, BugType, Document, RequestStatus, User};

impl Document {
    /// A fresh document holding only the bootstrap admin
    pub fn bootstrap(username: &str, password: &str, now: DateTime<Utc>) -> Self {
        Self {
            users: vec![User::bootstrap_admin(username, password, now)],
            bug_requests: Vec::new(),
            last_updated: Some(now),
        }
    }

    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn find_request(&self, id: i64) -> Option<&BugRequest> {
        self.bug_requests.iter().find(|r| r.id == id)
    }

    /// Check credentials against the user list
    ///
    /// Matches username and password exactly. A matching non-admin whose
    /// expiry is strictly before `now` is rejected as expired.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<&User, AuthFailure> {
        let user = self
            .users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .ok_or(AuthFailure::InvalidCredentials)?;

        if user.is_expired(now) {
            return Err(AuthFailure::AccountExpired);
        }

        Ok(user)
    }

    /// Append a pending bug request owned by `owner`
    pub fn record_bug_request(
        &mut self,
        owner: &str,
        target: &str,
        bug_type: BugType,
        now: DateTime<Utc>,
    ) -> PortalResult<BugRequest> {
        let target = target.trim();
        if target.is_empty() {
            return Err(PortalError::validation("Please enter a target number"));
        }

        match self.find_user(owner) {
            None => {
                return Err(PortalError::validation(format!("Unknown user '{}'", owner)));
            }
            Some(user) if user.is_admin() => {
                return Err(PortalError::validation(
                    "Admin accounts cannot submit bug requests",
                ));
            }
            Some(_) => {}
        }

        let request = BugRequest::new(self.next_request_id(now)?, owner, target, bug_type, now);
        self.bug_requests.push(request.clone());
        self.last_updated = Some(now);
        Ok(request)
    }

    /// Append a regular user that expires `expiry_days` after `now`
    pub fn create_user(
        &mut self,
        username: &str,
        password: &str,
        expiry_days: i64,
        now: DateTime<Utc>,
    ) -> PortalResult<User> {
        if username.is_empty() || password.is_empty() {
            return Err(PortalError::validation(
                "Username and password are both required",
            ));
        }

        if self.find_user(username).is_some() {
            return Err(PortalError::DuplicateUsername(username.to_string()));
        }

        let user = User::new(username, password, expiry_days, now)
            .ok_or_else(|| PortalError::validation("Expiry out of range"))?;
        self.users.push(user.clone());
        self.last_updated = Some(now);
        Ok(user)
    }

    /// Mark a request completed
    ///
    /// Returns the updated request and whether anything changed. Completing
    /// an already completed request changes nothing, not even
    /// `last_updated`.
    pub fn mark_processed(&mut self, id: i64, now: DateTime<Utc>) -> PortalResult<(BugRequest, bool)> {
        let request = self
            .bug_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PortalError::NotFound(id))?;

        if request.status == RequestStatus::Completed {
            return Ok((request.clone(), false));
        }

        request.status = RequestStatus::Completed;
        let request = request.clone();
        self.last_updated = Some(now);
        Ok((request, true))
    }

    /// Requests owned by `username`, in submission order
    pub fn requests_for<'a: 'b, 'b>(
        &'a self,
        username: &'b str,
    ) -> impl Iterator<Item = &'a BugRequest> + 'b {
        self.bug_requests
            .iter()
            .filter(move |r| r.username == username)
    }

    pub fn pending_requests(&self) -> impl Iterator<Item = &BugRequest> {
        self.bug_requests.iter().filter(|r| r.is_pending())
    }

    /// Non-admin accounts, in creation order
    pub fn regular_users(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|u| !u.is_admin())
    }

    /// Millisecond timestamp id, bumped past the newest existing id
    fn next_request_id(&self, now: DateTime<Utc>) -> PortalResult<i64> {
        let candidate = now.timestamp_millis();
        match self.bug_requests.iter().map(|r| r.id).max() {
            Some(latest) if latest >= candidate => latest
                .checked_add(1)
                .ok_or_else(|| PortalError::validation("No request ids left in this database")),
            _ => Ok(candidate),
        }
    }
}
