//! Data models for the portal
//!
//! Defines the persisted document and its records: User and BugRequest.
//! Field names serialize in camelCase so the JSON shape matches the
//! `database.json` file shared with the remote repository.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Months, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of the bootstrap admin account
const BOOTSTRAP_ADMIN_LIFETIME: Months = Months::new(12 * 10);

/// Current time truncated to millisecond precision
///
/// Timestamps persist as epoch millis, so anything finer would not survive
/// a save/load cycle.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Account role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

/// A portal account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Login name (unique, case-sensitive)
    pub username: String,
    /// Stored as given; see DESIGN.md on plaintext credentials
    pub password: String,
    pub role: Role,
    /// Point after which a non-admin account can no longer log in
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expiry: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a regular account that expires `expiry_days` after `now`
    ///
    /// Returns `None` when the expiry is not a representable date.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        expiry_days: i64,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let expiry = chrono::Duration::try_days(expiry_days)
            .and_then(|days| now.checked_add_signed(days))?;
        Some(Self {
            username: username.into(),
            password: password.into(),
            role: Role::User,
            expiry,
            created_at: now,
        })
    }

    /// Create the bootstrap admin account with a ten-year expiry
    pub fn bootstrap_admin(
        username: impl Into<String>,
        password: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let expiry = now
            .checked_add_months(BOOTSTRAP_ADMIN_LIFETIME)
            .unwrap_or_else(|| now + chrono::Duration::days(3652));
        Self {
            username: username.into(),
            password: password.into(),
            role: Role::Admin,
            expiry,
            created_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the account has expired at `now`
    ///
    /// Admins never expire regardless of the stored expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_admin() && self.expiry < now
    }
}

/// Category of a bug request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BugType {
    CrashAndroid,
    DelayMaker,
    CrashIos,
}

impl BugType {
    pub const ALL: [BugType; 3] = [BugType::CrashAndroid, BugType::DelayMaker, BugType::CrashIos];

    /// Wire identifier, e.g. `crash-android`
    pub fn as_str(&self) -> &'static str {
        match self {
            BugType::CrashAndroid => "crash-android",
            BugType::DelayMaker => "delay-maker",
            BugType::CrashIos => "crash-ios",
        }
    }

    /// Human-readable label
    pub fn display_name(&self) -> &'static str {
        match self {
            BugType::CrashAndroid => "Crash Android",
            BugType::DelayMaker => "Delay Maker",
            BugType::CrashIos => "Crash iOS",
        }
    }
}

impl fmt::Display for BugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown bug type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown bug type '{0}'. Expected one of: crash-android, delay-maker, crash-ios")]
pub struct ParseBugTypeError(String);

impl FromStr for BugType {
    type Err = ParseBugTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BugType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseBugTypeError(s.to_string()))
    }
}

/// Processing state of a bug request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Completed,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// A bug request submitted by a regular user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BugRequest {
    /// Creation time in epoch millis, kept unique within a document
    pub id: i64,
    pub target_number: String,
    pub bug_type: BugType,
    /// Owner's username
    pub username: String,
    pub status: RequestStatus,
    /// Local creation time, formatted for display
    pub timestamp: String,
}

impl BugRequest {
    /// Create a pending request with the given id
    pub fn new(
        id: i64,
        owner: impl Into<String>,
        target_number: impl Into<String>,
        bug_type: BugType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            target_number: target_number.into(),
            bug_type,
            username: owner.into(),
            status: RequestStatus::Pending,
            timestamp: display_timestamp(now),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Format a creation time the way request lists show it
fn display_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

/// The persisted portal state
///
/// Stored and synchronized as a single blob; records are not versioned
/// individually.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub bug_requests: Vec<BugRequest>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_user_expiry() {
        let now = fixed_now();
        let user = User::new("alice", "secret", 30, now).unwrap();

        assert_eq!(user.role, Role::User);
        assert_eq!(user.created_at, now);
        assert_eq!(user.expiry, now + chrono::Duration::days(30));
        assert!(!user.is_expired(now));
        assert!(user.is_expired(now + chrono::Duration::days(31)));
    }

    #[test]
    fn test_new_user_rejects_unrepresentable_expiry() {
        let now = fixed_now();

        assert!(User::new("alice", "secret", 100_000_000, now).is_none());
        assert!(User::new("alice", "secret", -100_000_000, now).is_none());
        assert!(User::new("alice", "secret", i64::MAX, now).is_none());
        assert!(User::new("alice", "secret", i64::MIN, now).is_none());
    }

    #[test]
    fn test_bootstrap_admin_ten_years() {
        let now = fixed_now();
        let admin = User::bootstrap_admin("admin", "changeme", now);

        assert!(admin.is_admin());
        assert_eq!(admin.expiry, Utc.with_ymd_and_hms(2035, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_admin_never_expires() {
        let now = fixed_now();
        let mut admin = User::bootstrap_admin("admin", "changeme", now);
        admin.expiry = now - chrono::Duration::days(1);

        assert!(!admin.is_expired(now));
    }

    #[test]
    fn test_bug_type_parse_and_display() {
        assert_eq!("crash-ios".parse::<BugType>().unwrap(), BugType::CrashIos);
        assert_eq!(BugType::DelayMaker.to_string(), "delay-maker");
        assert_eq!(BugType::CrashAndroid.display_name(), "Crash Android");
        assert!("crash-windows".parse::<BugType>().is_err());
    }

    #[test]
    fn test_document_json_shape() {
        let now = fixed_now();
        let doc = Document {
            users: vec![User::new("alice", "pw", 1, now).unwrap()],
            bug_requests: vec![BugRequest::new(
                1740830400000,
                "alice",
                "628123",
                BugType::CrashAndroid,
                now,
            )],
            last_updated: Some(now),
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["users"][0]["role"], "user");
        assert_eq!(value["users"][0]["createdAt"], 1740830400000i64);
        assert_eq!(value["bugRequests"][0]["targetNumber"], "628123");
        assert_eq!(value["bugRequests"][0]["bugType"], "crash-android");
        assert_eq!(value["bugRequests"][0]["status"], "pending");
        assert!(value["lastUpdated"].as_str().unwrap().starts_with("2025-03-01T12:00:00"));
    }

    #[test]
    fn test_document_round_trip() {
        let now = now_millis();
        let mut doc = Document {
            users: vec![
                User::bootstrap_admin("admin", "changeme", now),
                User::new("bob", "hunter2", 7, now).unwrap(),
            ],
            bug_requests: Vec::new(),
            last_updated: Some(now),
        };

        let json = serde_json::to_string_pretty(&doc).unwrap();
        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);

        doc.bug_requests
            .push(BugRequest::new(42, "bob", "555", BugType::CrashIos, now));
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_document_missing_fields_default() {
        let doc: Document = serde_json::from_str(r#"{"users": [], "bugRequests": []}"#).unwrap();
        assert!(doc.users.is_empty());
        assert!(doc.bug_requests.is_empty());
        assert!(doc.last_updated.is_none());

        let doc: Document = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, Document::default());
    }

    #[test]
    fn test_reads_javascript_timestamps() {
        let json = r#"{
            "users": [{
                "username": "root",
                "password": "pw",
                "role": "admin",
                "expiry": 2056000000000,
                "createdAt": 1740830400000
            }],
            "bugRequests": [{
                "id": 1740830400123,
                "targetNumber": "62811",
                "bugType": "delay-maker",
                "username": "root",
                "status": "completed",
                "timestamp": "3/1/2025, 12:00:00 PM"
            }],
            "lastUpdated": "2025-03-01T12:00:00.123Z"
        }"#;

        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.users[0].role, Role::Admin);
        assert_eq!(doc.bug_requests[0].status, RequestStatus::Completed);
        assert_eq!(doc.last_updated.unwrap().timestamp_subsec_millis(), 123);
    }
}
