//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use portal_core::{BugRequest, RequestStatus, User};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Account as shown to admins; never includes the password
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserView<'a> {
    username: &'a str,
    role: String,
    expiry: DateTime<Utc>,
    created_at: DateTime<Utc>,
    expired: bool,
}

impl<'a> UserView<'a> {
    fn new(user: &'a User, now: DateTime<Utc>) -> Self {
        Self {
            username: &user.username,
            role: user.role.to_string(),
            expiry: user.expiry,
            created_at: user.created_at,
            expired: user.is_expired(now),
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in JSON mode
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single bug request
    pub fn print_request(&self, request: &BugRequest) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", request.id);
                println!("Target:  {}", request.target_number);
                println!("Type:    {}", request.bug_type.display_name());
                println!("Owner:   {}", request.username);
                println!("Status:  {}", request.status);
                println!("Created: {}", request.timestamp);
            }
            OutputFormat::Json => print_json(request),
            OutputFormat::Quiet => println!("{}", request.id),
        }
    }

    /// Print a list of bug requests
    ///
    /// `show_owner` adds the submitting user, as in the admin view.
    pub fn print_requests(&self, requests: &[&BugRequest], show_owner: bool) {
        match self.format {
            OutputFormat::Human => {
                if requests.is_empty() {
                    println!("No bug requests found.");
                    return;
                }
                for request in requests {
                    let marker = match request.status {
                        RequestStatus::Pending => "…",
                        RequestStatus::Completed => "✓",
                    };
                    let owner = if show_owner {
                        format!(" | by {}", request.username)
                    } else {
                        String::new()
                    };
                    println!(
                        "{} {} | {} | {}{} | {}",
                        marker,
                        request.id,
                        truncate(&request.target_number, 20),
                        request.bug_type.display_name(),
                        owner,
                        request.timestamp
                    );
                }
                println!("\n{} request(s)", requests.len());
            }
            OutputFormat::Json => print_json(&requests),
            OutputFormat::Quiet => {
                for request in requests {
                    println!("{}", request.id);
                }
            }
        }
    }

    /// Print a single account
    pub fn print_user(&self, user: &User, now: DateTime<Utc>) {
        match self.format {
            OutputFormat::Human => {
                println!("Username: {}", user.username);
                println!("Role:     {}", user.role);
                if !user.is_admin() {
                    println!("Expires:  {}", format_date(user.expiry));
                }
                println!("Created:  {}", format_date(user.created_at));
                if user.is_expired(now) {
                    println!("Status:   expired");
                }
            }
            OutputFormat::Json => print_json(&UserView::new(user, now)),
            OutputFormat::Quiet => println!("{}", user.username),
        }
    }

    /// Print a list of accounts
    pub fn print_users(&self, users: &[&User], now: DateTime<Utc>) {
        match self.format {
            OutputFormat::Human => {
                if users.is_empty() {
                    println!("No users found.");
                    return;
                }
                for user in users {
                    let status = if user.is_expired(now) {
                        "Expired"
                    } else {
                        "Active"
                    };
                    println!(
                        "{} | expires {} | {}",
                        truncate(&user.username, 24),
                        format_date(user.expiry),
                        status
                    );
                }
                println!("\n{} user(s)", users.len());
            }
            OutputFormat::Json => {
                let views: Vec<_> = users.iter().map(|u| UserView::new(u, now)).collect();
                print_json(&views);
            }
            OutputFormat::Quiet => {
                for user in users {
                    println!("{}", user.username);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Local calendar date
pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
