//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/portal/config.toml)
//! 3. Environment variables (PORTAL_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "PORTAL";

const DEFAULT_REMOTE_PATH: &str = "data/database.json";
const DEFAULT_REMOTE_BRANCH: &str = "main";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory for the local mirror (database, last save, session)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Account synthesized when no database exists anywhere
    #[serde(default)]
    pub bootstrap_admin: BootstrapAdmin,

    /// Remote repository holding the shared database (optional)
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

/// Credentials for the bootstrap admin account
///
/// Stored in plaintext like every other account in the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl Default for BootstrapAdmin {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "changeme".to_string(),
        }
    }
}

/// Location of the database file in a remote repository
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Repository in `owner/name` form
    pub repo: String,

    /// Path of the database file inside the repository
    #[serde(default = "default_remote_path")]
    pub path: String,

    #[serde(default = "default_remote_branch")]
    pub branch: String,

    /// Bearer token for the content API
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// Remote settings for `repo` with every other field defaulted
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            path: default_remote_path(),
            branch: default_remote_branch(),
            token: None,
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("repo", &self.repo)
            .field("path", &self.path)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_file: None,
            bootstrap_admin: BootstrapAdmin::default(),
            remote: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PORTAL_DATA_DIR, PORTAL_REMOTE_*, PORTAL_LOG_FILE)
    /// 2. Config file (~/.config/portal/config.toml or PORTAL_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // An empty PORTAL_REMOTE_REPO disables the remote entirely
        if let Ok(val) = std::env::var(format!("{}_REMOTE_REPO", ENV_PREFIX)) {
            if val.is_empty() {
                self.remote = None;
            } else if let Some(remote) = self.remote.as_mut() {
                remote.repo = val;
            } else {
                self.remote = Some(RemoteConfig::new(val));
            }
        }

        let Some(remote) = self.remote.as_mut() else {
            return;
        };

        if let Ok(val) = std::env::var(format!("{}_REMOTE_PATH", ENV_PREFIX)) {
            if !val.is_empty() {
                remote.path = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_REMOTE_BRANCH", ENV_PREFIX)) {
            if !val.is_empty() {
                remote.branch = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_REMOTE_TOKEN", ENV_PREFIX)) {
            remote.token = if val.is_empty() { None } else { Some(val) };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PORTAL_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("portal")
            .join("config.toml")
    }

    /// Get the path to the mirrored database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("database.json")
    }

    /// Get the path to the last-save timestamp
    pub fn last_save_path(&self) -> PathBuf {
        self.data_dir.join("last_save")
    }

    /// Get the path to the persisted login session
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("current_user")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("portal")
}

fn default_remote_path() -> String {
    DEFAULT_REMOTE_PATH.to_string()
}

fn default_remote_branch() -> String {
    DEFAULT_REMOTE_BRANCH.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
