//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use portal_core::{Config, RemoteConfig};

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, log_file, remote.repo, remote.path, remote.branch, \
                          remote.token, remote.api_url, bootstrap_admin.username, \
                          bootstrap_admin.password";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "log_file": config.log_file,
                    "bootstrap_admin": config.bootstrap_admin.username,
                    "remote": config.remote.as_ref().map(|r| serde_json::json!({
                        "repo": r.repo,
                        "path": r.path,
                        "branch": r.branch,
                        "api_url": r.api_url,
                        "token_set": r.token.is_some(),
                    })),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:        {}", config.data_dir.display());
            println!(
                "  log_file:        {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  bootstrap_admin: {}", config.bootstrap_admin.username);
            match config.remote {
                Some(ref remote) => {
                    println!("  remote.repo:     {}", remote.repo);
                    println!("  remote.path:     {}", remote.path);
                    println!("  remote.branch:   {}", remote.branch);
                    println!("  remote.api_url:  {}", remote.api_url);
                    println!(
                        "  remote.token:    {}",
                        if remote.token.is_some() {
                            "(set)"
                        } else {
                            "(not set)"
                        }
                    );
                }
                None => println!("  remote:          (not set)"),
            }
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key.ends_with("token") || key.ends_with("password") {
        "********"
    } else {
        value.as_str()
    };
    output.success(&format!("Set {} = {}", key, shown));
    Ok(())
}

/// Apply a single `key = value` assignment
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let unset = value.is_empty() || value == "none";

    match key {
        "data_dir" => config.data_dir = value.into(),
        "log_file" => config.log_file = (!unset).then(|| value.into()),
        "bootstrap_admin.username" => {
            if unset {
                bail!("bootstrap_admin.username cannot be empty");
            }
            config.bootstrap_admin.username = value.to_string();
        }
        "bootstrap_admin.password" => config.bootstrap_admin.password = value.to_string(),
        "remote.repo" => {
            if unset {
                config.remote = None;
            } else if let Some(remote) = config.remote.as_mut() {
                remote.repo = value.to_string();
            } else {
                config.remote = Some(RemoteConfig::new(value));
            }
        }
        "remote.path" | "remote.branch" | "remote.token" | "remote.api_url" => {
            let Some(remote) = config.remote.as_mut() else {
                bail!(
                    "No remote configured. Set the repository first:\n  \
                     portal config set remote.repo owner/name"
                );
            };
            match key {
                "remote.path" => remote.path = value.to_string(),
                "remote.branch" => remote.branch = value.to_string(),
                "remote.token" => remote.token = (!unset).then(|| value.to_string()),
                _ => remote.api_url = value.trim_end_matches('/').to_string(),
            }
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }

    Ok(())
}
