//! Portal CLI
//!
//! Command-line interface for the bug request portal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use portal_core::{BugType, Config, PortalError, RemoteStore, Store};

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Portal - bug request tracking backed by a shared repository")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Skip the remote repository and use the local mirror only
    #[arg(long, global = true)]
    offline: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Submit, list and process bug requests
    Request {
        #[command(subcommand)]
        command: RequestCommands,
    },
    /// Manage user accounts (admin only)
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Show database and session status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Talk to the remote repository
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
}

#[derive(Subcommand)]
enum RequestCommands {
    /// Submit a bug request against a target number
    #[command(alias = "add")]
    Submit {
        /// Target phone number
        target: String,
        /// Bug type (crash-android, delay-maker, crash-ios)
        #[arg(short = 't', long = "type", default_value = "crash-android")]
        bug_type: BugType,
    },
    /// List bug requests
    #[command(alias = "ls")]
    List {
        /// Only show pending requests
        #[arg(long)]
        pending: bool,
    },
    /// Mark a request completed (admin only)
    Process {
        /// Request ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a regular account
    #[command(alias = "create")]
    Add {
        username: String,
        #[arg(short, long)]
        password: String,
        /// Days until the account expires
        #[arg(short, long, default_value_t = 30)]
        days: i64,
    },
    /// List regular accounts
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file, remote.repo, remote.token, ...)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Check that the repository is reachable
    Test,
    /// Upload the current database
    Push,
    /// Replace the local database with the remote copy
    Pull,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);

    let remote = if cli.offline {
        None
    } else {
        config
            .remote
            .as_ref()
            .map(RemoteStore::github)
            .transpose()
            .context("Invalid remote configuration")?
    };

    let mut store = Store::load(config, remote.as_ref()).await;
    debug!("Database loaded from {:?}", store.load_source());

    let result = match cli.command {
        Commands::Login { username, password } => {
            commands::session::login(&mut store, &username, &password, &output)
        }
        Commands::Logout => commands::session::logout(&mut store, &output),
        Commands::Whoami => commands::session::whoami(&store, &output),
        Commands::Request { command } => handle_request_command(command, &mut store, &output),
        Commands::User { command } => handle_user_command(command, &mut store, &output),
        Commands::Status => commands::status::show(&store, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Remote { command } => {
            handle_remote_command(command, &mut store, &output).await
        }
    };

    if let Err(ref e) = result {
        if let Some(hint) = recovery_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }

    result
}

/// Recovery suggestion for local storage failures
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<PortalError>()? {
        PortalError::Storage(e) if e.is_recoverable() => e.recovery_suggestion(),
        _ => None,
    }
}

fn handle_request_command(
    command: RequestCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        RequestCommands::Submit { target, bug_type } => {
            commands::request::submit(store, target, bug_type, output)
        }
        RequestCommands::List { pending } => commands::request::list(store, pending, output),
        RequestCommands::Process { id } => commands::request::process(store, id, output),
    }
}

fn handle_user_command(command: UserCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        UserCommands::Add {
            username,
            password,
            days,
        } => commands::user::add(store, username, password, days, output),
        UserCommands::List => commands::user::list(store, output),
    }
}

async fn handle_remote_command(
    command: RemoteCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        RemoteCommands::Test => commands::remote::test(store, output).await,
        RemoteCommands::Push => commands::remote::push(store, output).await,
        RemoteCommands::Pull => commands::remote::pull(store, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
