//! `grabotp` - fetch recent one-time passcodes from Gmail.
//!
//! Subcommands:
//!
//! - `grabotp` -- fetch OTPs from every configured account.
//! - `grabotp account add|list|remove` -- manage accounts.
//! - `grabotp reset` -- forget all accounts, tokens and client credentials.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod commands;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// A simple tool to fetch recent OTPs from your Gmail accounts.
#[derive(Parser)]
#[command(name = "grabotp", version)]
struct Cli {
    /// Output as JSON.
    #[arg(long)]
    json: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Manage your Gmail accounts.
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Reset all your credentials.
    Reset,
}

/// Subcommands for `grabotp account`.
#[derive(Subcommand)]
enum AccountAction {
    /// Add a new Gmail account.
    Add {
        /// `OAuth2` client id to save before authorizing.
        #[arg(long)]
        client_id: Option<String>,

        /// `OAuth2` client secret to save before authorizing.
        #[arg(long)]
        client_secret: Option<String>,
    },

    /// List all configured Gmail accounts.
    List,

    /// Remove a Gmail account.
    Remove {
        /// Address of the account to remove.
        email: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => commands::fetch(cli.json).await,
        Some(Commands::Account { action }) => match action {
            AccountAction::Add {
                client_id,
                client_secret,
            } => commands::add_account(client_id, client_secret).await,
            AccountAction::List => commands::list_accounts().await,
            AccountAction::Remove { email } => commands::remove_account(email.into()).await,
        },
        Some(Commands::Reset) => commands::reset().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if commands::needs_reauthorization(&e) {
                eprintln!("Re-authorize with `grabotp account add`.");
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries results and the authorization URL.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "grabotp=debug,grabotp_core=debug,grabotp_oauth=debug"
    } else {
        "grabotp=warn,grabotp_core=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
