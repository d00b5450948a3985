//! SåPe CLI - Operator tools for the request list.
//!
//! # Usage
//!
//! ```bash
//! # Create the request list
//! sape-cli list create
//!
//! # Print the list column schema
//! sape-cli list schema
//!
//! # Show a request
//! sape-cli request get PT-1700000000000
//!
//! # List requests by list status
//! sape-cli request list --status pending
//! ```
//!
//! # Commands
//!
//! - `list create` - Create the request list and share it with the admin channel
//! - `list schema` - Print the column schema as JSON
//! - `request get` - Print one request as JSON
//! - `request list` - Print requests with a list status

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sape_core::ListStatus;

mod commands;

#[derive(Parser)]
#[command(name = "sape-cli")]
#[command(author, version, about = "SåPe intake operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the request list
    List {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Inspect requests
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },
}

#[derive(Subcommand)]
enum ListAction {
    /// Create the request list
    Create,
    /// Print the column schema
    Schema,
}

#[derive(Subcommand)]
enum RequestAction {
    /// Show a request
    Get {
        /// Request id (`PT-...` or `TM-...`)
        id: String,
    },
    /// List requests by status
    List {
        /// List status (`pending`, `in_progress`, `done`, `rejected`)
        #[arg(short, long, default_value = "pending")]
        status: ListStatus,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sape_cli=info,sape_intake=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::List { action } => match action {
            ListAction::Create => {
                commands::list::create().await?;
            }
            ListAction::Schema => commands::list::schema()?,
        },
        Commands::Request { action } => match action {
            RequestAction::Get { id } => {
                if !commands::request::get(&id).await? {
                    std::process::exit(2);
                }
            }
            RequestAction::List { status } => {
                commands::request::list(status).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_request_list_parses_status() {
        let cli = Cli::try_parse_from(["sape-cli", "request", "list", "--status", "in_progress"])
            .expect("parse");
        match cli.command {
            Commands::Request {
                action: RequestAction::List { status },
            } => assert_eq!(status, ListStatus::InProgress),
            _ => panic!("expected request list"),
        }
    }

    #[test]
    fn test_request_list_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["sape-cli", "request", "list", "--status", "open"]).is_err());
    }
}
