//! notesync CLI - push locally captured notes to the remote notes service
//!
//! Notes live in a local JSON store; `notesync sync` propagates pending
//! creates, edits and deletions.

mod cli;
mod commands;
mod error;
mod store;


use std::env;
use std::path::PathBuf;

use clap::Parser;
use notesync_core::sync::{SyncConfig, SyncEngine};

use crate::cli::{Cli, Commands, RemoteCommands};
use crate::commands::common::resolve_owner;
use crate::commands::notes::{run_add, run_delete, run_list};
use crate::commands::remote::run_remote_list;
use crate::commands::sync::{remote_from_env, run_purge, run_status, run_sync};
use crate::error::CliError;
use crate::store::JsonFileNoteStore;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "notesync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = JsonFileNoteStore::new(resolve_store_path(cli.store));

    match cli.command {
        Commands::Add { title, content } => run_add(&title, &content, &store).await?,
        Commands::List { limit, json } => run_list(limit, json, &store).await?,
        Commands::Delete { id } => run_delete(&id, &store).await?,
        Commands::Sync(args) => {
            let owner_id = resolve_owner(cli.owner)?;
            run_sync(args, &owner_id, store).await?;
        }
        Commands::Status => run_status(&store).await?,
        Commands::Purge => {
            let engine = SyncEngine::new(store, remote_from_env()?, SyncConfig::new());
            run_purge(&engine).await?;
        }
        Commands::Remote {
            command:
                RemoteCommands::List {
                    complete,
                    limit,
                    json,
                },
        } => {
            let owner_id = resolve_owner(cli.owner)?;
            run_remote_list(&owner_id, complete, limit, json).await?;
        }
    }

    Ok(())
}

fn resolve_store_path(cli_store_path: Option<PathBuf>) -> PathBuf {
    cli_store_path
        .or_else(|| env::var_os("NOTESYNC_STORE_PATH").map(PathBuf::from))
        .unwrap_or_else(default_store_path)
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notesync")
        .join("notes.json")
}
