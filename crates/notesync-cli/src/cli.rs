use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notesync")]
#[command(about = "Sync locally captured notes with the remote notes service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local note store file
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Owner id used to scope remote rows
    #[arg(long, global = true, value_name = "ID")]
    pub owner: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new local note
    #[command(alias = "new")]
    Add {
        /// Note title
        #[arg(short, long)]
        title: String,
        /// Note content
        content: Vec<String>,
    },
    /// List local notes with their sync status
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a local note as deleted
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Push pending local changes to the remote service
    Sync(SyncArgs),
    /// Show pending, failed and tombstoned note counts
    Status,
    /// Remove local tombstones whose deletion reached the remote service
    Purge,
    /// Inspect the remote notes collection
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
}

#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct SyncArgs {
    /// Include binary payloads (content, AI content, structured fields)
    #[arg(long)]
    pub include_binary: bool,
    /// Process the oldest changes first
    #[arg(long)]
    pub oldest_first: bool,
    /// Save each note's status as soon as it syncs
    #[arg(long)]
    pub immediate_commit: bool,
    /// Send binary payloads Base64-encoded
    #[arg(long)]
    pub base64: bool,
    /// Use the server-side atomic upsert
    #[arg(long)]
    pub atomic_upsert: bool,
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// List remote notes for the owner, newest first
    List {
        /// Fetch every column, binary payloads included
        #[arg(long)]
        complete: bool,
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
