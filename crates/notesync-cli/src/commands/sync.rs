use notesync_core::payload::PayloadEncoding;
use notesync_core::remote::{RemoteNoteService, RestConfig, RestNoteService};
use notesync_core::store::NoteStore;
use notesync_core::sync::{
    CommitMode, SelectionOrder, SyncConfig, SyncEngine, SyncRequest, UpsertStrategy,
};

use crate::cli::SyncArgs;
use crate::commands::common::{
    format_progress_line, format_report_lines, format_summary_lines, StoreSummary,
};
use crate::error::CliError;
use crate::store::JsonFileNoteStore;

pub fn remote_from_env() -> Result<RestNoteService, CliError> {
    let config = RestConfig::from_env()?.ok_or(CliError::SyncNotConfigured)?;
    tracing::debug!(?config, "Using remote notes service");
    Ok(RestNoteService::from_config(config)?)
}

pub fn sync_config_for(args: SyncArgs) -> SyncConfig {
    let mut config = SyncConfig::new();
    if args.base64 {
        config = config.with_encoding(PayloadEncoding::Base64);
    }
    if args.oldest_first {
        config = config.with_selection_order(SelectionOrder::OldestFirst);
    }
    if args.atomic_upsert {
        config = config.with_upsert_strategy(UpsertStrategy::Atomic);
    }
    config
}

pub fn sync_request_for(args: SyncArgs, owner_id: &str) -> SyncRequest {
    let commit_mode = if args.immediate_commit {
        CommitMode::Immediate
    } else {
        CommitMode::Batched
    };
    SyncRequest::new(owner_id)
        .with_binary_data(args.include_binary)
        .with_commit_mode(commit_mode)
}

pub async fn run_sync(
    args: SyncArgs,
    owner_id: &str,
    store: JsonFileNoteStore,
) -> Result<(), CliError> {
    let remote = remote_from_env()?;
    let engine = SyncEngine::new(store, remote, sync_config_for(args));

    let cancel = engine.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after the current note...");
            cancel.cancel();
        }
    });

    let result = engine
        .run_sync_cycle(&sync_request_for(args, owner_id), |progress| {
            eprintln!("{}", format_progress_line(&progress));
        })
        .await;
    interrupt.abort();

    let report = result?;
    for line in format_report_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_status(store: &JsonFileNoteStore) -> Result<(), CliError> {
    let notes = store.load().await?;
    let summary = StoreSummary::from_notes(&notes);

    println!("Store:              {}", store.path().display());
    for line in format_summary_lines(&summary) {
        println!("{line}");
    }

    match RestConfig::from_env() {
        Ok(Some(config)) => println!("Remote:             {}", config.table_url()),
        Ok(None) => println!("Remote:             not configured"),
        Err(error) => println!("Remote:             invalid configuration ({error})"),
    }
    Ok(())
}

/// Purge through the engine so the purge cannot overlap a sync cycle.
pub async fn run_purge<S, R>(engine: &SyncEngine<S, R>) -> Result<usize, CliError>
where
    S: NoteStore,
    R: RemoteNoteService,
{
    let purged = engine.purge_propagated_tombstones().await?;
    println!("Purged {purged} deleted note(s)");
    Ok(purged)
}
