use notesync_core::remote::{FetchShape, RemoteNoteService};
use notesync_core::sync::{execute_with_retry, RetryPolicy};

use crate::commands::common::{format_remote_lines, remote_to_item, RemoteNoteItem};
use crate::commands::sync::remote_from_env;
use crate::error::CliError;

pub async fn run_remote_list(
    owner_id: &str,
    complete: bool,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let remote = remote_from_env()?;
    let shape = if complete {
        FetchShape::Complete
    } else {
        FetchShape::Minimal
    };

    let remote = &remote;
    let mut rows = execute_with_retry(&RetryPolicy::default(), "list remote notes", move || {
        remote.fetch_notes(owner_id, shape)
    })
    .await?;
    rows.truncate(limit);

    if as_json {
        let json_items = rows.iter().map(remote_to_item).collect::<Vec<RemoteNoteItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if rows.is_empty() {
        println!("No remote notes for owner {owner_id}.");
    } else {
        for line in format_remote_lines(&rows) {
            println!("{line}");
        }
    }

    Ok(())
}
