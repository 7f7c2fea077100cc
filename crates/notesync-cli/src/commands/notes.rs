use chrono::Utc;
use notesync_core::models::NoteRecord;

use crate::commands::common::{
    format_note_lines, normalize_title, note_to_list_item, resolve_note, NoteListItem,
};
use crate::error::CliError;
use crate::store::JsonFileNoteStore;

pub async fn run_add(
    title: &str,
    content_parts: &[String],
    store: &JsonFileNoteStore,
) -> Result<(), CliError> {
    let title = normalize_title(title)?;
    let content = content_parts.join(" ").trim().to_string();

    let note = NoteRecord::new(title, content.into_bytes());
    let id = note.id;
    store.put(note).await?;

    println!("{id}");
    Ok(())
}

pub async fn run_list(limit: usize, as_json: bool, store: &JsonFileNoteStore) -> Result<(), CliError> {
    let now_ms = Utc::now().timestamp_millis();
    let mut notes = store.load().await?;
    notes.truncate(limit);

    if as_json {
        let json_items = notes
            .iter()
            .map(|note| note_to_list_item(note, now_ms))
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if notes.is_empty() {
        println!("No notes yet.");
    } else {
        for line in format_note_lines(&notes, now_ms) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Tombstone a note. The deletion reaches the remote side on the next sync.
pub async fn run_delete(id: &str, store: &JsonFileNoteStore) -> Result<(), CliError> {
    let notes = store.load().await?;
    let mut note = resolve_note(&notes, id)?;
    if note.is_tombstoned() {
        println!("Note {} is already deleted", note.id);
        return Ok(());
    }

    note.mark_deleted();
    let note_id = note.id;
    store.put(note).await?;

    println!("Deleted note {note_id}");
    Ok(())
}
