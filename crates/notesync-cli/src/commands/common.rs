use std::env;

use notesync_core::models::{NoteRecord, RemoteNoteRecord, SyncStatus};
use notesync_core::sync::{SyncProgress, SyncReport};
use serde::Serialize;

use crate::error::CliError;

const ENV_OWNER_ID: &str = "NOTESYNC_OWNER_ID";

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub sync_status: &'static str,
    pub deleted: bool,
    pub content_bytes: usize,
    pub created_at: i64,
    pub last_modified: i64,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct RemoteNoteItem {
    pub id: String,
    pub title: String,
    pub last_modified: i64,
    pub last_modified_utc: String,
    pub has_binary: bool,
}

/// Counts of local notes by sync bookkeeping state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub total: usize,
    pub pending: usize,
    pub failed: usize,
    pub conflict: usize,
    /// Tombstones whose deletion has not reached the remote yet
    pub awaiting_deletion: usize,
    /// Tombstones that can be purged locally
    pub awaiting_purge: usize,
}

impl StoreSummary {
    pub fn from_notes(notes: &[NoteRecord]) -> Self {
        let mut summary = Self {
            total: notes.len(),
            ..Self::default()
        };
        for note in notes {
            match (note.is_tombstoned(), note.sync_status) {
                (true, SyncStatus::Synced) => summary.awaiting_purge += 1,
                (true, _) => summary.awaiting_deletion += 1,
                (false, SyncStatus::Pending) => summary.pending += 1,
                (false, SyncStatus::Failed) => summary.failed += 1,
                (false, SyncStatus::Conflict) => summary.conflict += 1,
                (false, SyncStatus::Synced) => {}
            }
        }
        summary
    }

    pub const fn unsynced(&self) -> usize {
        self.pending + self.failed + self.conflict + self.awaiting_deletion
    }
}

pub fn normalize_title(title: &str) -> Result<String, CliError> {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(collapsed)
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Find a note by full id or unique id prefix.
pub fn resolve_note(notes: &[NoteRecord], note_query: &str) -> Result<NoteRecord, CliError> {
    let query = normalize_note_identifier(note_query)?;

    if let Some(note) = notes.iter().find(|note| note.id.to_string() == query) {
        return Ok(note.clone());
    }

    let matching = notes
        .iter()
        .filter(|note| note.id.to_string().starts_with(&query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(query)),
        [note] => Ok((*note).clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| short_id(&note.id.to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "Note ID prefix '{query}' is ambiguous. Matches include: {options}"
            )))
        }
    }
}

/// Owner id from the flag, falling back to `NOTESYNC_OWNER_ID`.
pub fn resolve_owner(cli_owner: Option<String>) -> Result<String, CliError> {
    resolve_owner_with(cli_owner, |key| env::var(key).ok())
}

pub fn resolve_owner_with(
    cli_owner: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, CliError> {
    cli_owner
        .or_else(|| lookup(ENV_OWNER_ID))
        .map(|owner| owner.trim().to_string())
        .filter(|owner| !owner.is_empty())
        .ok_or(CliError::OwnerNotConfigured)
}

fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn title_preview(title: &str, max_chars: usize) -> String {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = if collapsed.is_empty() {
        "untitled".to_string()
    } else {
        collapsed
    };

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

fn status_label(note: &NoteRecord) -> &'static str {
    if note.is_tombstoned() {
        "deleted"
    } else {
        note.sync_status.as_str()
    }
}

pub fn format_note_lines(notes: &[NoteRecord], now_ms: i64) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id.to_string());
            let title = title_preview(&note.title, 40);
            let status = status_label(note);
            let relative_time = format_relative_time(note.last_modified, now_ms);
            format!("{short_id:<13}  {title:<40}  {status:<8}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &NoteRecord, now_ms: i64) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        sync_status: note.sync_status.as_str(),
        deleted: note.is_tombstoned(),
        content_bytes: note.content.len(),
        created_at: note.created_at,
        last_modified: note.last_modified,
        relative_time: format_relative_time(note.last_modified, now_ms),
    }
}

pub fn remote_to_item(row: &RemoteNoteRecord) -> RemoteNoteItem {
    RemoteNoteItem {
        id: row.id.to_string(),
        title: row.title.clone(),
        last_modified: row.last_modified,
        last_modified_utc: format_timestamp(row.last_modified),
        has_binary: row.has_binary(),
    }
}

pub fn format_remote_lines(rows: &[RemoteNoteRecord]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let short_id = short_id(&row.id.to_string());
            let title = title_preview(&row.title, 40);
            let modified = format_timestamp(row.last_modified);
            format!("{short_id:<13}  {title:<40}  {modified}")
        })
        .collect()
}

pub fn format_progress_line(progress: &SyncProgress) -> String {
    format!(
        "[{}/{}] {}",
        progress.synced_notes, progress.total_notes, progress.current_status
    )
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();

    if report.total == 0 {
        lines.push("Everything is up to date.".to_string());
        return lines;
    }

    lines.push(format!(
        "Synced {} of {} notes ({} deletions).",
        report.synced, report.total, report.deleted
    ));
    if report.cancelled {
        lines.push("Sync was cancelled before every note was processed.".to_string());
    }
    for dropped in &report.dropped_fields {
        lines.push(format!(
            "  skipped oversized {} for {}",
            dropped.field,
            short_id(&dropped.note_id.to_string())
        ));
    }
    for failure in &report.failures {
        lines.push(format!(
            "  failed {} '{}': {}",
            short_id(&failure.note_id.to_string()),
            title_preview(&failure.title, 40),
            failure.error
        ));
    }
    if let Some(error) = &report.commit_error {
        lines.push(format!("Local status changes were not saved: {error}"));
    }
    lines
}

pub fn format_summary_lines(summary: &StoreSummary) -> Vec<String> {
    vec![
        format!("Notes:              {}", summary.total),
        format!("Unsynced:           {}", summary.unsynced()),
        format!("Pending:            {}", summary.pending),
        format!("Failed:             {}", summary.failed),
        format!("Conflicts:          {}", summary.conflict),
        format!("Awaiting deletion:  {}", summary.awaiting_deletion),
        format!("Ready to purge:     {}", summary.awaiting_purge),
    ]
}
