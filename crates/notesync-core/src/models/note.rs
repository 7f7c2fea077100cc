//! Local note record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a note, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of the folder a note is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(Uuid);

impl FolderId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Local synchronization state of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local changes not yet pushed
    #[default]
    Pending,
    /// Local and remote agree
    Synced,
    /// Remote rejected the insert because another writer created the row
    /// first; selected again next cycle
    Conflict,
    /// Last push failed for a reason retrying will not fix
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        }
    }
}

/// Where the note's primary content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Audio,
    #[default]
    Text,
    Document,
    Image,
    Web,
    Video,
}

/// Progress of upstream content generation for a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Binary payload fields carried by a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryField {
    /// Primary content (always present)
    Content,
    /// AI-derived secondary content
    AiContent,
    /// Structured sections
    Sections,
    /// Graph / mind-map
    MindMap,
    /// Supplementary materials
    SupplementaryMaterials,
}

impl BinaryField {
    /// Every binary field, in column order.
    pub const ALL: [Self; 5] = [
        Self::Content,
        Self::AiContent,
        Self::Sections,
        Self::MindMap,
        Self::SupplementaryMaterials,
    ];

    /// Remote column name for this field.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::AiContent => "ai_content",
            Self::Sections => "sections",
            Self::MindMap => "mind_map",
            Self::SupplementaryMaterials => "supplementary_materials",
        }
    }
}

impl fmt::Display for BinaryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A note as held by the local, offline-capable store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Unique identifier, immutable once created
    pub id: NoteId,
    /// Display title
    pub title: String,
    /// Origin of the primary content
    pub source_kind: SourceKind,
    /// Primary content
    pub content: Vec<u8>,
    /// AI-derived secondary content
    pub ai_content: Option<Vec<u8>>,
    /// Structured sections
    pub sections: Option<Vec<u8>>,
    /// Graph / mind-map
    pub mind_map: Option<Vec<u8>>,
    /// Supplementary materials
    pub supplementary_materials: Option<Vec<u8>>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last modification timestamp (Unix ms)
    pub last_modified: i64,
    pub is_favorite: bool,
    pub processing_status: ProcessingStatus,
    pub transcript: String,
    pub citations: String,
    pub key_points: String,
    pub tags: String,
    /// Media duration in milliseconds
    pub duration_ms: Option<u64>,
    /// BCP 47 language code
    pub language_code: Option<String>,
    pub source_url: Option<String>,
    /// External video identifier (e.g. a `YouTube` id)
    pub video_id: Option<String>,
    pub folder_id: Option<FolderId>,
    /// Synchronization bookkeeping
    pub sync_status: SyncStatus,
    /// Soft-delete tombstone (Unix ms)
    pub deleted_at: Option<i64>,
}

impl NoteRecord {
    /// Create a new pending note with the given title and primary content
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let now = now_millis();
        Self {
            id: NoteId::new(),
            title: title.into(),
            source_kind: SourceKind::default(),
            content: content.into(),
            ai_content: None,
            sections: None,
            mind_map: None,
            supplementary_materials: None,
            created_at: now,
            last_modified: now,
            is_favorite: false,
            processing_status: ProcessingStatus::default(),
            transcript: String::new(),
            citations: String::new(),
            key_points: String::new(),
            tags: String::new(),
            duration_ms: None,
            language_code: None,
            source_url: None,
            video_id: None,
            folder_id: None,
            sync_status: SyncStatus::Pending,
            deleted_at: None,
        }
    }

    /// Record a local edit: stamp `last_modified` and queue for sync.
    pub fn touch(&mut self) {
        self.last_modified = now_millis().max(self.last_modified);
        self.sync_status = SyncStatus::Pending;
    }

    /// Soft-delete the note. It stays in the local store until the
    /// tombstone has been propagated.
    pub fn mark_deleted(&mut self) {
        self.touch();
        self.deleted_at = Some(self.last_modified);
    }

    /// Whether the note carries a tombstone
    #[must_use]
    pub const fn is_tombstoned(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Bytes held locally for a binary field, if any.
    #[must_use]
    pub fn binary_field(&self, field: BinaryField) -> Option<&[u8]> {
        match field {
            BinaryField::Content => Some(self.content.as_slice()),
            BinaryField::AiContent => self.ai_content.as_deref(),
            BinaryField::Sections => self.sections.as_deref(),
            BinaryField::MindMap => self.mind_map.as_deref(),
            BinaryField::SupplementaryMaterials => self.supplementary_materials.as_deref(),
        }
    }

    /// Title used in log lines and operation names.
    #[must_use]
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "untitled"
        } else {
            title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_unique() {
        let id1 = NoteId::new();
        let id2 = NoteId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_note_id_parse() {
        let id = NoteId::new();
        let parsed: NoteId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_note_new_is_pending() {
        let note = NoteRecord::new("Lecture", b"hello".to_vec());
        assert_eq!(note.content, b"hello");
        assert_eq!(note.sync_status, SyncStatus::Pending);
        assert!(!note.is_tombstoned());
        assert!(note.created_at > 0);
        assert_eq!(note.created_at, note.last_modified);
    }

    #[test]
    fn test_touch_requeues_synced_note() {
        let mut note = NoteRecord::new("Lecture", Vec::new());
        note.sync_status = SyncStatus::Synced;
        let before = note.last_modified;

        note.touch();

        assert_eq!(note.sync_status, SyncStatus::Pending);
        assert!(note.last_modified >= before);
    }

    #[test]
    fn test_mark_deleted_sets_tombstone() {
        let mut note = NoteRecord::new("Lecture", Vec::new());
        note.sync_status = SyncStatus::Synced;

        note.mark_deleted();

        assert!(note.is_tombstoned());
        assert_eq!(note.deleted_at, Some(note.last_modified));
        assert_eq!(note.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_binary_field_accessor() {
        let mut note = NoteRecord::new("Lecture", b"body".to_vec());
        note.mind_map = Some(b"graph".to_vec());

        assert_eq!(note.binary_field(BinaryField::Content), Some(&b"body"[..]));
        assert_eq!(note.binary_field(BinaryField::MindMap), Some(&b"graph"[..]));
        assert_eq!(note.binary_field(BinaryField::Sections), None);
    }

    #[test]
    fn test_display_title_falls_back() {
        let note = NoteRecord::new("   ", Vec::new());
        assert_eq!(note.display_title(), "untitled");
    }

    #[test]
    fn test_sync_status_serializes_lowercase() {
        let json = serde_json::to_string(&SyncStatus::Conflict).unwrap();
        assert_eq!(json, "\"conflict\"");
        assert_eq!(BinaryField::AiContent.to_string(), "ai_content");
    }
}
