//! Server-side projection of a note

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::note::{
    BinaryField, FolderId, NoteId, NoteRecord, ProcessingStatus, SourceKind,
};
use crate::payload::PayloadEncoding;

const BYTEA_HEX_PREFIX: &str = "\\x";

/// A binary field prepared for the wire.
///
/// `Raw` is written to byte columns directly (as a `bytea` hex literal on
/// JSON transports); `Base64` is the legacy text-safe form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedPayload {
    Raw(Vec<u8>),
    Base64(String),
}

impl EncodedPayload {
    /// Encode bytes with the given strategy.
    #[must_use]
    pub fn encode(bytes: &[u8], encoding: PayloadEncoding) -> Self {
        match encoding {
            PayloadEncoding::Raw => Self::Raw(bytes.to_vec()),
            PayloadEncoding::Base64 => {
                Self::Base64(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }

    /// Size of the payload as it is counted against the cap.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Raw(bytes) => bytes.len(),
            Self::Base64(text) => text.len(),
        }
    }

    /// Recover the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self {
            Self::Raw(bytes) => Ok(bytes.clone()),
            Self::Base64(text) => base64::engine::general_purpose::STANDARD.decode(text),
        }
    }
}

impl Serialize for EncodedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Raw(bytes) => {
                serializer.serialize_str(&format!("{BYTEA_HEX_PREFIX}{}", hex::encode(bytes)))
            }
            Self::Base64(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for EncodedPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        // A backslash is outside the base64 alphabet, so the prefix is unambiguous.
        match text.strip_prefix(BYTEA_HEX_PREFIX) {
            Some(hex_digits) => hex::decode(hex_digits)
                .map(Self::Raw)
                .map_err(serde::de::Error::custom),
            None => Ok(Self::Base64(text)),
        }
    }
}

/// A note row as stored by the remote service, keyed by `(id, owner_id)`.
///
/// The metadata-only shape leaves every binary field `None`; those fields
/// are then omitted from the write so the remote columns stay untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNoteRecord {
    pub id: NoteId,
    pub owner_id: String,
    pub title: String,
    pub source_type: SourceKind,
    pub created_at: i64,
    pub last_modified: i64,
    pub is_favorite: bool,
    pub processing_status: ProcessingStatus,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub citations: String,
    #[serde(default)]
    pub key_points: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EncodedPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_content: Option<EncodedPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<EncodedPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mind_map: Option<EncodedPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplementary_materials: Option<EncodedPayload>,
}

impl RemoteNoteRecord {
    /// Build the metadata-only projection of a local record.
    #[must_use]
    pub fn metadata(record: &NoteRecord, owner_id: &str) -> Self {
        Self {
            id: record.id,
            owner_id: owner_id.to_string(),
            title: record.title.clone(),
            source_type: record.source_kind,
            created_at: record.created_at,
            last_modified: record.last_modified,
            is_favorite: record.is_favorite,
            processing_status: record.processing_status,
            transcript: record.transcript.clone(),
            citations: record.citations.clone(),
            key_points: record.key_points.clone(),
            tags: record.tags.clone(),
            duration_ms: record.duration_ms,
            language_code: record.language_code.clone(),
            source_url: record.source_url.clone(),
            video_id: record.video_id.clone(),
            folder_id: record.folder_id,
            content: None,
            ai_content: None,
            sections: None,
            mind_map: None,
            supplementary_materials: None,
        }
    }

    /// Attach an encoded binary payload.
    pub fn set_payload(&mut self, field: BinaryField, payload: EncodedPayload) {
        let slot = match field {
            BinaryField::Content => &mut self.content,
            BinaryField::AiContent => &mut self.ai_content,
            BinaryField::Sections => &mut self.sections,
            BinaryField::MindMap => &mut self.mind_map,
            BinaryField::SupplementaryMaterials => &mut self.supplementary_materials,
        };
        *slot = Some(payload);
    }

    /// Encoded payload for a field, if carried.
    #[must_use]
    pub const fn payload(&self, field: BinaryField) -> Option<&EncodedPayload> {
        match field {
            BinaryField::Content => self.content.as_ref(),
            BinaryField::AiContent => self.ai_content.as_ref(),
            BinaryField::Sections => self.sections.as_ref(),
            BinaryField::MindMap => self.mind_map.as_ref(),
            BinaryField::SupplementaryMaterials => self.supplementary_materials.as_ref(),
        }
    }

    /// Whether any binary payload is attached (the full shape).
    #[must_use]
    pub fn has_binary(&self) -> bool {
        BinaryField::ALL
            .iter()
            .any(|field| self.payload(*field).is_some())
    }
}
