//! Binary payload policy
//!
//! Every binary field of a note is capped before it is sent. The primary
//! content is mandatory: if it does not fit, the record fails. AI-derived
//! content is required-if-present by default. The structured fields
//! (sections, mind-map, supplementary materials) are best-effort and are
//! dropped from the pass when oversized.

use serde::{Deserialize, Serialize};

use crate::models::{BinaryField, EncodedPayload, NoteRecord, RemoteNoteRecord};
use crate::{Error, Result};

/// Default per-field cap: 10 MiB.
pub const DEFAULT_MAX_FIELD_BYTES: usize = 10 * 1024 * 1024;

/// How binary fields travel to the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Raw bytes written to byte columns directly
    #[default]
    Raw,
    /// Legacy text-safe encoding, about 33% larger on the wire
    Base64,
}

impl PayloadEncoding {
    /// Wire size of `raw_len` bytes under this encoding.
    #[must_use]
    pub const fn encoded_len(self, raw_len: usize) -> usize {
        match self {
            Self::Raw => raw_len,
            Self::Base64 => raw_len.div_ceil(3) * 4,
        }
    }

    /// Largest raw size whose encoded form fits in `cap` bytes.
    #[must_use]
    pub const fn effective_cap(self, cap: usize) -> usize {
        match self {
            Self::Raw => cap,
            Self::Base64 => cap / 4 * 3,
        }
    }
}

/// What to do with a field that is over the cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRequirement {
    /// Overflow fails the whole record
    Mandatory,
    /// Overflow omits the field from this pass
    BestEffort,
}

/// Outcome of classifying one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDecision {
    Include,
    Drop,
    Reject,
}

/// Binary fields of one record after the policy ran.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreparedPayloads {
    pub included: Vec<(BinaryField, EncodedPayload)>,
    pub dropped: Vec<BinaryField>,
}

impl PreparedPayloads {
    /// Attach every included payload to a remote row.
    pub fn attach_to(self, row: &mut RemoteNoteRecord) -> Vec<BinaryField> {
        for (field, payload) in self.included {
            row.set_payload(field, payload);
        }
        self.dropped
    }
}

/// Per-field size policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPolicy {
    max_field_bytes: usize,
    encoding: PayloadEncoding,
    ai_content: FieldRequirement,
    sections: FieldRequirement,
    mind_map: FieldRequirement,
    supplementary_materials: FieldRequirement,
}

impl PayloadPolicy {
    /// Create a policy with the given per-field cap and default requirements
    #[must_use]
    pub const fn new(max_field_bytes: usize) -> Self {
        Self {
            max_field_bytes,
            encoding: PayloadEncoding::Raw,
            ai_content: FieldRequirement::Mandatory,
            sections: FieldRequirement::BestEffort,
            mind_map: FieldRequirement::BestEffort,
            supplementary_materials: FieldRequirement::BestEffort,
        }
    }

    /// Use a different wire encoding
    #[must_use]
    pub const fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Override the overflow behavior of a field.
    ///
    /// The primary content is always mandatory; overrides for it are ignored.
    #[must_use]
    pub const fn with_requirement(mut self, field: BinaryField, requirement: FieldRequirement) -> Self {
        match field {
            BinaryField::Content => {}
            BinaryField::AiContent => self.ai_content = requirement,
            BinaryField::Sections => self.sections = requirement,
            BinaryField::MindMap => self.mind_map = requirement,
            BinaryField::SupplementaryMaterials => self.supplementary_materials = requirement,
        }
        self
    }

    #[must_use]
    pub const fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    #[must_use]
    pub const fn max_field_bytes(&self) -> usize {
        self.max_field_bytes
    }

    /// Raw size limit once the encoding overhead is accounted for.
    #[must_use]
    pub const fn effective_limit(&self) -> usize {
        self.encoding.effective_cap(self.max_field_bytes)
    }

    #[must_use]
    pub const fn requirement(&self, field: BinaryField) -> FieldRequirement {
        match field {
            BinaryField::Content => FieldRequirement::Mandatory,
            BinaryField::AiContent => self.ai_content,
            BinaryField::Sections => self.sections,
            BinaryField::MindMap => self.mind_map,
            BinaryField::SupplementaryMaterials => self.supplementary_materials,
        }
    }

    /// Classify a field's bytes against the cap.
    #[must_use]
    pub const fn classify(&self, field: BinaryField, bytes: &[u8]) -> PayloadDecision {
        if bytes.len() <= self.effective_limit() {
            return PayloadDecision::Include;
        }
        match self.requirement(field) {
            FieldRequirement::Mandatory => PayloadDecision::Reject,
            FieldRequirement::BestEffort => PayloadDecision::Drop,
        }
    }

    /// Run the policy over every binary field a record holds.
    ///
    /// Fields absent locally are skipped, never sent as empty values.
    pub fn prepare(&self, record: &NoteRecord) -> Result<PreparedPayloads> {
        let mut prepared = PreparedPayloads::default();

        for field in BinaryField::ALL {
            let Some(bytes) = record.binary_field(field) else {
                continue;
            };

            match self.classify(field, bytes) {
                PayloadDecision::Include => prepared
                    .included
                    .push((field, EncodedPayload::encode(bytes, self.encoding))),
                PayloadDecision::Drop => {
                    tracing::warn!(
                        note_id = %record.id,
                        field = %field,
                        size = bytes.len(),
                        limit = self.effective_limit(),
                        "Dropping oversized optional field from this sync pass"
                    );
                    prepared.dropped.push(field);
                }
                PayloadDecision::Reject => {
                    return Err(Error::PayloadTooLarge {
                        field,
                        size: bytes.len(),
                        limit: self.effective_limit(),
                    });
                }
            }
        }

        Ok(prepared)
    }
}

impl Default for PayloadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FIELD_BYTES)
    }
}
