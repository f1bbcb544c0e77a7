//! Transcript collaborators consumed by the dataset assembler.
//!
//! Ownership model:
//! - `ConsultationTranscripts` resolves PriMock57 consultations by
//!   `(day, consultation)`.
//! - `EncounterTranscripts` resolves ACI-Bench dialogues by
//!   `(encounter_id, subset)`.
//!
//! Both report absence with `None` and never distinguish why a transcript is
//! missing; transport failures are logged by the implementation.

use std::collections::HashMap;

use crate::ids::{ConsultationKey, EncounterKey};
use crate::types::{SourceId, Transcript};

/// ACI-Bench hub loader.
pub mod aci_bench;
/// PriMock57 TextGrid fetcher.
pub mod primock;

/// Transcript lookup keyed by PriMock57 consultation.
pub trait ConsultationTranscripts {
    /// Stable collaborator identifier used in logs.
    fn id(&self) -> &str;
    /// Speaker-tagged transcript for `key`, or `None` when unavailable.
    fn transcript(&self, key: ConsultationKey) -> Option<Transcript>;
}

/// Dialogue lookup keyed by ACI-Bench encounter and subset.
pub trait EncounterTranscripts {
    /// Stable collaborator identifier used in logs.
    fn id(&self) -> &str;
    /// Dialogue for `key`, or `None` when unavailable.
    fn transcript(&self, key: &EncounterKey) -> Option<Transcript>;
}

/// Materialized consultation transcripts.
#[derive(Clone, Debug, Default)]
pub struct InMemoryConsultations {
    source_id: SourceId,
    transcripts: HashMap<ConsultationKey, Transcript>,
}

impl InMemoryConsultations {
    /// Create an empty store labelled `source_id`.
    pub fn new(source_id: impl Into<SourceId>) -> Self {
        Self {
            source_id: source_id.into(),
            transcripts: HashMap::new(),
        }
    }

    /// Store a transcript, replacing any previous one.
    pub fn insert(&mut self, key: ConsultationKey, transcript: impl Into<Transcript>) {
        self.transcripts.insert(key, transcript.into());
    }

    /// Number of stored transcripts.
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }
}

impl ConsultationTranscripts for InMemoryConsultations {
    fn id(&self) -> &str {
        &self.source_id
    }

    fn transcript(&self, key: ConsultationKey) -> Option<Transcript> {
        self.transcripts.get(&key).cloned()
    }
}

/// Materialized encounter dialogues; the first dialogue seen per key wins.
#[derive(Clone, Debug, Default)]
pub struct EncounterIndex {
    source_id: SourceId,
    dialogues: HashMap<EncounterKey, Transcript>,
}

impl EncounterIndex {
    /// Create an empty index labelled `source_id`.
    pub fn new(source_id: impl Into<SourceId>) -> Self {
        Self {
            source_id: source_id.into(),
            dialogues: HashMap::new(),
        }
    }

    /// Insert unless `key` is already present. Returns whether it was inserted.
    pub fn insert_first(&mut self, key: EncounterKey, dialogue: impl Into<Transcript>) -> bool {
        if self.dialogues.contains_key(&key) {
            return false;
        }
        self.dialogues.insert(key, dialogue.into());
        true
    }

    /// Move every entry of `other` in, keeping existing keys. Returns the number added.
    pub fn absorb(&mut self, other: EncounterIndex) -> usize {
        let mut added = 0usize;
        for (key, dialogue) in other.dialogues {
            if self.insert_first(key, dialogue) {
                added += 1;
            }
        }
        added
    }

    /// Number of indexed dialogues.
    pub fn len(&self) -> usize {
        self.dialogues.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.dialogues.is_empty()
    }
}

impl EncounterTranscripts for EncounterIndex {
    fn id(&self) -> &str {
        &self.source_id
    }

    fn transcript(&self, key: &EncounterKey) -> Option<Transcript> {
        self.dialogues.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encounter_index_keeps_first_dialogue() {
        let mut index = EncounterIndex::new("aci_bench");
        let key = EncounterKey::new("d2n001", "VirtAssist");
        assert!(index.insert_first(key.clone(), "first"));
        assert!(!index.insert_first(EncounterKey::new("D2N001", "virtassist"), "second"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.transcript(&key).as_deref(), Some("first"));
        assert_eq!(index.id(), "aci_bench");
    }

    #[test]
    fn absorb_keeps_existing_dialogues() {
        let mut index = EncounterIndex::new("aci_bench");
        index.insert_first(EncounterKey::new("D2N001", "aci"), "kept");
        let mut incoming = EncounterIndex::new("aci_bench:aci");
        incoming.insert_first(EncounterKey::new("D2N001", "aci"), "ignored");
        incoming.insert_first(EncounterKey::new("D2N002", "aci"), "added");

        assert_eq!(index.absorb(incoming), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.transcript(&EncounterKey::new("D2N001", "aci")).as_deref(),
            Some("kept")
        );
    }

    #[test]
    fn in_memory_consultations_report_absence() {
        let mut store = InMemoryConsultations::new("primock57");
        let present = ConsultationKey { day: 1, consultation: 2 };
        store.insert(present, "[doctor] hi");
        assert_eq!(store.transcript(present).as_deref(), Some("[doctor] hi"));
        assert!(
            store
                .transcript(ConsultationKey { day: 9, consultation: 9 })
                .is_none()
        );
        assert!(!store.is_empty());
    }
}
