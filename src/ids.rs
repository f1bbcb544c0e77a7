//! Parsing of the two structured identifier families and output row ids.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::constants::primock::ID_PREFIX;
use crate::types::{EncounterId, RowId, SubsetName};

static ACIBENCH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^acibench_(D2N\d+)_(virtassist|aci|virtscribe)_(.+)$")
        .expect("acibench id pattern is valid")
});
static SPLIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(train|valid|test[123])$").expect("split suffix pattern is valid"));
static PRIMOCK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^primock57_(\d+)_(\d+)$").expect("primock id pattern is valid"));

/// Parsed `acibench_{encounter}_{subset}_{split_info}` identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AciBenchId {
    /// Encounter id as written (e.g. `D2N088`).
    pub encounter_id: EncounterId,
    /// Lower-cased subset name.
    pub subset: SubsetName,
    /// Lower-cased remainder after the subset (e.g. `clinicalnlp_taskb_test1`).
    pub split_info: String,
}

impl AciBenchId {
    /// Transcript lookup key (`encounter` upper-cased, `subset` lower-cased).
    pub fn encounter_key(&self) -> EncounterKey {
        EncounterKey::new(&self.encounter_id, &self.subset)
    }

    /// Original ACI-Bench split encoded in the split info.
    pub fn original_split(&self) -> &str {
        extract_split_from_info(&self.split_info)
    }

    /// Output row id: `acibench_{subset}_{split}_{encounter}`.
    pub fn row_id(&self) -> RowId {
        format!(
            "acibench_{}_{}_{}",
            self.subset,
            self.original_split(),
            self.encounter_id
        )
    }
}

/// Lookup key for ACI-Bench dialogues.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncounterKey {
    /// Upper-cased encounter id.
    pub encounter_id: EncounterId,
    /// Lower-cased subset name.
    pub subset: SubsetName,
}

impl EncounterKey {
    /// Normalize case of both components.
    pub fn new(encounter_id: &str, subset: &str) -> Self {
        Self {
            encounter_id: encounter_id.to_uppercase(),
            subset: subset.to_lowercase(),
        }
    }
}

impl fmt::Display for EncounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.encounter_id, self.subset)
    }
}

/// PriMock57 consultation coordinates (`primock57_{day}_{consultation}`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsultationKey {
    /// Recording day.
    pub day: u32,
    /// Consultation number within the day.
    pub consultation: u32,
}

impl ConsultationKey {
    /// Output row id: `primock57_{day}_{consultation}`.
    pub fn row_id(&self) -> RowId {
        format!("primock57_{}_{}", self.day, self.consultation)
    }

    /// TextGrid file stem: `day{day}_consultation{consultation:02}`.
    pub fn file_stem(&self) -> String {
        format!("day{}_consultation{:02}", self.day, self.consultation)
    }
}

impl fmt::Display for ConsultationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {} consultation {}", self.day, self.consultation)
    }
}

/// Parse an ACI-Bench identifier; `None` for any other shape.
pub fn parse_acibench_id(id: &str) -> Option<AciBenchId> {
    let captures = ACIBENCH_ID.captures(id)?;
    Some(AciBenchId {
        encounter_id: captures[1].to_string(),
        subset: captures[2].to_lowercase(),
        split_info: captures[3].to_lowercase(),
    })
}

/// Trailing `train|valid|test[123]` of `split_info`, or all of it when absent.
pub fn extract_split_from_info(split_info: &str) -> &str {
    SPLIT_SUFFIX
        .find(split_info)
        .map(|found| found.as_str())
        .unwrap_or(split_info)
}

/// True when `id` carries the PriMock57 prefix (case-insensitive).
pub fn is_primock(id: &str) -> bool {
    id.get(..ID_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ID_PREFIX))
}

/// Parse a PriMock57 identifier into consultation coordinates.
pub fn parse_primock_id(id: &str) -> Option<ConsultationKey> {
    let captures = PRIMOCK_ID.captures(id)?;
    Some(ConsultationKey {
        day: captures[1].parse().ok()?,
        consultation: captures[2].parse().ok()?,
    })
}
