use serde::{Deserialize, Serialize};

use crate::registry::Origin;
use crate::types::{ExampleId, OrderAnnotation, RowId, Transcript};

/// One record of a legacy origin file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OriginRecord {
    /// Example identifier.
    pub id: ExampleId,
    /// Order annotations, carried through unchanged.
    #[serde(default)]
    pub expected_orders: Vec<OrderAnnotation>,
}

impl OriginRecord {
    /// Record with no annotations.
    pub fn bare(id: impl Into<ExampleId>) -> Self {
        Self {
            id: id.into(),
            expected_orders: Vec::new(),
        }
    }
}

/// All records loaded from one origin file.
#[derive(Clone, Debug, PartialEq)]
pub struct OriginSet {
    /// Origin the records were read from.
    pub origin: Origin,
    /// Records in file order.
    pub records: Vec<OriginRecord>,
}

impl OriginSet {
    /// Build a set from records.
    pub fn new(origin: Origin, records: Vec<OriginRecord>) -> Self {
        Self { origin, records }
    }

    /// Build a set from bare ids.
    pub fn from_ids<I, S>(origin: Origin, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ExampleId>,
    {
        Self::new(origin, ids.into_iter().map(OriginRecord::bare).collect())
    }

    /// Iterate identifiers in file order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id.as_str())
    }

    /// Number of records in this origin.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the origin holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Assembled dataset row written to the new split files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    /// Rewritten row id.
    pub id: RowId,
    /// Speaker-tagged dialogue.
    pub transcript: Transcript,
    /// Order annotations from the origin record (empty when unknown).
    pub orders: Vec<OrderAnnotation>,
}
