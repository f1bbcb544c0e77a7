//! Dataset assembly: joins each allocated id with its transcript and orders.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::reallocation::ALL_TARGETS;
use crate::data::{OriginSet, OutputRow};
use crate::errors::SimordError;
use crate::ids::{ConsultationKey, is_primock, parse_acibench_id, parse_primock_id};
use crate::reallocation::Allocation;
use crate::source::{ConsultationTranscripts, EncounterTranscripts};
use crate::splits::TargetSplit;
use crate::transport::fs::write_json_pretty;
use crate::types::{ExampleId, OrderAnnotation, RowId, Transcript};

/// Order annotations of every origin record, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct OrdersIndex {
    exact: HashMap<ExampleId, Vec<OrderAnnotation>>,
    folded: HashMap<String, ExampleId>,
}

impl OrdersIndex {
    /// Index all origins; a later record with the same id replaces an earlier one.
    pub fn from_origins(origins: &[OriginSet]) -> Self {
        let mut index = Self::default();
        for record in origins.iter().flat_map(|set| set.records.iter()) {
            index
                .exact
                .insert(record.id.clone(), record.expected_orders.clone());
            index.folded.insert(record.id.to_lowercase(), record.id.clone());
        }
        index
    }

    /// Orders for `id`, falling back to a case-insensitive match.
    pub fn lookup(&self, id: &str) -> Option<&[OrderAnnotation]> {
        self.exact
            .get(id)
            .or_else(|| {
                self.folded
                    .get(&id.to_lowercase())
                    .and_then(|key| self.exact.get(key))
            })
            .map(Vec::as_slice)
    }

    /// Number of indexed ids.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// True when no ids are indexed.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// Counters accumulated while assembling rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Ids visited.
    pub total: usize,
    /// Ids routed to the ACI-Bench collaborator (parseable or not).
    pub acibench: usize,
    /// Ids routed to the PriMock57 collaborator.
    pub primock: usize,
    /// Ids skipped because no transcript was available.
    pub missing_transcript: usize,
    /// Rows emitted with empty orders because none were found.
    pub missing_orders: usize,
    /// Ids skipped because they matched no known id shape.
    pub unparseable: usize,
    /// Rows emitted.
    pub success: usize,
}

/// Assembled rows per target split.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AssembledSplits {
    /// Rows for `train`.
    pub train: Vec<OutputRow>,
    /// Rows for `test1`.
    pub test1: Vec<OutputRow>,
    /// Rows for `test2`.
    pub test2: Vec<OutputRow>,
}

impl AssembledSplits {
    /// Rows for `split`.
    pub fn split(&self, split: TargetSplit) -> &[OutputRow] {
        match split {
            TargetSplit::Train => &self.train,
            TargetSplit::Test1 => &self.test1,
            TargetSplit::Test2 => &self.test2,
        }
    }

    fn split_mut(&mut self, split: TargetSplit) -> &mut Vec<OutputRow> {
        match split {
            TargetSplit::Train => &mut self.train,
            TargetSplit::Test1 => &mut self.test1,
            TargetSplit::Test2 => &mut self.test2,
        }
    }

    /// Splits with their rows, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (TargetSplit, &[OutputRow])> {
        ALL_TARGETS
            .into_iter()
            .map(move |split| (split, self.split(split)))
    }

    /// Total rows across all splits.
    pub fn total(&self) -> usize {
        self.train.len() + self.test1.len() + self.test2.len()
    }
}

/// Distinct PriMock57 consultations referenced by `allocation`, sorted.
pub fn primock_keys(allocation: &Allocation) -> Vec<ConsultationKey> {
    allocation
        .iter()
        .flat_map(|(_, ids)| ids.iter())
        .filter(|id| is_primock(id))
        .filter_map(|id| parse_primock_id(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn non_empty(transcript: Option<Transcript>) -> Option<Transcript> {
    transcript.filter(|text| !text.trim().is_empty())
}

/// Build output rows for every allocated id.
///
/// Ids without a transcript or without a recognizable shape are skipped and
/// counted; ids without orders are kept with an empty order list.
pub fn assemble(
    allocation: &Allocation,
    orders: &OrdersIndex,
    consultations: &dyn ConsultationTranscripts,
    encounters: &dyn EncounterTranscripts,
) -> (AssembledSplits, AssemblyStats) {
    let mut assembled = AssembledSplits::default();
    let mut stats = AssemblyStats::default();

    for (split, ids) in allocation.iter() {
        info!("[simord:assemble] processing {split} ({} ids)", ids.len());
        for id in ids {
            stats.total += 1;
            let resolved: Option<(RowId, Transcript)> = if is_primock(id) {
                stats.primock += 1;
                let Some(key) = parse_primock_id(id) else {
                    stats.unparseable += 1;
                    warn!("[simord:assemble] could not parse id {id}");
                    continue;
                };
                non_empty(consultations.transcript(key)).map(|text| (key.row_id(), text))
            } else {
                stats.acibench += 1;
                let Some(parsed) = parse_acibench_id(id) else {
                    stats.unparseable += 1;
                    warn!("[simord:assemble] could not parse id {id}");
                    continue;
                };
                let key = parsed.encounter_key();
                let found = non_empty(encounters.transcript(&key));
                if found.is_none() {
                    warn!("[simord:assemble] no dialogue for key {key}");
                }
                found.map(|text| (parsed.row_id(), text))
            };

            let Some((row_id, transcript)) = resolved else {
                stats.missing_transcript += 1;
                warn!("[simord:assemble] no transcript for {id}");
                continue;
            };

            let row_orders = match orders.lookup(id) {
                Some(found) => found.to_vec(),
                None => {
                    stats.missing_orders += 1;
                    warn!("[simord:assemble] no orders for {id}");
                    Vec::new()
                }
            };

            assembled.split_mut(split).push(OutputRow {
                id: row_id,
                transcript,
                orders: row_orders,
            });
            stats.success += 1;
        }
    }

    info!(
        "[simord:assemble] total={} acibench={} primock={} missing_transcript={} missing_orders={} unparseable={} success={}",
        stats.total,
        stats.acibench,
        stats.primock,
        stats.missing_transcript,
        stats.missing_orders,
        stats.unparseable,
        stats.success
    );
    (assembled, stats)
}

/// Expected versus assembled row count for one split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitCountCheck {
    /// Split checked.
    pub split: TargetSplit,
    /// Ids allocated to the split.
    pub expected: usize,
    /// Rows assembled for the split.
    pub actual: usize,
}

impl SplitCountCheck {
    /// True when no row was lost.
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// Per-split and total comparison of allocation and assembled output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountValidation {
    /// One check per target split, canonical order.
    pub checks: Vec<SplitCountCheck>,
    /// Ids allocated overall.
    pub expected_total: usize,
    /// Rows assembled overall.
    pub actual_total: usize,
}

impl CountValidation {
    /// True when every split and the total match.
    pub fn all_match(&self) -> bool {
        self.expected_total == self.actual_total && self.checks.iter().all(SplitCountCheck::matches)
    }

    /// Allocated ids that produced no row.
    pub fn missing(&self) -> usize {
        self.expected_total.saturating_sub(self.actual_total)
    }
}

/// Compare assembled rows against the allocation; mismatches are logged.
pub fn validate_counts(allocation: &Allocation, assembled: &AssembledSplits) -> CountValidation {
    let checks: Vec<SplitCountCheck> = ALL_TARGETS
        .into_iter()
        .map(|split| SplitCountCheck {
            split,
            expected: allocation.split(split).len(),
            actual: assembled.split(split).len(),
        })
        .collect();
    let validation = CountValidation {
        checks,
        expected_total: allocation.total(),
        actual_total: assembled.total(),
    };
    if validation.all_match() {
        info!(
            "[simord:assemble] all {} entries accounted for",
            validation.actual_total
        );
    } else {
        for check in validation.checks.iter().filter(|check| !check.matches()) {
            warn!(
                "[simord:assemble] {} count mismatch: expected {}, assembled {}",
                check.split, check.expected, check.actual
            );
        }
        warn!(
            "[simord:assemble] missing {} of {} entries",
            validation.missing(),
            validation.expected_total
        );
    }
    validation
}

/// Write `{split}.json` for every target split into `dir`.
pub fn write_splits(dir: &Path, assembled: &AssembledSplits) -> Result<Vec<PathBuf>, SimordError> {
    let mut written = Vec::new();
    for (split, rows) in assembled.iter() {
        let path = dir.join(format!("{split}.json"));
        write_json_pretty(&path, rows)?;
        info!("[simord:assemble] saved {} rows to {}", rows.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OriginRecord;
    use crate::ids::EncounterKey;
    use crate::registry::Origin;
    use crate::source::{EncounterIndex, InMemoryConsultations};
    use serde_json::{Value, json};
    use tempfile::tempdir;

    fn allocation(train: &[&str], test1: &[&str], test2: &[&str]) -> Allocation {
        let owned = |ids: &[&str]| ids.iter().map(|id| id.to_string()).collect();
        Allocation {
            train: owned(train),
            test1: owned(test1),
            test2: owned(test2),
        }
    }

    fn record(id: &str, orders: Value) -> OriginRecord {
        OriginRecord {
            id: id.to_string(),
            expected_orders: serde_json::from_value(orders).unwrap(),
        }
    }

    #[test]
    fn orders_lookup_falls_back_to_case_insensitive_match() {
        let origins = vec![OriginSet::new(
            Origin::Train,
            vec![record("acibench_D2N001_aci_train", json!([{"k": 1}]))],
        )];
        let index = OrdersIndex::from_origins(&origins);
        assert_eq!(index.lookup("acibench_D2N001_aci_train").unwrap(), &[json!({"k": 1})]);
        assert_eq!(index.lookup("ACIBENCH_d2n001_ACI_TRAIN").unwrap(), &[json!({"k": 1})]);
        assert!(index.lookup("acibench_D2N002_aci_train").is_none());
    }

    #[test]
    fn orders_index_prefers_later_origin_for_repeated_ids() {
        let origins = vec![
            OriginSet::new(Origin::Train, vec![record("x_train", json!([{"v": "train"}]))]),
            OriginSet::new(Origin::Dev, vec![record("x_train", json!([{"v": "dev"}]))]),
        ];
        let index = OrdersIndex::from_origins(&origins);
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("x_train").unwrap(), &[json!({"v": "dev"})]);
    }

    #[test]
    fn assemble_routes_ids_and_counts_every_outcome() {
        let alloc = allocation(
            &[
                "acibench_D2N001_virtassist_train",
                "primock57_4_1",
                "acibench_D2N002_aci_train",
            ],
            &["acibench_D2N088_virtassist_clinicalnlp_taskB_test1", "primock57_9_9"],
            &["mystery_id"],
        );
        let origins = vec![OriginSet::new(
            Origin::Train,
            vec![
                record("acibench_D2N001_virtassist_train", json!([{"order": "cbc"}])),
                record("primock57_4_1", json!([])),
            ],
        )];
        let orders = OrdersIndex::from_origins(&origins);

        let mut consultations = InMemoryConsultations::new("primock57");
        consultations.insert(ConsultationKey { day: 4, consultation: 1 }, "[doctor] hello");
        consultations.insert(ConsultationKey { day: 9, consultation: 9 }, "   ");

        let mut encounters = EncounterIndex::new("aci_bench");
        encounters.insert_first(EncounterKey::new("D2N001", "virtassist"), "[doctor] hi");
        encounters.insert_first(EncounterKey::new("D2N088", "virtassist"), "[patient] ok");

        let (assembled, stats) = assemble(&alloc, &orders, &consultations, &encounters);
        assert_eq!(
            stats,
            AssemblyStats {
                total: 6,
                acibench: 4,
                primock: 2,
                missing_transcript: 2,
                missing_orders: 1,
                unparseable: 1,
                success: 3,
            }
        );
        assert_eq!(
            assembled.train,
            vec![
                OutputRow {
                    id: "acibench_virtassist_train_D2N001".into(),
                    transcript: "[doctor] hi".into(),
                    orders: vec![json!({"order": "cbc"})],
                },
                OutputRow {
                    id: "primock57_4_1".into(),
                    transcript: "[doctor] hello".into(),
                    orders: vec![],
                },
            ]
        );
        assert_eq!(assembled.test1.len(), 1);
        assert_eq!(assembled.test1[0].id, "acibench_virtassist_test1_D2N088");
        assert!(assembled.test1[0].orders.is_empty());
        assert!(assembled.test2.is_empty());
    }

    #[test]
    fn validate_counts_flags_lost_rows() {
        let alloc = allocation(&["primock57_1_1"], &[], &["primock57_1_2"]);
        let mut consultations = InMemoryConsultations::new("primock57");
        consultations.insert(ConsultationKey { day: 1, consultation: 1 }, "[doctor] a");
        let (assembled, _) = assemble(
            &alloc,
            &OrdersIndex::default(),
            &consultations,
            &EncounterIndex::new("aci_bench"),
        );
        let validation = validate_counts(&alloc, &assembled);
        assert!(!validation.all_match());
        assert_eq!(validation.missing(), 1);
        assert_eq!(
            validation.checks[2],
            SplitCountCheck {
                split: TargetSplit::Test2,
                expected: 1,
                actual: 0
            }
        );
        assert!(validation.checks[0].matches());
    }

    #[test]
    fn primock_keys_are_distinct_and_sorted() {
        let alloc = allocation(
            &["primock57_2_1", "primock57_1_3", "acibench_D2N001_aci_train"],
            &["PRIMOCK57_1_3"],
            &["primock57_bad"],
        );
        assert_eq!(
            primock_keys(&alloc),
            vec![
                ConsultationKey { day: 1, consultation: 3 },
                ConsultationKey { day: 2, consultation: 1 },
            ]
        );
    }

    #[test]
    fn write_splits_emits_one_file_per_split() {
        let temp = tempdir().unwrap();
        let assembled = AssembledSplits {
            train: vec![OutputRow {
                id: "primock57_1_1".into(),
                transcript: "[doctor] é".into(),
                orders: vec![],
            }],
            ..AssembledSplits::default()
        };
        let written = write_splits(&temp.path().join("new"), &assembled).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["train.json", "test1.json", "test2.json"]);

        let rows: Vec<OutputRow> =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(rows, assembled.train);
        assert_eq!(std::fs::read_to_string(&written[1]).unwrap(), "[]\n");
    }
}
