//! Independent cross-check of a computed allocation.
//!
//! The expected membership of each split is rebuilt here from the raw origin
//! sets as plain set expressions, without going through the engine's
//! per-identifier dispatch. Any divergence between the two derivations aborts
//! the run before anything is persisted.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{error, info};

use crate::constants::reallocation::{ALL_TARGETS, MISMATCH_SAMPLE_LEN};
use crate::data::OriginSet;
use crate::errors::SimordError;
use crate::reallocation::Allocation;
use crate::registry::Origin;
use crate::splits::{Bucket, TargetSplit, classify};
use crate::types::ExampleId;

/// Membership difference for one split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitMismatch {
    /// Split whose actual membership diverged.
    pub split: TargetSplit,
    /// Number of expected ids absent from the actual split.
    pub missing: usize,
    /// Number of actual ids that were not expected.
    pub extra: usize,
    /// First missing ids in sorted order.
    pub missing_sample: Vec<ExampleId>,
    /// First extra ids in sorted order.
    pub extra_sample: Vec<ExampleId>,
}

impl fmt::Display for SplitMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} missing {:?}, {} extra {:?}",
            self.split, self.missing, self.missing_sample, self.extra, self.extra_sample
        )
    }
}

/// One reason a verification pass failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discrepancy {
    /// A split's membership differs from the expectation model.
    Split(SplitMismatch),
    /// The same id appears more than once across the origin files.
    DuplicateInput {
        /// Number of distinct duplicated ids.
        count: usize,
        /// First duplicated ids in sorted order.
        sample: Vec<ExampleId>,
    },
    /// The same id was assigned more than once across the output splits.
    DuplicateAssignment {
        /// Number of distinct over-assigned ids.
        count: usize,
        /// First over-assigned ids in sorted order.
        sample: Vec<ExampleId>,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::Split(mismatch) => write!(f, "{mismatch}"),
            Discrepancy::DuplicateInput { count, sample } => {
                write!(f, "{count} duplicated input ids {sample:?}")
            }
            Discrepancy::DuplicateAssignment { count, sample } => {
                write!(f, "{count} ids assigned more than once {sample:?}")
            }
        }
    }
}

/// Contribution counters reported when verification passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Distinct input ids across all origins.
    pub universe: usize,
    /// Train-origin ids kept in `train` (train or other bucket).
    pub train_kept: usize,
    /// Dev-origin ids released to `train`.
    pub dev_to_train: usize,
    /// Test-origin ids released to `train`.
    pub test_to_train: usize,
    /// Dev-origin ids retained in `test1`.
    pub dev_retained: usize,
    /// Test-origin ids retained in `test2`.
    pub test_retained: usize,
    /// Misplaced train-origin ids.
    pub misplaced: usize,
    /// Misplaced ids dealt to `test1`.
    pub misplaced_to_test1: usize,
    /// Misplaced ids dealt to `test2`.
    pub misplaced_to_test2: usize,
}

/// Expected split membership derived straight from the origin sets.
#[derive(Debug, Default)]
struct ExpectationModel<'a> {
    train: BTreeSet<&'a str>,
    test1: BTreeSet<&'a str>,
    test2: BTreeSet<&'a str>,
    report: VerificationReport,
}

impl<'a> ExpectationModel<'a> {
    fn derive(origins: &'a [OriginSet]) -> Self {
        let from = |origin: Origin| {
            origins
                .iter()
                .filter(move |set| set.origin == origin)
                .flat_map(OriginSet::ids)
        };
        let is_train = |id: &&str| classify(id) == Bucket::Train;

        let train_kept: BTreeSet<&str> = from(Origin::Train)
            .filter(|id| matches!(classify(id), Bucket::Train | Bucket::Other))
            .collect();
        let mut misplaced: Vec<&str> = from(Origin::Train)
            .filter(|id| !matches!(classify(id), Bucket::Train | Bucket::Other))
            .collect();
        misplaced.sort_unstable();
        let misplaced_even: BTreeSet<&str> = misplaced.iter().copied().step_by(2).collect();
        let misplaced_odd: BTreeSet<&str> = misplaced.iter().copied().skip(1).step_by(2).collect();

        let dev_to_train: BTreeSet<&str> = from(Origin::Dev).filter(is_train).collect();
        let test_to_train: BTreeSet<&str> = from(Origin::Test).filter(is_train).collect();
        let dev_retained: BTreeSet<&str> = from(Origin::Dev).filter(|id| !is_train(id)).collect();
        let test_retained: BTreeSet<&str> =
            from(Origin::Test).filter(|id| !is_train(id)).collect();

        let report = VerificationReport {
            universe: 0,
            train_kept: train_kept.len(),
            dev_to_train: dev_to_train.len(),
            test_to_train: test_to_train.len(),
            dev_retained: dev_retained.len(),
            test_retained: test_retained.len(),
            misplaced: misplaced.len(),
            misplaced_to_test1: misplaced_even.len(),
            misplaced_to_test2: misplaced_odd.len(),
        };

        Self {
            train: &(&train_kept | &dev_to_train) | &test_to_train,
            test1: &dev_retained | &misplaced_even,
            test2: &test_retained | &misplaced_odd,
            report,
        }
    }

    fn expected(&self, split: TargetSplit) -> &BTreeSet<&'a str> {
        match split {
            TargetSplit::Train => &self.train,
            TargetSplit::Test1 => &self.test1,
            TargetSplit::Test2 => &self.test2,
        }
    }
}

/// Check `allocation` against an independently derived expectation.
///
/// Returns contribution counters on success, or `VerificationFailed` with
/// per-split diagnostics after logging them.
pub fn verify(
    origins: &[OriginSet],
    allocation: &Allocation,
) -> Result<VerificationReport, SimordError> {
    let model = ExpectationModel::derive(origins);
    let mut discrepancies = Vec::new();

    let input_duplicates = repeated_ids(origins.iter().flat_map(OriginSet::ids));
    let universe = origins
        .iter()
        .flat_map(OriginSet::ids)
        .collect::<BTreeSet<_>>()
        .len();
    if !input_duplicates.is_empty() {
        discrepancies.push(Discrepancy::DuplicateInput {
            count: input_duplicates.len(),
            sample: sample(input_duplicates.iter().copied()),
        });
    }

    let assigned_duplicates = repeated_ids(
        allocation
            .iter()
            .flat_map(|(_, ids)| ids.iter().map(String::as_str)),
    );
    if !assigned_duplicates.is_empty() {
        discrepancies.push(Discrepancy::DuplicateAssignment {
            count: assigned_duplicates.len(),
            sample: sample(assigned_duplicates.iter().copied()),
        });
    }

    for split in ALL_TARGETS {
        let expected = model.expected(split);
        let actual: BTreeSet<&str> = allocation.split(split).iter().map(String::as_str).collect();
        if *expected == actual {
            continue;
        }
        let missing: Vec<&str> = expected.difference(&actual).copied().collect();
        let extra: Vec<&str> = actual.difference(expected).copied().collect();
        discrepancies.push(Discrepancy::Split(SplitMismatch {
            split,
            missing: missing.len(),
            extra: extra.len(),
            missing_sample: sample(missing.into_iter()),
            extra_sample: sample(extra.into_iter()),
        }));
    }

    if !discrepancies.is_empty() {
        for discrepancy in &discrepancies {
            error!("[simord:verify] {discrepancy}");
        }
        return Err(SimordError::VerificationFailed { discrepancies });
    }

    let report = VerificationReport {
        universe,
        ..model.report
    };
    info!(
        "[simord:verify] allocation verified: train={} (kept={}, from dev={}, from test={}), test1={} (dev={}, misplaced={}), test2={} (test={}, misplaced={})",
        model.train.len(),
        report.train_kept,
        report.dev_to_train,
        report.test_to_train,
        model.test1.len(),
        report.dev_retained,
        report.misplaced_to_test1,
        model.test2.len(),
        report.test_retained,
        report.misplaced_to_test2
    );
    Ok(report)
}

fn repeated_ids<'a>(ids: impl Iterator<Item = &'a str>) -> BTreeSet<&'a str> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for id in ids {
        *seen.entry(id).or_insert(0) += 1;
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect()
}

fn sample<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<ExampleId> {
    ids.take(MISMATCH_SAMPLE_LEN).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reallocation::reallocate;

    fn origins(train: &[&str], dev: &[&str], test: &[&str]) -> Vec<OriginSet> {
        vec![
            OriginSet::from_ids(Origin::Train, train.iter().copied()),
            OriginSet::from_ids(Origin::Dev, dev.iter().copied()),
            OriginSet::from_ids(Origin::Test, test.iter().copied()),
        ]
    }

    fn scenario() -> Vec<OriginSet> {
        origins(
            &["a_valid", "b_train", "c_other", "f_test1", "g_test2"],
            &["d_train", "h_valid", "primock57_1_1"],
            &["e_test3", "i_train", "primock57_2_2"],
        )
    }

    fn mismatches(err: SimordError) -> Vec<Discrepancy> {
        match err {
            SimordError::VerificationFailed { discrepancies } => discrepancies,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn verify_accepts_engine_output_and_reports_contributions() {
        let input = scenario();
        let report = verify(&input, &reallocate(&input)).unwrap();
        assert_eq!(
            report,
            VerificationReport {
                universe: 11,
                train_kept: 2,
                dev_to_train: 1,
                test_to_train: 1,
                dev_retained: 2,
                test_retained: 2,
                misplaced: 3,
                misplaced_to_test1: 2,
                misplaced_to_test2: 1,
            }
        );
    }

    #[test]
    fn verify_detects_id_moved_between_splits() {
        let input = scenario();
        let mut allocation = reallocate(&input);
        let moved = allocation.test1.remove(0);
        allocation.test2.push(moved.clone());

        let found = mismatches(verify(&input, &allocation).unwrap_err());
        assert_eq!(found.len(), 2);
        assert!(found.contains(&Discrepancy::Split(SplitMismatch {
            split: TargetSplit::Test1,
            missing: 1,
            extra: 0,
            missing_sample: vec![moved.clone()],
            extra_sample: Vec::new(),
        })));
        assert!(found.contains(&Discrepancy::Split(SplitMismatch {
            split: TargetSplit::Test2,
            missing: 0,
            extra: 1,
            missing_sample: Vec::new(),
            extra_sample: vec![moved],
        })));
    }

    #[test]
    fn verify_detects_dropped_id() {
        let input = scenario();
        let mut allocation = reallocate(&input);
        allocation.train.retain(|id| id != "d_train");
        let found = mismatches(verify(&input, &allocation).unwrap_err());
        assert_eq!(found.len(), 1);
        assert!(matches!(
            &found[0],
            Discrepancy::Split(SplitMismatch { split: TargetSplit::Train, missing: 1, .. })
        ));
    }

    #[test]
    fn verify_detects_duplicate_assignment_within_split() {
        let input = scenario();
        let mut allocation = reallocate(&input);
        allocation.train.push("b_train".to_string());
        let found = mismatches(verify(&input, &allocation).unwrap_err());
        assert_eq!(
            found,
            vec![Discrepancy::DuplicateAssignment {
                count: 1,
                sample: vec!["b_train".to_string()],
            }]
        );
    }

    #[test]
    fn verify_detects_duplicate_input_ids() {
        let input = origins(&["x_valid"], &["x_valid"], &[]);
        let found = mismatches(verify(&input, &reallocate(&input)).unwrap_err());
        assert!(found.iter().any(|discrepancy| matches!(
            discrepancy,
            Discrepancy::DuplicateInput { count: 1, .. }
        )));
    }

    #[test]
    fn verify_samples_at_most_five_ids() {
        let train: Vec<String> = (0..8).map(|idx| format!("id{idx}_train")).collect();
        let input = vec![OriginSet::from_ids(Origin::Train, train)];
        let mut allocation = reallocate(&input);
        allocation.train.clear();
        let found = mismatches(verify(&input, &allocation).unwrap_err());
        let Discrepancy::Split(mismatch) = &found[0] else {
            panic!("expected split mismatch");
        };
        assert_eq!(mismatch.missing, 8);
        assert_eq!(
            mismatch.missing_sample,
            vec!["id0_train", "id1_train", "id2_train", "id3_train", "id4_train"]
        );
    }

    #[test]
    fn mismatch_display_lists_counts_and_samples() {
        let mismatch = SplitMismatch {
            split: TargetSplit::Test2,
            missing: 1,
            extra: 0,
            missing_sample: vec!["a".into()],
            extra_sample: Vec::new(),
        };
        assert_eq!(mismatch.to_string(), "test2: 1 missing [\"a\"], 0 extra []");
    }
}
