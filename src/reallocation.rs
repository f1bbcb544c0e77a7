//! Reallocation engine.
//!
//! Every identifier lands in exactly one target split:
//! - train-origin ids keep `train` unless their suffix marks them held-out
//!   (misplaced); misplaced ids are sorted and dealt alternately to `test1`
//!   and `test2`,
//! - dev/test-origin ids move to `train` only when their suffix says `train`;
//!   everything else stays in the origin's canonical split.
//!
//! The result is a pure function of the input and every list is emitted in
//! sorted order, so identical input always serializes to identical bytes.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::reallocation::{ALL_TARGETS, MAP_NOTE};
use crate::data::OriginSet;
use crate::registry::Origin;
use crate::splits::{Bucket, TargetSplit, classify};
use crate::types::ExampleId;

/// Identifier lists per target split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Ids assigned to `train`.
    pub train: Vec<ExampleId>,
    /// Ids assigned to `test1`.
    pub test1: Vec<ExampleId>,
    /// Ids assigned to `test2`.
    pub test2: Vec<ExampleId>,
}

impl Allocation {
    /// Ids assigned to `split`.
    pub fn split(&self, split: TargetSplit) -> &[ExampleId] {
        match split {
            TargetSplit::Train => &self.train,
            TargetSplit::Test1 => &self.test1,
            TargetSplit::Test2 => &self.test2,
        }
    }

    /// Mutable access to the ids assigned to `split`.
    pub fn split_mut(&mut self, split: TargetSplit) -> &mut Vec<ExampleId> {
        match split {
            TargetSplit::Train => &mut self.train,
            TargetSplit::Test1 => &mut self.test1,
            TargetSplit::Test2 => &mut self.test2,
        }
    }

    /// Splits with their ids, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (TargetSplit, &[ExampleId])> {
        ALL_TARGETS
            .into_iter()
            .map(move |split| (split, self.split(split)))
    }

    /// Total number of assigned ids across all splits.
    pub fn total(&self) -> usize {
        self.train.len() + self.test1.len() + self.test2.len()
    }

    fn assign(&mut self, split: TargetSplit, id: &str) {
        self.split_mut(split).push(id.to_string());
    }

    fn sort(&mut self) {
        for split in ALL_TARGETS {
            self.split_mut(split).sort_unstable();
        }
    }
}

/// Reassign every identifier of `origins` to a target split.
pub fn reallocate(origins: &[OriginSet]) -> Allocation {
    let mut allocation = Allocation::default();
    let mut misplaced: Vec<&str> = Vec::new();

    for set in origins {
        for id in set.ids() {
            let bucket = classify(id);
            match (set.origin, bucket) {
                (Origin::Train, Bucket::Train) => allocation.assign(TargetSplit::Train, id),
                (Origin::Train, Bucket::Other) => {
                    allocation.assign(Origin::Train.other_bucket_split(), id)
                }
                (Origin::Train, _) => misplaced.push(id),
                (_, Bucket::Train) => allocation.assign(TargetSplit::Train, id),
                (origin, Bucket::Other) => allocation.assign(origin.other_bucket_split(), id),
                (origin, _) => allocation.assign(origin.canonical_split(), id),
            }
        }
    }

    misplaced.sort_unstable();
    debug!(
        "[simord:realloc] distributing {} misplaced train-origin ids",
        misplaced.len()
    );
    for (position, id) in misplaced.into_iter().enumerate() {
        allocation.assign(alternating_test_split(position), id);
    }

    allocation.sort();
    info!(
        "[simord:realloc] allocated {} ids (train={}, test1={}, test2={})",
        allocation.total(),
        allocation.train.len(),
        allocation.test1.len(),
        allocation.test2.len()
    );
    allocation
}

/// Test split for the `position`-th misplaced id in sorted order.
pub fn alternating_test_split(position: usize) -> TargetSplit {
    if position % 2 == 0 {
        TargetSplit::Test1
    } else {
        TargetSplit::Test2
    }
}

/// Population count per target split plus the total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCounts {
    /// Count for `train`.
    pub train: usize,
    /// Count for `test1`.
    pub test1: usize,
    /// Count for `test2`.
    pub test2: usize,
    /// Sum of the three splits.
    pub total: usize,
}

impl SplitCounts {
    /// Count for `split`.
    pub fn get(&self, split: TargetSplit) -> usize {
        match split {
            TargetSplit::Train => self.train,
            TargetSplit::Test1 => self.test1,
            TargetSplit::Test2 => self.test2,
        }
    }

    fn add(&mut self, split: TargetSplit, count: usize) {
        match split {
            TargetSplit::Train => self.train += count,
            TargetSplit::Test1 => self.test1 += count,
            TargetSplit::Test2 => self.test2 += count,
        }
        self.total += count;
    }

    /// Counts of each origin's records keyed by its canonical split.
    pub fn before(origins: &[OriginSet]) -> Self {
        let mut counts = Self::default();
        for set in origins {
            counts.add(set.origin.canonical_split(), set.len());
        }
        counts
    }

    /// Counts of an allocation.
    pub fn after(allocation: &Allocation) -> Self {
        let mut counts = Self::default();
        for (split, ids) in allocation.iter() {
            counts.add(split, ids.len());
        }
        counts
    }
}

/// Signed change per split (`after - before`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDelta {
    /// Change in `train`.
    pub train: i64,
    /// Change in `test1`.
    pub test1: i64,
    /// Change in `test2`.
    pub test2: i64,
}

impl SplitDelta {
    /// Per-split difference between two count sets.
    pub fn between(before: &SplitCounts, after: &SplitCounts) -> Self {
        let diff = |split| after.get(split) as i64 - before.get(split) as i64;
        Self {
            train: diff(TargetSplit::Train),
            test1: diff(TargetSplit::Test1),
            test2: diff(TargetSplit::Test2),
        }
    }

    /// Change for `split`.
    pub fn get(&self, split: TargetSplit) -> i64 {
        match split {
            TargetSplit::Train => self.train,
            TargetSplit::Test1 => self.test1,
            TargetSplit::Test2 => self.test2,
        }
    }
}

/// Persisted reallocation artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReallocationMap {
    /// Human-readable description of the placement policy.
    pub note: String,
    /// Population per canonical split before reallocation.
    pub counts_before: SplitCounts,
    /// Population per target split after reallocation.
    pub counts_after: SplitCounts,
    /// Signed change per split.
    pub delta: SplitDelta,
    /// Sorted ids per target split.
    pub splits: Allocation,
}

impl ReallocationMap {
    /// Wrap a computed allocation with its before/after statistics.
    pub fn new(origins: &[OriginSet], allocation: Allocation) -> Self {
        let counts_before = SplitCounts::before(origins);
        let counts_after = SplitCounts::after(&allocation);
        Self {
            note: MAP_NOTE.to_string(),
            counts_before,
            counts_after,
            delta: SplitDelta::between(&counts_before, &counts_after),
            splits: allocation,
        }
    }
}
