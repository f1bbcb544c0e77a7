use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition signal carried by an identifier's trailing segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// `_train` suffix.
    Train,
    /// `_valid` suffix.
    Validation,
    /// `_test1` suffix.
    Test1,
    /// `_test2` suffix.
    Test2,
    /// `_test3` suffix.
    Test3,
    /// No recognizable suffix (the PriMock57 population).
    Other,
}

impl Bucket {
    /// Every bucket in report column order.
    pub const ALL: [Bucket; 6] = [
        Bucket::Train,
        Bucket::Validation,
        Bucket::Test1,
        Bucket::Test2,
        Bucket::Test3,
        Bucket::Other,
    ];

    /// Lower-case bucket name.
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Train => "train",
            Bucket::Validation => "validation",
            Bucket::Test1 => "test1",
            Bucket::Test2 => "test2",
            Bucket::Test3 => "test3",
            Bucket::Other => "other",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output partitions of the reallocated dataset.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetSplit {
    /// Training split.
    Train,
    /// First evaluation split (legacy dev).
    Test1,
    /// Second evaluation split (legacy test).
    Test2,
}

impl TargetSplit {
    /// Lower-case split name used in artifacts and file names.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetSplit::Train => "train",
            TargetSplit::Test1 => "test1",
            TargetSplit::Test2 => "test2",
        }
    }
}

impl fmt::Display for TargetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trailing-segment lookup table, checked in priority order.
const SUFFIX_TABLE: [(&str, Bucket); 5] = [
    ("valid", Bucket::Validation),
    ("train", Bucket::Train),
    ("test1", Bucket::Test1),
    ("test2", Bucket::Test2),
    ("test3", Bucket::Test3),
];

/// Classify an identifier by its trailing `_`-delimited segment.
///
/// Matching is case-insensitive and anchored to the whole trailing segment,
/// so `x_valid` and bare `valid` match while `xvalid` does not.
pub fn classify(id: &str) -> Bucket {
    let trimmed = id.trim();
    let segment = trimmed.rsplit('_').next().unwrap_or(trimmed);
    SUFFIX_TABLE
        .iter()
        .find(|(suffix, _)| segment.eq_ignore_ascii_case(suffix))
        .map(|(_, bucket)| *bucket)
        .unwrap_or(Bucket::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_every_suffix() {
        assert_eq!(classify("x_train"), Bucket::Train);
        assert_eq!(classify("x_valid"), Bucket::Validation);
        assert_eq!(classify("x_test1"), Bucket::Test1);
        assert_eq!(classify("x_test2"), Bucket::Test2);
        assert_eq!(classify("x_test3"), Bucket::Test3);
        assert_eq!(classify("plain_id"), Bucket::Other);
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(classify("X_TRAIN"), Bucket::Train);
        assert_eq!(classify("acibench_D2N001_VirtAssist_Valid"), Bucket::Validation);
        assert_eq!(classify("a_TeSt3"), Bucket::Test3);
    }

    #[test]
    fn classify_accepts_bare_tokens() {
        assert_eq!(classify("valid"), Bucket::Validation);
        assert_eq!(classify("train"), Bucket::Train);
        assert_eq!(classify("test2"), Bucket::Test2);
    }

    #[test]
    fn classify_requires_whole_trailing_segment() {
        assert_eq!(classify("xvalid"), Bucket::Other);
        assert_eq!(classify("x_pretrain"), Bucket::Other);
        assert_eq!(classify("x_test4"), Bucket::Other);
        assert_eq!(classify("x_train_"), Bucket::Other);
        assert_eq!(classify("x_train_extra"), Bucket::Other);
        assert_eq!(classify(""), Bucket::Other);
    }

    #[test]
    fn classify_ignores_surrounding_whitespace() {
        assert_eq!(classify("  a_test1 \n"), Bucket::Test1);
    }

    #[test]
    fn classify_handles_multi_segment_acibench_ids() {
        assert_eq!(
            classify("acibench_D2N088_virtassist_clinicalnlp_taskB_test1"),
            Bucket::Test1
        );
        assert_eq!(classify("primock57_4_1"), Bucket::Other);
    }

    #[test]
    fn target_split_serializes_lowercase() {
        let encoded = serde_json::to_string(&TargetSplit::Test2).unwrap();
        assert_eq!(encoded, "\"test2\"");
    }
}
