//! Origin registry: which legacy file an identifier came from and where that
//! file's examples belong by default.

use std::fmt;
use std::path::Path;

use crate::constants::origins::{DEV_FILE, TEST_FILE, TRAIN_FILE};
use crate::errors::SimordError;
use crate::splits::{Bucket, TargetSplit};

/// One of the three legacy source collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// `train.json`.
    Train,
    /// `dev.json`.
    Dev,
    /// `test.json`.
    Test,
}

impl Origin {
    /// Origins in canonical load order.
    pub const ALL: [Origin; 3] = [Origin::Train, Origin::Dev, Origin::Test];

    /// Resolve an origin from its file name (case-insensitive, directory ignored).
    pub fn from_filename(filename: &str) -> Result<Self, SimordError> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(filename);
        Self::ALL
            .into_iter()
            .find(|origin| name.eq_ignore_ascii_case(origin.filename()))
            .ok_or_else(|| SimordError::UnknownOrigin(filename.to_string()))
    }

    /// File name of this origin under the original data directory.
    pub fn filename(self) -> &'static str {
        match self {
            Origin::Train => TRAIN_FILE,
            Origin::Dev => DEV_FILE,
            Origin::Test => TEST_FILE,
        }
    }

    /// Target split this origin's examples belonged to before reallocation.
    pub fn canonical_split(self) -> TargetSplit {
        match self {
            Origin::Train => TargetSplit::Train,
            Origin::Dev => TargetSplit::Test1,
            Origin::Test => TargetSplit::Test2,
        }
    }

    /// Placement for `other`-bucket identifiers: they never migrate.
    pub fn other_bucket_split(self) -> TargetSplit {
        self.canonical_split()
    }

    /// Buckets an identifier drawn from this origin is expected to carry.
    pub fn expected_buckets(self) -> &'static [Bucket] {
        match self {
            Origin::Train => &[Bucket::Train],
            Origin::Dev => &[Bucket::Validation],
            Origin::Test => &[Bucket::Test1, Bucket::Test2, Bucket::Test3],
        }
    }

    /// True when `bucket` matches what this origin is expected to hold.
    pub fn expects(self, bucket: Bucket) -> bool {
        self.expected_buckets().contains(&bucket)
    }

    /// Label pairing the legacy name with its target split (`dev/test1`).
    pub fn display_label(self) -> &'static str {
        match self {
            Origin::Train => "train",
            Origin::Dev => "dev/test1",
            Origin::Test => "test/test2",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_filename_accepts_known_origins_case_insensitively() {
        assert_eq!(Origin::from_filename("train.json").unwrap(), Origin::Train);
        assert_eq!(Origin::from_filename("DEV.json").unwrap(), Origin::Dev);
        assert_eq!(
            Origin::from_filename("data/original/Test.JSON").unwrap(),
            Origin::Test
        );
    }

    #[test]
    fn from_filename_rejects_unknown_origin() {
        let err = Origin::from_filename("valid.json").unwrap_err();
        assert!(matches!(err, SimordError::UnknownOrigin(name) if name == "valid.json"));
    }

    #[test]
    fn canonical_splits_follow_legacy_mapping() {
        assert_eq!(Origin::Train.canonical_split(), TargetSplit::Train);
        assert_eq!(Origin::Dev.canonical_split(), TargetSplit::Test1);
        assert_eq!(Origin::Test.canonical_split(), TargetSplit::Test2);
        for origin in Origin::ALL {
            assert_eq!(origin.other_bucket_split(), origin.canonical_split());
        }
    }

    #[test]
    fn expected_buckets_accept_any_test_suffix_for_test_origin() {
        assert!(Origin::Test.expects(Bucket::Test1));
        assert!(Origin::Test.expects(Bucket::Test3));
        assert!(!Origin::Test.expects(Bucket::Validation));
        assert!(Origin::Dev.expects(Bucket::Validation));
        assert!(!Origin::Train.expects(Bucket::Other));
    }
}
