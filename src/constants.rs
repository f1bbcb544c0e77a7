use crate::splits::TargetSplit;

/// Constants describing the legacy origin files.
pub mod origins {
    /// Origin file holding the legacy train partition.
    pub const TRAIN_FILE: &str = "train.json";
    /// Origin file holding the legacy dev partition.
    pub const DEV_FILE: &str = "dev.json";
    /// Origin file holding the legacy test partition.
    pub const TEST_FILE: &str = "test.json";
    /// Canonical origin load order.
    pub const ORIGIN_FILES: [&str; 3] = [TRAIN_FILE, DEV_FILE, TEST_FILE];
}

/// Constants used by the reallocation map artifact.
pub mod reallocation {
    use super::TargetSplit;

    /// Note stored at the top of every reallocation map.
    pub const MAP_NOTE: &str = "Samples in 'other' bucket (primock57 dataset) remain in their original split; \
train-origin samples with held-out suffixes are split evenly between test1 and test2 in sorted id order";
    /// Canonical split iteration order for reports and artifacts.
    pub const ALL_TARGETS: [TargetSplit; 3] =
        [TargetSplit::Train, TargetSplit::Test1, TargetSplit::Test2];
    /// Number of sample ids reported per missing/extra list on verification failure.
    pub const MISMATCH_SAMPLE_LEN: usize = 5;
}

/// Filesystem layout under the data directory.
pub mod layout {
    /// Default data directory when neither argument nor environment is set.
    pub const DEFAULT_DATA_DIR: &str = "data";
    /// Subdirectory holding the origin files.
    pub const ORIGINAL_SUBDIR: &str = "original";
    /// Subdirectory receiving assembled splits.
    pub const NEW_SUBDIR: &str = "new";
    /// Subdirectory caching ACI-Bench parquet shards.
    pub const ACI_CACHE_SUBDIR: &str = "aci_bench_cache";
    /// File name of the persisted reallocation map.
    pub const MAP_FILENAME: &str = "reallocation_map.json";
}

/// Constants for the PriMock57 transcript collaborator.
pub mod primock {
    /// Source id used in logs and errors.
    pub const SOURCE_ID: &str = "primock57";
    /// Case-insensitive prefix identifying PriMock57 ids.
    pub const ID_PREFIX: &str = "primock57_";
    /// Raw TextGrid location of the published transcripts.
    pub const DEFAULT_BASE_URL: &str =
        "https://raw.githubusercontent.com/babylonhealth/primock57/main/transcripts";
    /// Request timeout in seconds for each TextGrid fetch.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Id previewed by the `transcript` command when none is given.
    pub const DEFAULT_PREVIEW_ID: &str = "primock57_4_1";
    /// Characters printed by the `transcript` command.
    pub const PREVIEW_CHARS: usize = 2000;
    /// Progress is logged after this many fetches.
    pub const PROGRESS_EVERY: usize = 10;
}

/// Constants for the ACI-Bench hub collaborator.
pub mod aci_bench {
    /// Source id prefix used in logs and errors.
    pub const SOURCE_ID: &str = "aci_bench";
    /// Hugging Face dataset id.
    pub const DEFAULT_DATASET: &str = "mkieffer/ACI-Bench";
    /// Dataset configs (subsets) holding dialogues.
    pub const SUBSETS: [&str; 3] = ["virtassist", "aci", "virtscribe"];
    /// Split names published for every subset.
    pub const SPLITS: [&str; 5] = ["train", "valid", "test1", "test2", "test3"];
    /// Column carrying the encounter id.
    pub const ENCOUNTER_COLUMN: &str = "encounter_id";
    /// Column carrying the dialogue.
    pub const DIALOGUE_COLUMN: &str = "dialogue";
    /// Datasets-server parquet manifest endpoint.
    pub const PARQUET_MANIFEST_ENDPOINT: &str = "https://datasets-server.huggingface.co/parquet";
    /// Shard extension accepted from manifests and repository listings.
    pub const SHARD_EXTENSION: &str = "parquet";
    /// Retry count handed to the hub client.
    pub const HUB_RETRIES: usize = 5;
}

/// Environment variables consulted when a CLI argument is absent.
pub mod env {
    /// Overrides the data directory.
    pub const DATA_DIR: &str = "SIMORD_DATA_DIR";
    /// Overrides the ACI-Bench dataset id.
    pub const ACI_DATASET: &str = "SIMORD_ACI_DATASET";
    /// Overrides the PriMock57 TextGrid base URL.
    pub const PRIMOCK_BASE_URL: &str = "SIMORD_PRIMOCK_BASE_URL";
}
