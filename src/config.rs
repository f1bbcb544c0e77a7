use std::path::PathBuf;

use crate::constants::aci_bench::DEFAULT_DATASET;
use crate::constants::layout::{
    ACI_CACHE_SUBDIR, DEFAULT_DATA_DIR, MAP_FILENAME, NEW_SUBDIR, ORIGINAL_SUBDIR,
};
use crate::constants::primock::DEFAULT_BASE_URL;
use crate::errors::SimordError;
use crate::source::aci_bench::AciBenchConfig;
use crate::source::primock::PrimockConfig;

/// Resolved pipeline settings shared by every command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Root holding `original/`, `new/` and the reallocation map.
    pub data_dir: PathBuf,
    /// ACI-Bench dataset id on the hub.
    pub aci_dataset: String,
    /// Directory URL of the PriMock57 TextGrid files.
    pub primock_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            aci_dataset: DEFAULT_DATASET.to_string(),
            primock_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Settings rooted at `data_dir` with default collaborators.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Reject values no command can work with.
    pub fn validate(&self) -> Result<(), SimordError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(SimordError::Configuration(
                "data directory must not be empty".to_string(),
            ));
        }
        if self.aci_dataset.trim().is_empty() {
            return Err(SimordError::Configuration(
                "ACI-Bench dataset id must not be empty".to_string(),
            ));
        }
        let url = self.primock_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SimordError::Configuration(format!(
                "PriMock57 base URL must be http(s), got '{url}'"
            )));
        }
        Ok(())
    }

    /// Directory of the legacy origin files.
    pub fn original_dir(&self) -> PathBuf {
        self.data_dir.join(ORIGINAL_SUBDIR)
    }

    /// Directory receiving assembled splits.
    pub fn new_dir(&self) -> PathBuf {
        self.data_dir.join(NEW_SUBDIR)
    }

    /// Location of the persisted reallocation map.
    pub fn map_path(&self) -> PathBuf {
        self.data_dir.join(MAP_FILENAME)
    }

    /// ACI-Bench loader settings with the shard cache under the data directory.
    pub fn aci_bench(&self) -> AciBenchConfig {
        AciBenchConfig::new(self.aci_dataset.clone(), self.data_dir.join(ACI_CACHE_SUBDIR))
    }

    /// PriMock57 fetcher settings.
    pub fn primock(&self) -> PrimockConfig {
        PrimockConfig {
            base_url: self.primock_base_url.clone(),
            ..PrimockConfig::default()
        }
    }
}
