use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::Value;
use std::cell::OnceCell;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::constants::aci_bench::{
    DEFAULT_DATASET, DIALOGUE_COLUMN, ENCOUNTER_COLUMN, HUB_RETRIES, PARQUET_MANIFEST_ENDPOINT,
    SHARD_EXTENSION, SOURCE_ID, SPLITS, SUBSETS,
};
use crate::errors::SimordError;
use crate::ids::EncounterKey;
use crate::source::EncounterIndex;
use crate::types::{EncounterId, Transcript};

/// Where shard files may be resolved from, tried in configured order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShardOrigin {
    /// Datasets-server parquet manifest, downloaded over HTTP.
    Manifest,
    /// Hub repository file listing via `hf-hub`.
    Hub,
    /// Shards already present in the local cache.
    Cache,
}

/// Loader settings for the ACI-Bench hub dataset.
#[derive(Clone, Debug)]
pub struct AciBenchConfig {
    /// Hugging Face dataset id.
    pub dataset: String,
    /// Subsets to load.
    pub subsets: Vec<String>,
    /// Splits to load per subset.
    pub splits: Vec<String>,
    /// Local shard cache, laid out as `{subset}/{split}/*.parquet`.
    pub cache_dir: PathBuf,
    /// Datasets-server parquet manifest endpoint.
    pub manifest_endpoint: String,
    /// Resolution order for shard files.
    pub shard_origins: Vec<ShardOrigin>,
}

impl AciBenchConfig {
    /// Default subsets, splits and resolution order for `dataset`.
    pub fn new(dataset: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            subsets: SUBSETS.iter().map(|subset| subset.to_string()).collect(),
            splits: SPLITS.iter().map(|split| split.to_string()).collect(),
            cache_dir: cache_dir.into(),
            manifest_endpoint: PARQUET_MANIFEST_ENDPOINT.to_string(),
            shard_origins: vec![ShardOrigin::Manifest, ShardOrigin::Hub, ShardOrigin::Cache],
        }
    }

    /// Default dataset with the given cache directory.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self::new(DEFAULT_DATASET, cache_dir)
    }

    fn split_dir(&self, subset: &str, split: &str) -> PathBuf {
        self.cache_dir.join(subset).join(split)
    }
}

/// One parquet file listed by the datasets-server manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestShard {
    /// Download URL.
    pub url: String,
    /// Expected size in bytes, when published.
    pub size: Option<u64>,
}

impl ManifestShard {
    fn file_name(&self) -> &str {
        self.url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("shard.parquet")
    }
}

/// Parse a datasets-server manifest body into parquet shards.
pub fn parse_manifest(source_id: &str, body: &str) -> Result<Vec<ManifestShard>, SimordError> {
    let json: Value = serde_json::from_str(body).map_err(|err| SimordError::SourceUnavailable {
        source_id: source_id.to_string(),
        reason: format!("failed parsing datasets-server parquet response: {err}"),
    })?;
    let Some(entries) = json.get("parquet_files").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    Ok(entries
        .iter()
        .filter_map(|entry| {
            let url = entry.get("url").and_then(Value::as_str)?;
            has_shard_extension(Path::new(url)).then(|| ManifestShard {
                url: url.to_string(),
                size: entry.get("size").and_then(Value::as_u64),
            })
        })
        .collect())
}

/// Encounter id and dialogue of one decoded row, when the row carries an id.
pub fn dialogue_entry(row: &Value) -> Option<(EncounterId, Transcript)> {
    let encounter = row
        .get(ENCOUNTER_COLUMN)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    let dialogue = row
        .get(DIALOGUE_COLUMN)
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some((encounter.to_string(), dialogue.to_string()))
}

/// Parquet shards already cached below `dir`, sorted by path.
pub fn cached_shards(dir: &Path) -> Vec<PathBuf> {
    let mut shards: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && has_shard_extension(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect();
    shards.sort();
    shards
}

fn has_shard_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SHARD_EXTENSION))
}

/// True when a hub repository path is a parquet shard of `subset`/`split`.
fn is_split_shard(remote_path: &str, subset: &str, split: &str) -> bool {
    let path = Path::new(remote_path);
    if !has_shard_extension(path) {
        return false;
    }
    let in_subset = path
        .components()
        .any(|part| part.as_os_str().to_str().is_some_and(|name| name.eq_ignore_ascii_case(subset)));
    if !in_subset {
        return false;
    }
    remote_path.contains(&format!("{split}/"))
        || remote_path.contains(&format!("-{split}-"))
        || path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&format!("{split}-")))
}

/// Hub paths in `siblings` that are shards of `subset`/`split`, sorted.
fn split_shards(siblings: &[String], subset: &str, split: &str) -> Vec<String> {
    let mut remote: Vec<String> = siblings
        .iter()
        .filter(|path| is_split_shard(path, subset, split))
        .cloned()
        .collect();
    remote.sort();
    remote
}

/// Copy a hub-cached file to `target` through a `.part` sibling.
fn materialize_shard(cached: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_target = target.with_extension("part");
    fs::copy(cached, &temp_target)?;
    fs::rename(&temp_target, target)
}

fn matches_expected_size(path: &Path, expected: Option<u64>) -> bool {
    if !path.exists() {
        return false;
    }
    match expected {
        Some(expected) if expected > 0 => fs::metadata(path)
            .map(|meta| meta.len() == expected)
            .unwrap_or(false),
        _ => true,
    }
}

/// Repository handle and file list, read once per loader.
struct HubListing {
    repo: ApiRepo,
    siblings: Vec<String>,
}

/// Builds the encounter dialogue index from ACI-Bench parquet shards.
pub struct AciBenchLoader {
    config: AciBenchConfig,
    hub: OnceCell<Result<HubListing, String>>,
}

impl AciBenchLoader {
    /// Create a loader; nothing is fetched until [`AciBenchLoader::load`].
    pub fn new(config: AciBenchConfig) -> Self {
        Self {
            config,
            hub: OnceCell::new(),
        }
    }

    /// Load every configured subset. A subset that fails contributes nothing.
    pub fn load(&self) -> EncounterIndex {
        let mut index = EncounterIndex::new(SOURCE_ID);
        for subset in &self.config.subsets {
            match self.load_subset(subset) {
                Ok(subset_index) => {
                    let inserted = index.absorb(subset_index);
                    info!("[simord:aci] subset {subset}: indexed {inserted} encounters");
                }
                Err(err) => warn!("[simord:aci] skipping subset {subset}: {err}"),
            }
        }
        info!(
            "[simord:aci] loaded {} encounters from {}",
            index.len(),
            self.config.dataset
        );
        index
    }

    fn source_id(subset: &str) -> String {
        format!("{SOURCE_ID}:{subset}")
    }

    fn load_subset(&self, subset: &str) -> Result<EncounterIndex, SimordError> {
        let source_id = Self::source_id(subset);
        let mut index = EncounterIndex::new(source_id.as_str());
        let mut shard_count = 0usize;
        for split in &self.config.splits {
            let shards = match self.resolve_shards(subset, split) {
                Ok(shards) => shards,
                Err(err) => {
                    warn!("[simord:aci] {subset}/{split}: {err}");
                    continue;
                }
            };
            for shard in shards {
                read_shard(&source_id, &shard, subset, &mut index)?;
                shard_count += 1;
            }
        }
        if shard_count == 0 {
            return Err(SimordError::SourceUnavailable {
                source_id,
                reason: format!("no parquet shards resolved for dataset '{}'", self.config.dataset),
            });
        }
        Ok(index)
    }

    fn resolve_shards(&self, subset: &str, split: &str) -> Result<Vec<PathBuf>, SimordError> {
        for origin in &self.config.shard_origins {
            let resolved = match origin {
                ShardOrigin::Manifest => self.manifest_shards(subset, split),
                ShardOrigin::Hub => self.hub_shards(subset, split),
                ShardOrigin::Cache => Ok(cached_shards(&self.config.split_dir(subset, split))),
            };
            match resolved {
                Ok(shards) if !shards.is_empty() => {
                    debug!(
                        "[simord:aci] {subset}/{split}: {} shard(s) via {origin:?}",
                        shards.len()
                    );
                    return Ok(shards);
                }
                Ok(_) => debug!("[simord:aci] {subset}/{split}: no shards via {origin:?}"),
                Err(err) => warn!("[simord:aci] {subset}/{split}: {origin:?} failed: {err}"),
            }
        }
        Err(SimordError::SourceUnavailable {
            source_id: Self::source_id(subset),
            reason: format!("no shards found for split '{split}'"),
        })
    }

    fn manifest_shards(&self, subset: &str, split: &str) -> Result<Vec<PathBuf>, SimordError> {
        let source_id = Self::source_id(subset);
        let response = ureq::get(&self.config.manifest_endpoint)
            .query("dataset", &self.config.dataset)
            .query("config", subset)
            .query("split", split)
            .call()
            .map_err(|err| SimordError::SourceUnavailable {
                source_id: source_id.clone(),
                reason: format!("failed querying datasets-server parquet endpoint: {err}"),
            })?;
        let body = response.into_body().read_to_string().map_err(|err| {
            SimordError::SourceUnavailable {
                source_id: source_id.clone(),
                reason: format!("failed reading datasets-server parquet response body: {err}"),
            }
        })?;

        let split_dir = self.config.split_dir(subset, split);
        let mut paths = Vec::new();
        for shard in parse_manifest(&source_id, &body)? {
            let target = split_dir.join(shard.file_name());
            if !matches_expected_size(&target, shard.size) {
                download_shard(&source_id, &shard, &target)?;
            }
            paths.push(target);
        }
        paths.sort();
        Ok(paths)
    }

    fn hub_listing(&self) -> Result<&HubListing, String> {
        self.hub
            .get_or_init(|| {
                let api = ApiBuilder::new()
                    .with_progress(true)
                    .with_retries(HUB_RETRIES)
                    .with_token(None)
                    .build()
                    .map_err(|err| format!("failed building hf-hub client: {err}"))?;
                let repo = api.repo(Repo::new(self.config.dataset.clone(), RepoType::Dataset));
                info!(
                    "[simord:aci] reading remote file list for dataset {}",
                    self.config.dataset
                );
                let info = repo
                    .info()
                    .map_err(|err| format!("failed reading hf-hub repository info: {err}"))?;
                let siblings = info
                    .siblings
                    .into_iter()
                    .map(|sibling| sibling.rfilename)
                    .collect();
                Ok(HubListing { repo, siblings })
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn hub_shards(&self, subset: &str, split: &str) -> Result<Vec<PathBuf>, SimordError> {
        let source_id = Self::source_id(subset);
        let listing = self
            .hub_listing()
            .map_err(|reason| SimordError::SourceUnavailable {
                source_id: source_id.clone(),
                reason,
            })?;

        let split_dir = self.config.split_dir(subset, split);
        let mut paths = Vec::new();
        for remote_path in split_shards(&listing.siblings, subset, split) {
            let file_name = Path::new(&remote_path)
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_default();
            let target = split_dir.join(file_name);
            if !target.exists() {
                let cached = listing.repo.get(&remote_path).map_err(|err| {
                    SimordError::SourceUnavailable {
                        source_id: source_id.clone(),
                        reason: format!("failed downloading '{remote_path}' from hf-hub: {err}"),
                    }
                })?;
                materialize_shard(&cached, &target)?;
            }
            paths.push(target);
        }
        Ok(paths)
    }
}

fn download_shard(source_id: &str, shard: &ManifestShard, target: &Path) -> Result<(), SimordError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_target = target.with_extension("part");
    if temp_target.exists() {
        let _ = fs::remove_file(&temp_target);
    }
    info!("[simord:aci] downloading shard {} -> {}", shard.url, target.display());
    let response = ureq::get(&shard.url)
        .call()
        .map_err(|err| SimordError::SourceUnavailable {
            source_id: source_id.to_string(),
            reason: format!("failed downloading shard URL '{}': {err}", shard.url),
        })?;
    let mut reader = response.into_body().into_reader();
    let written = {
        let mut file = File::create(&temp_target)?;
        io::copy(&mut reader, &mut file).map_err(|err| SimordError::SourceUnavailable {
            source_id: source_id.to_string(),
            reason: format!("failed reading shard stream '{}': {err}", shard.url),
        })?
    };
    if let Some(expected) = shard.size
        && expected > 0
        && expected != written
    {
        let _ = fs::remove_file(&temp_target);
        return Err(SimordError::SourceUnavailable {
            source_id: source_id.to_string(),
            reason: format!(
                "incomplete shard '{}': expected {expected} bytes, received {written}",
                shard.url
            ),
        });
    }
    fs::rename(&temp_target, target)?;
    Ok(())
}

/// Index every row of one shard under `subset`; returns the number of new keys.
fn read_shard(
    source_id: &str,
    path: &Path,
    subset: &str,
    index: &mut EncounterIndex,
) -> Result<usize, SimordError> {
    let file = File::open(path).map_err(|err| SimordError::SourceUnavailable {
        source_id: source_id.to_string(),
        reason: format!("failed opening parquet shard {}: {err}", path.display()),
    })?;
    let reader = SerializedFileReader::new(file).map_err(|err| SimordError::SourceUnavailable {
        source_id: source_id.to_string(),
        reason: format!("failed reading parquet shard {}: {err}", path.display()),
    })?;
    let rows = reader
        .get_row_iter(None)
        .map_err(|err| SimordError::SourceUnavailable {
            source_id: source_id.to_string(),
            reason: format!("failed iterating parquet shard {}: {err}", path.display()),
        })?;

    let mut inserted = 0usize;
    for row in rows {
        let row = row.map_err(|err| SimordError::SourceUnavailable {
            source_id: source_id.to_string(),
            reason: format!("failed reading parquet row in {}: {err}", path.display()),
        })?;
        let Some((encounter, dialogue)) = dialogue_entry(&row.to_json_value()) else {
            continue;
        };
        if index.insert_first(EncounterKey::new(&encounter, subset), dialogue) {
            inserted += 1;
        }
    }
    debug!("[simord:aci] {} new encounters from {}", inserted, path.display());
    Ok(inserted)
}
