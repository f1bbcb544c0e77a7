use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::origins::ORIGIN_FILES;
use crate::data::{OriginRecord, OriginSet};
use crate::errors::SimordError;
use crate::registry::Origin;

/// Read and decode a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SimordError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        SimordError::Io(std::io::Error::new(
            err.kind(),
            format!("failed reading {}: {err}", path.display()),
        ))
    })?;
    serde_json::from_str(&raw).map_err(|err| SimordError::InvalidJson {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Write `value` as pretty JSON, replacing `path` atomically.
///
/// The document is written to a `.part` sibling first and renamed into place,
/// so readers never observe a half-written file.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SimordError> {
    let mut body = serde_json::to_string_pretty(value).map_err(|err| SimordError::InvalidJson {
        path: path.to_path_buf(),
        reason: format!("failed encoding: {err}"),
    })?;
    body.push('\n');

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let temp_target = part_path(path);
    {
        let mut file = fs::File::create(&temp_target)?;
        file.write_all(body.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temp_target, path)?;
    debug!("[simord:fs] wrote {} bytes to {}", body.len(), path.display());
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Load one origin file; its name must be a registered origin.
pub fn load_origin_file(path: &Path) -> Result<OriginSet, SimordError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let origin = Origin::from_filename(filename)?;
    let records: Vec<OriginRecord> = read_json(path)?;
    info!(
        "[simord:fs] loaded {} records from {}",
        records.len(),
        path.display()
    );
    Ok(OriginSet::new(origin, records))
}

/// Load all three origin files from `dir` in canonical order.
pub fn load_origins(dir: &Path) -> Result<Vec<OriginSet>, SimordError> {
    ORIGIN_FILES
        .iter()
        .map(|filename| load_origin_file(&dir.join(filename)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    #[test]
    fn write_json_pretty_creates_parents_and_leaves_no_part_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("map.json");
        write_json_pretty(&path, &json!({"a": [1, 2]})).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with('\n'));
        assert!(raw.contains("\n  \"a\": [\n"));
        assert!(!part_path(&path).exists());
        let parsed: Value = read_json(&path).unwrap();
        assert_eq!(parsed, json!({"a": [1, 2]}));
    }

    #[test]
    fn write_json_pretty_keeps_non_ascii_unescaped() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("rows.json");
        write_json_pretty(&path, &json!(["café"])).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("café"));
    }

    #[test]
    fn read_json_reports_path_on_decode_failure() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("train.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json::<Value>(&path).unwrap_err();
        assert!(matches!(&err, SimordError::InvalidJson { path: p, .. } if p == &path));
        assert!(err.to_string().contains("train.json"));
    }

    #[test]
    fn load_origin_file_rejects_unregistered_names() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("holdout.json");
        fs::write(&path, "[]").unwrap();
        assert!(matches!(
            load_origin_file(&path),
            Err(SimordError::UnknownOrigin(name)) if name == "holdout.json"
        ));
    }

    #[test]
    fn load_origins_reads_all_three_files_in_order() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("train.json"),
            r#"[{"id":"a_train","expected_orders":[{"k":1}]}]"#,
        )
        .unwrap();
        fs::write(temp.path().join("dev.json"), r#"[{"id":"b_valid"}]"#).unwrap();
        fs::write(temp.path().join("test.json"), "[]").unwrap();

        let origins = load_origins(temp.path()).unwrap();
        let loaded: Vec<Origin> = origins.iter().map(|set| set.origin).collect();
        assert_eq!(loaded, vec![Origin::Train, Origin::Dev, Origin::Test]);
        assert_eq!(origins[0].records[0].expected_orders, vec![json!({"k": 1})]);
        assert!(origins[2].is_empty());
    }

    #[test]
    fn load_origins_fails_when_a_file_is_missing() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("train.json"), "[]").unwrap();
        assert!(matches!(load_origins(temp.path()), Err(SimordError::Io(_))));
    }
}
