//! Blend record persistence.
//!
//! Each blend lives in its own JSON file named `{Brand} - {Name}.json`. The
//! file holds a single top-level key (the blend key: the blend name,
//! lowercased, spaces stripped) whose value is the record. Files are written
//! with 4-space indentation so hand-edited records don't churn in diffs.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::rating::BlendRating;

/// A record file decoded into its blend key and record body.
#[derive(Debug, Clone)]
pub struct BlendRecordFile {
    pub blend_key: String,
    pub record: BlendRating,
}

/// Handle on a blend-data directory. All paths flow through here; nothing in
/// the crate touches the directory layout directly.
#[derive(Debug, Clone)]
pub struct BlendStore {
    dir: PathBuf,
}

impl BlendStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// All record file names in the store, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("cannot read blend directory {}", self.dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Case-insensitive search over file stems.
    pub fn search(&self, term: &str) -> Result<Vec<String>> {
        let term = term.to_lowercase();
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| {
                Path::new(name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.to_lowercase().contains(&term))
            })
            .collect())
    }

    pub fn load(&self, file_name: &str) -> Result<BlendRecordFile> {
        let path = self.path_for(file_name);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("cannot read record {}", path.display()))?;

        let mut document: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&content)
                .with_context(|| format!("record {} is not valid JSON", path.display()))?;

        if document.len() != 1 {
            bail!(
                "record {} must have exactly one top-level blend key, found {}",
                path.display(),
                document.len()
            );
        }

        // Safe: length checked above.
        let (blend_key, body) = document.iter_mut().next().unwrap();
        let record: BlendRating = serde_json::from_value(body.take())
            .with_context(|| format!("record {} has a malformed body", path.display()))?;

        Ok(BlendRecordFile {
            blend_key: blend_key.clone(),
            record,
        })
    }

    pub fn save(&self, file_name: &str, record_file: &BlendRecordFile) -> Result<()> {
        let path = self.path_for(file_name);
        debug!(path = %path.display(), blend_key = %record_file.blend_key, "Writing record");

        let mut document = serde_json::Map::new();
        document.insert(
            record_file.blend_key.clone(),
            serde_json::to_value(&record_file.record)?,
        );

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        document.serialize(&mut serializer)?;
        buf.push(b'\n');

        fs::write(&path, buf).with_context(|| format!("cannot write record {}", path.display()))
    }

    /// Creates a new record file, refusing to clobber an existing one.
    pub fn create(&self, file_name: &str, record_file: &BlendRecordFile) -> Result<()> {
        let path = self.path_for(file_name);
        if path.exists() {
            bail!("record {} already exists", path.display());
        }
        self.save(file_name, record_file)
    }

    /// Maps every blend key in the store to its file name. Used by the sync
    /// driver to route fetched submissions, which carry only the blend key.
    pub fn blend_key_index(&self) -> Result<HashMap<String, String>> {
        let mut index = HashMap::new();
        for file_name in self.list()? {
            let path = self.path_for(&file_name);
            let content = fs::read_to_string(&path)
                .with_context(|| format!("cannot read record {}", path.display()))?;
            let document: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&content)
                    .with_context(|| format!("record {} is not valid JSON", path.display()))?;
            if let Some(key) = document.keys().next() {
                index.insert(key.clone(), file_name);
            }
        }
        Ok(index)
    }
}

/// The canonical blend key for a blend name: lowercased, spaces stripped.
pub fn blend_key(name: &str) -> String {
    name.replace(' ', "").to_lowercase()
}

/// The standard image path stored in a record's metadata.
pub fn image_path(brand: &str, name: &str) -> String {
    format!("../blend_pictures/{brand} - {name}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::BlendRating;

    fn store_with_record(name: &str) -> (tempfile::TempDir, BlendStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlendStore::new(dir.path());

        let mut record = BlendRating::template();
        record.details.insert(
            "name".to_string(),
            serde_json::Value::String(name.to_string()),
        );
        let record_file = BlendRecordFile {
            blend_key: blend_key(name),
            record,
        };
        store
            .save(&format!("Test Brand - {name}.json"), &record_file)
            .unwrap();

        (dir, store)
    }

    #[test]
    fn save_and_load_round_trip() {
        let (_dir, store) = store_with_record("Night Cap");

        let loaded = store.load("Test Brand - Night Cap.json").unwrap();
        assert_eq!(loaded.blend_key, "nightcap");
        assert_eq!(loaded.record.total_reviews, 0);
        assert_eq!(loaded.record.details["name"], "Night Cap");
    }

    #[test]
    fn metadata_survives_rewrite_unchanged() {
        let (_dir, store) = store_with_record("Night Cap");
        let file_name = "Test Brand - Night Cap.json";

        let first = fs::read_to_string(store.path_for(file_name)).unwrap();
        let loaded = store.load(file_name).unwrap();
        store.save(file_name, &loaded).unwrap();
        let second = fs::read_to_string(store.path_for(file_name)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn list_is_sorted_and_json_only() {
        let (dir, store) = store_with_record("Night Cap");
        fs::write(dir.path().join("notes.txt"), "scratch").unwrap();
        fs::write(dir.path().join("A - First.json"), "{\"first\":{}}").unwrap();

        let files = store.list().unwrap();
        assert_eq!(
            files,
            vec![
                "A - First.json".to_string(),
                "Test Brand - Night Cap.json".to_string()
            ]
        );
    }

    #[test]
    fn search_is_case_insensitive() {
        let (_dir, store) = store_with_record("Night Cap");
        assert_eq!(store.search("night").unwrap().len(), 1);
        assert_eq!(store.search("NIGHT CAP").unwrap().len(), 1);
        assert!(store.search("morning").unwrap().is_empty());
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let (_dir, store) = store_with_record("Night Cap");
        let loaded = store.load("Test Brand - Night Cap.json").unwrap();
        assert!(store.create("Test Brand - Night Cap.json", &loaded).is_err());
    }

    #[test]
    fn multiple_top_level_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlendStore::new(dir.path());
        fs::write(dir.path().join("bad.json"), "{\"a\":{},\"b\":{}}").unwrap();
        assert!(store.load("bad.json").is_err());
    }

    #[test]
    fn blend_key_index_maps_keys_to_files() {
        let (_dir, store) = store_with_record("Night Cap");
        let index = store.blend_key_index().unwrap();
        assert_eq!(
            index.get("nightcap").map(String::as_str),
            Some("Test Brand - Night Cap.json")
        );
    }

    #[test]
    fn blend_key_normalization() {
        assert_eq!(blend_key("Night Cap"), "nightcap");
        assert_eq!(blend_key("Ancient Days"), "ancientdays");
    }
}
