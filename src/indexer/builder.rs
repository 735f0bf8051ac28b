//! Walks the blend store and writes the site's static data files.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::indexer::types::{BlendMetadata, IndexEntry};
use crate::store::BlendStore;

#[derive(Debug, Default)]
pub struct IndexSummary {
    pub indexed: usize,
    pub skipped: usize,
}

/// Regenerates `blend_index.json`, `blend_metadata.json`, the blended-by and
/// manufactured-by side files, and `blend_manifest.json` under `out_dir`.
///
/// Unreadable record files are logged and skipped; one bad record must not
/// take the whole site index down.
#[tracing::instrument(skip(store), fields(blend_dir = %store.dir().display(), out_dir = %out_dir.display()))]
pub fn build_index(store: &BlendStore, out_dir: &Path) -> Result<IndexSummary> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;

    let files = store.list()?;
    let mut index: IndexMap<String, IndexEntry> = IndexMap::new();
    let mut metadata = BlendMetadata::default();
    let mut summary = IndexSummary::default();

    for file_name in &files {
        match store.load(file_name) {
            Ok(record_file) => {
                metadata.collect(&record_file.record);
                index.insert(file_name.clone(), IndexEntry::from_record(&record_file.record));
                summary.indexed += 1;
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "Skipping unreadable record");
                summary.skipped += 1;
            }
        }
    }

    write_json(&out_dir.join("blend_index.json"), &index)?;
    write_json(&out_dir.join("blend_metadata.json"), &metadata)?;
    write_json(&out_dir.join("blended_by.json"), &metadata.blended_by)?;
    write_json(&out_dir.join("manufactured_by.json"), &metadata.manufactured_by)?;

    // The manifest is just the sorted record file list.
    write_json(&out_dir.join("blend_manifest.json"), &files)?;

    info!(
        indexed = summary.indexed,
        skipped = summary.skipped,
        "Site index written"
    );
    Ok(summary)
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::{BlendRating, RatingSubmission, apply};
    use crate::store::{BlendRecordFile, blend_key};
    use indexmap::IndexMap as Map;

    fn seeded_store() -> (tempfile::TempDir, BlendStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlendStore::new(dir.path());

        for (brand, name, country) in [
            ("Samuel Gawith", "Full Virginia Flake", "United Kingdom"),
            ("G.L. Pease", "Westminster", "United States"),
        ] {
            let mut record = BlendRating::template();
            for (key, value) in [
                ("name", name),
                ("blender", brand),
                ("blendedBy", brand),
                ("country", country),
                ("blendType", "Straight Virginia"),
            ] {
                record
                    .details
                    .insert(key.to_string(), serde_json::Value::String(value.to_string()));
            }

            let mut profiles = Map::new();
            profiles.insert("strength".to_string(), "Medium".to_string());
            profiles.insert("flavoring".to_string(), "None Detected".to_string());
            profiles.insert("roomNote".to_string(), "Tolerable".to_string());
            profiles.insert("taste".to_string(), "Full".to_string());
            apply(
                &mut record,
                &RatingSubmission {
                    rating: 3.5,
                    profiles,
                },
            )
            .unwrap();

            store
                .save(
                    &format!("{brand} - {name}.json"),
                    &BlendRecordFile {
                        blend_key: blend_key(name),
                        record,
                    },
                )
                .unwrap();
        }

        (dir, store)
    }

    #[test]
    fn writes_all_five_output_files() {
        let (_dir, store) = seeded_store();
        let out = tempfile::tempdir().unwrap();

        let summary = build_index(&store, out.path()).unwrap();
        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.skipped, 0);

        for name in [
            "blend_index.json",
            "blend_metadata.json",
            "blended_by.json",
            "manufactured_by.json",
            "blend_manifest.json",
        ] {
            assert!(out.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn index_entries_are_compact_and_abbreviated() {
        let (_dir, store) = seeded_store();
        let out = tempfile::tempdir().unwrap();
        build_index(&store, out.path()).unwrap();

        let index: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out.path().join("blend_index.json")).unwrap(),
        )
        .unwrap();

        let entry = &index["G.L. Pease - Westminster.json"];
        assert_eq!(entry["n"], "Westminster");
        assert_eq!(entry["y"], "United States");
        // rc mirrors the curated reviewCount field, which ratings don't move.
        assert_eq!(entry["rc"], 0);
        // A zeroed maxRating reads as the site default.
        assert_eq!(entry["mr"], 5.0);
        assert_eq!(entry["rt"]["s"]["l"], "Medium");
        assert_eq!(entry["rt"]["s"]["d"]["Med"], 100.0);
        assert_eq!(entry["rt"]["f"]["d"]["ND"], 100.0);
    }

    #[test]
    fn metadata_lists_are_sorted_and_unique() {
        let (_dir, store) = seeded_store();
        let out = tempfile::tempdir().unwrap();
        build_index(&store, out.path()).unwrap();

        let metadata: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out.path().join("blend_metadata.json")).unwrap(),
        )
        .unwrap();

        let blenders: Vec<&str> = metadata["blenders"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(blenders, vec!["G.L. Pease", "Samuel Gawith"]);
        assert_eq!(
            metadata["blendTypes"].as_array().unwrap().len(),
            1,
            "shared blend type must be deduplicated"
        );
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let (dir, store) = seeded_store();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let out = tempfile::tempdir().unwrap();

        let summary = build_index(&store, out.path()).unwrap();
        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.skipped, 1);

        let manifest: Vec<String> = serde_json::from_str(
            &fs::read_to_string(out.path().join("blend_manifest.json")).unwrap(),
        )
        .unwrap();
        // The manifest lists every record file, readable or not.
        assert_eq!(manifest.len(), 3);
    }
}
