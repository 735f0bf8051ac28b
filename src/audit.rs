//! Missing-field audit over the blend dataset.
//!
//! Scans every record for required metadata and writes a CSV report of the
//! incomplete ones, one row per blend.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::rating::BlendRating;
use crate::store::BlendStore;

/// Metadata fields every published record is expected to carry.
pub const REQUIRED_FIELDS: &[&str] = &[
    "imagePath",
    "name",
    "blender",
    "blendedBy",
    "manufacturedBy",
    "production",
    "country",
    "blendType",
    "contents",
    "cut",
    "packaging",
    "flavoring",
    "description",
];

/// One CSV row in the audit report.
#[derive(Debug, Serialize)]
pub struct AuditRow {
    pub file: String,
    pub name: String,
    /// Semicolon-joined list of missing field names.
    pub missing_fields: String,
}

#[derive(Debug, Default)]
pub struct AuditSummary {
    pub scanned: usize,
    pub incomplete: usize,
    pub unreadable: usize,
}

/// Missing fields of one record: absent keys and empty strings both count.
pub fn missing_fields(record: &BlendRating) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| {
            match record.details.get(**field) {
                None => true,
                Some(value) => value.as_str().is_some_and(str::is_empty),
            }
        })
        .copied()
        .collect()
}

/// Scans the store and writes the report to `report_path`. With
/// `field_filter` set, only blends missing that specific field are reported.
#[tracing::instrument(skip(store), fields(blend_dir = %store.dir().display()))]
pub fn run_audit(
    store: &BlendStore,
    report_path: &Path,
    field_filter: Option<&str>,
) -> Result<AuditSummary> {
    if let Some(parent) = report_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
    }

    let mut writer = csv::Writer::from_path(report_path)
        .with_context(|| format!("cannot write report {}", report_path.display()))?;

    let mut summary = AuditSummary::default();

    for file_name in store.list()? {
        let record_file = match store.load(&file_name) {
            Ok(r) => r,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Skipping unreadable record");
                summary.unreadable += 1;
                continue;
            }
        };
        summary.scanned += 1;

        let mut missing = missing_fields(&record_file.record);
        if let Some(field) = field_filter {
            missing.retain(|m| *m == field);
        }
        if missing.is_empty() {
            continue;
        }

        summary.incomplete += 1;
        writer.serialize(AuditRow {
            file: file_name.clone(),
            name: record_file
                .record
                .details
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("")
                .to_string(),
            missing_fields: missing.join(";"),
        })?;
    }

    writer.flush()?;
    info!(
        scanned = summary.scanned,
        incomplete = summary.incomplete,
        unreadable = summary.unreadable,
        report = %report_path.display(),
        "Audit complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BlendRecordFile, blend_key};

    fn record_with(fields: &[(&str, &str)]) -> BlendRating {
        let mut record = BlendRating::template();
        for (key, value) in fields {
            record
                .details
                .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
        record
    }

    fn complete_fields() -> Vec<(&'static str, &'static str)> {
        REQUIRED_FIELDS.iter().map(|f| (*f, "filled")).collect()
    }

    #[test]
    fn complete_record_has_no_missing_fields() {
        let record = record_with(&complete_fields());
        assert!(missing_fields(&record).is_empty());
    }

    #[test]
    fn absent_and_empty_both_count_as_missing() {
        let mut fields = complete_fields();
        fields.retain(|(k, _)| *k != "country");
        fields.push(("cut", ""));
        let record = record_with(&fields);

        let missing = missing_fields(&record);
        assert!(missing.contains(&"country"));
        assert!(missing.contains(&"cut"));
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn audit_writes_one_row_per_incomplete_blend() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlendStore::new(dir.path());

        let complete = record_with(&complete_fields());
        store
            .save(
                "A - Done.json",
                &BlendRecordFile {
                    blend_key: blend_key("Done"),
                    record: complete,
                },
            )
            .unwrap();

        let mut fields = complete_fields();
        fields.retain(|(k, _)| *k != "description");
        store
            .save(
                "B - Sparse.json",
                &BlendRecordFile {
                    blend_key: blend_key("Sparse"),
                    record: record_with(&fields),
                },
            )
            .unwrap();

        let report = dir.path().join("report.csv");
        let summary = run_audit(&store, &report, None).unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.incomplete, 1);

        let content = std::fs::read_to_string(&report).unwrap();
        assert!(content.contains("B - Sparse.json"));
        assert!(content.contains("description"));
        assert!(!content.contains("A - Done.json"));
    }

    #[test]
    fn field_filter_narrows_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlendStore::new(dir.path());

        let mut fields = complete_fields();
        fields.retain(|(k, _)| *k != "cut");
        store
            .save(
                "C - NoCut.json",
                &BlendRecordFile {
                    blend_key: blend_key("NoCut"),
                    record: record_with(&fields),
                },
            )
            .unwrap();

        let report = dir.path().join("report.csv");
        let summary = run_audit(&store, &report, Some("country")).unwrap();
        assert_eq!(summary.incomplete, 0);

        let summary = run_audit(&store, &report, Some("cut")).unwrap();
        assert_eq!(summary.incomplete, 1);
    }
}
