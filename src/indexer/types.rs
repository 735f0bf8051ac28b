//! Data types written out by the index builder.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::indexer::abbrev;
use crate::rating::{BlendRating, ProfileRating};

/// Compact per-blend entry in `blend_index.json`. Field names are
/// deliberately terse; the index is shipped to browsers on every page load.
#[derive(Debug, Serialize)]
pub struct IndexEntry {
    /// Name.
    pub n: String,
    /// Blender.
    pub b: String,
    /// Blended by.
    pub bb: String,
    /// Manufactured by.
    pub mb: String,
    /// Blend type.
    pub t: String,
    /// Contents.
    pub c: String,
    /// Cut.
    pub ct: String,
    /// Country.
    pub y: String,
    /// Packaging.
    pub p: String,
    /// Flavoring.
    pub f: String,
    /// Production status.
    pub pr: String,
    /// Average star rating.
    pub r: f64,
    /// Maximum star rating.
    pub mr: f64,
    /// Curated review count from the record metadata, not the rating total.
    pub rc: u64,
    /// Whole-star distribution summary.
    pub rd: StarSummary,
    /// Per-profile rating summaries.
    pub rt: ProfileSummaries,
}

#[derive(Debug, Serialize)]
pub struct StarSummary {
    #[serde(rename = "4")]
    pub four: u64,
    #[serde(rename = "3")]
    pub three: u64,
    #[serde(rename = "2")]
    pub two: u64,
    #[serde(rename = "1")]
    pub one: u64,
}

#[derive(Debug, Serialize)]
pub struct ProfileSummaries {
    pub s: ProfileSummary,
    pub f: ProfileSummary,
    pub r: ProfileSummary,
    pub t: ProfileSummary,
}

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    /// Most common level.
    pub l: String,
    /// Abbreviated-label distribution.
    pub d: IndexMap<String, f64>,
}

impl ProfileSummary {
    fn from_profile(profile: &ProfileRating, table: &[(&str, &str)]) -> Self {
        Self {
            l: profile.level.clone(),
            d: profile
                .distribution
                .iter()
                .map(|(label, weight)| (abbrev::abbreviate(table, label), *weight))
                .collect(),
        }
    }
}

impl IndexEntry {
    pub fn from_record(record: &BlendRating) -> Self {
        let star = |bucket: &str| record.rating_distribution.get(bucket).copied().unwrap_or(0);

        Self {
            n: detail(record, "name"),
            b: detail(record, "blender"),
            bb: detail(record, "blendedBy"),
            mb: detail(record, "manufacturedBy"),
            t: detail(record, "blendType"),
            c: detail(record, "contents"),
            ct: detail(record, "cut"),
            y: detail(record, "country"),
            p: detail(record, "packaging"),
            f: detail(record, "flavoring"),
            pr: detail(record, "production"),
            r: record.average_rating,
            // A missing or zeroed maxRating falls back to the site default.
            mr: match record.max_rating {
                Some(m) if m != 0 => m as f64,
                _ => 5.0,
            },
            rc: record.review_count.unwrap_or(0),
            rd: StarSummary {
                four: star("4_star"),
                three: star("3_star"),
                two: star("2_star"),
                one: star("1_star"),
            },
            rt: ProfileSummaries {
                s: ProfileSummary::from_profile(&record.ratings.strength, abbrev::STRENGTH),
                f: ProfileSummary::from_profile(&record.ratings.flavoring, abbrev::FLAVORING),
                r: ProfileSummary::from_profile(&record.ratings.room_note, abbrev::ROOM_NOTE),
                t: ProfileSummary::from_profile(&record.ratings.taste, abbrev::TASTE),
            },
        }
    }
}

fn detail(record: &BlendRating, key: &str) -> String {
    record
        .details
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Unique metadata values across the whole dataset, written to
/// `blend_metadata.json`. `BTreeSet` keeps each list sorted.
#[derive(Debug, Default, Serialize)]
pub struct BlendMetadata {
    pub blenders: BTreeSet<String>,
    #[serde(rename = "blendedBy")]
    pub blended_by: BTreeSet<String>,
    #[serde(rename = "manufacturedBy")]
    pub manufactured_by: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    #[serde(rename = "blendTypes")]
    pub blend_types: BTreeSet<String>,
    pub contents: BTreeSet<String>,
    pub cuts: BTreeSet<String>,
    pub packagings: BTreeSet<String>,
    pub flavorings: BTreeSet<String>,
    #[serde(rename = "productionTypes")]
    pub production_types: BTreeSet<String>,
}

impl BlendMetadata {
    pub fn collect(&mut self, record: &BlendRating) {
        let mut add = |set: &mut BTreeSet<String>, key: &str| {
            let value = detail(record, key);
            if !value.is_empty() {
                set.insert(value);
            }
        };

        add(&mut self.blenders, "blender");
        add(&mut self.blended_by, "blendedBy");
        add(&mut self.manufactured_by, "manufacturedBy");
        add(&mut self.countries, "country");
        add(&mut self.blend_types, "blendType");
        add(&mut self.contents, "contents");
        add(&mut self.cuts, "cut");
        add(&mut self.packagings, "packaging");
        add(&mut self.flavorings, "flavoring");
        add(&mut self.production_types, "production");
    }
}
