//! Running rating statistics for a single blend.
//!
//! A blend record carries an overall star histogram plus four qualitative
//! profiles (strength, flavoring, room note, taste). Each profile stores its
//! histogram in a normalized form: the most common level is pinned at weight
//! 100 and every other level is scaled relative to it. The representation is
//! lossy by design; [`apply`] reconstructs approximate counts, folds in the
//! new submission, and renormalizes, so repeated cycles can accumulate small
//! rounding drift. The rounding functions here (nearest integer for counts,
//! 10 decimals for weights) must not change, or records already on disk would
//! stop being bit-compatible.

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder mode label for a profile no one has rated yet.
pub const EMPTY_LEVEL: &str = "0";

/// One qualitative rating dimension of a blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRating {
    /// Label of the currently most common level, or [`EMPTY_LEVEL`].
    pub level: String,
    /// Human-readable description of the scale. Never consumed here.
    pub scale: String,
    /// Level label -> normalized weight in [0, 100]. Insertion order is the
    /// profile's fixed scale order and must survive serialization.
    pub distribution: IndexMap<String, f64>,
}

impl ProfileRating {
    pub fn new(scale: &str, levels: &[&str]) -> Self {
        Self {
            level: EMPTY_LEVEL.to_string(),
            scale: scale.to_string(),
            distribution: levels.iter().map(|l| (l.to_string(), 0.0)).collect(),
        }
    }
}

/// The four fixed profiles every blend record carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendRatings {
    pub strength: ProfileRating,
    pub flavoring: ProfileRating,
    #[serde(rename = "roomNote")]
    pub room_note: ProfileRating,
    pub taste: ProfileRating,
}

impl BlendRatings {
    /// Fresh zeroed profiles with the wiki's standard scales.
    pub fn template() -> Self {
        Self {
            strength: ProfileRating::new(
                "Extremely Mild -> Overwhelming",
                &[
                    "Extremely Mild",
                    "Very Mild",
                    "Mild",
                    "Mild to Medium",
                    "Medium",
                    "Medium to Strong",
                    "Strong",
                    "Very Strong",
                    "Extremely Strong",
                    "Overwhelming",
                ],
            ),
            flavoring: ProfileRating::new(
                "None Detected -> Extra Strong",
                &[
                    "None Detected",
                    "Extremely Mild",
                    "Very Mild",
                    "Mild",
                    "Mild to Medium",
                    "Medium",
                    "Medium to Strong",
                    "Strong",
                    "Very Strong",
                    "Extra Strong",
                ],
            ),
            room_note: ProfileRating::new(
                "Unnoticeable -> Overwhelming",
                &[
                    "Unnoticeable",
                    "Pleasant",
                    "Very Pleasant",
                    "Pleasant to Tolerable",
                    "Tolerable",
                    "Tolerable to Strong",
                    "Strong",
                    "Very Strong",
                    "Extra Strong",
                    "Overwhelming",
                ],
            ),
            taste: ProfileRating::new(
                "Extremely Mild (Flat) -> Overwhelming",
                &[
                    "Extremely Mild (Flat)",
                    "Very Mild",
                    "Mild",
                    "Mild to Medium",
                    "Medium",
                    "Medium to Full",
                    "Full",
                    "Very Full",
                    "Extra Full",
                    "Overwhelming",
                ],
            ),
        }
    }

    /// `(name, profile)` pairs in the record's fixed order.
    pub fn iter_mut(&mut self) -> [(&'static str, &mut ProfileRating); 4] {
        [
            ("strength", &mut self.strength),
            ("flavoring", &mut self.flavoring),
            ("roomNote", &mut self.room_note),
            ("taste", &mut self.taste),
        ]
    }
}

/// One blend's record: descriptive metadata (kept opaque, round-tripped as-is)
/// plus the rating statistics this module maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendRating {
    /// Everything the wiki stores about the blend that ratings don't touch
    /// (name, blender, description, imagePath, ...).
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
    /// Curated review count maintained by hand, distinct from
    /// `total_reviews`. Field declaration order here matches the on-disk
    /// key order, so records rewrite without churn.
    #[serde(
        rename = "reviewCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub review_count: Option<u64>,
    #[serde(rename = "totalReviews")]
    pub total_reviews: u64,
    #[serde(rename = "averageRating")]
    pub average_rating: f64,
    #[serde(rename = "maxRating", default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<u64>,
    /// Star-bucket label -> count. Labels come from the record template and
    /// are never removed once present.
    #[serde(rename = "ratingDistribution")]
    pub rating_distribution: IndexMap<String, u64>,
    pub ratings: BlendRatings,
}

impl BlendRating {
    /// A fresh record with every distribution zeroed. Metadata is left for
    /// the caller to fill in.
    pub fn template() -> Self {
        let buckets = [
            "4_star",
            "3half_star",
            "3_star",
            "2half_star",
            "2_star",
            "1half_star",
            "1_star",
            "half_star",
        ];
        Self {
            details: serde_json::Map::new(),
            review_count: Some(0),
            total_reviews: 0,
            average_rating: 0.0,
            max_rating: Some(0),
            rating_distribution: buckets.iter().map(|b| (b.to_string(), 0)).collect(),
            ratings: BlendRatings::template(),
        }
    }
}

/// One user rating event, already decoded from the transport format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSubmission {
    /// Overall star rating, e.g. 3.5.
    pub rating: f64,
    /// Profile name -> chosen level label.
    pub profiles: IndexMap<String, String>,
}

/// Folds exactly one submission into `record`, mutating it in place.
///
/// Every call is one real rating event; calling twice records two ratings.
/// The submission must name a level for each of the four profiles, and the
/// level must be on that profile's scale.
///
/// # Errors
///
/// Fails on a star value with no matching bucket in the record, a missing
/// profile key in the submission, or a level label not on the profile's
/// scale. The record may be partially updated when an error is returned.
pub fn apply(record: &mut BlendRating, submission: &RatingSubmission) -> Result<()> {
    record.total_reviews += 1;

    let bucket = star_bucket(submission.rating);
    let count = record.rating_distribution.get_mut(&bucket).ok_or_else(|| {
        anyhow!(
            "no '{bucket}' bucket in the record for star rating {}",
            submission.rating
        )
    })?;
    *count += 1;

    record.average_rating = average_rating(&record.rating_distribution, record.total_reviews)?;

    for (name, profile) in record.ratings.iter_mut() {
        let level = submission
            .profiles
            .get(name)
            .ok_or_else(|| anyhow!("submission has no level for the '{name}' profile"))?;
        fold_level(name, profile, level)?;
    }

    Ok(())
}

/// Classifies a star value into its histogram bucket label.
///
/// Whole values map to `{n}_star`, values below one star to `half_star`,
/// and everything else to `{n}half_star` (2.5 -> `2half_star`).
pub fn star_bucket(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}_star", rating as i64)
    } else if rating < 1.0 {
        "half_star".to_string()
    } else {
        format!("{}half_star", rating as i64)
    }
}

/// Recovers the star value a bucket label stands for: the `half_star` suffix
/// becomes `.5`, a plain `_star` suffix is stripped.
pub fn star_value(bucket: &str) -> Result<f64> {
    let text = if let Some(prefix) = bucket.strip_suffix("half_star") {
        format!("{prefix}.5")
    } else if let Some(prefix) = bucket.strip_suffix("_star") {
        prefix.to_string()
    } else {
        bail!("'{bucket}' is not a star bucket label");
    };

    text.parse::<f64>()
        .with_context(|| format!("'{bucket}' is not a star bucket label"))
}

fn average_rating(distribution: &IndexMap<String, u64>, total_reviews: u64) -> Result<f64> {
    let mut sum = 0.0;
    for (bucket, count) in distribution {
        sum += star_value(bucket)? * *count as f64;
    }
    Ok(round_to(sum / total_reviews as f64, 2))
}

/// Denormalize -> increment -> renormalize cycle for one profile.
fn fold_level(name: &str, profile: &mut ProfileRating, level: &str) -> Result<()> {
    let index = profile.distribution.get_index_of(level).ok_or_else(|| {
        anyhow!("level '{level}' is not on the '{name}' scale ({})", profile.scale)
    })?;

    let max_weight = profile
        .distribution
        .values()
        .copied()
        .fold(0.0_f64, f64::max);

    // Approximate counts relative to the current mode. An all-zero
    // distribution (no ratings yet) reconstructs to all-zero counts.
    let mut counts: Vec<u64> = profile
        .distribution
        .values()
        .map(|w| (w * max_weight / 100.0).round() as u64)
        .collect();
    counts[index] += 1;

    // At least one count is now >= 1, so new_max never stays at the fallback.
    let new_max = counts.iter().copied().max().unwrap_or(1);
    for (count, weight) in counts.iter().zip(profile.distribution.values_mut()) {
        *weight = round_to(*count as f64 / new_max as f64 * 100.0, 10);
    }

    // Mode = max by (count, label); equal counts go to the greater label.
    // Records on disk already reflect this rule, so it stays as-is.
    let mut best: Option<(u64, &str)> = None;
    for (label, count) in profile.distribution.keys().zip(counts.iter().copied()) {
        let candidate = (count, label.as_str());
        if best.is_none_or(|b| candidate > b) {
            best = Some(candidate);
        }
    }
    if let Some((_, label)) = best {
        profile.level = label.to_string();
    }

    Ok(())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
