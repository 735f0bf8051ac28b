//! Trait and types for fetching stored rating submissions.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Deserialize;

use blend_rater::rating::RatingSubmission;

/// One rating as the submission worker stored it, raw and unvalidated.
///
/// The worker records whatever the front end posted, so the star rating can
/// be null and the profile map can be empty. Abuse-prevention fields
/// (`ipHash`, `ipBlendKey`, `userEmail`) are ignored on decode.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubmission {
    #[serde(default)]
    pub id: Option<String>,
    pub blend_key: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub star_rating: Option<f64>,
    #[serde(default)]
    pub profiles: IndexMap<String, String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl StoredSubmission {
    /// Converts to the aggregator's input shape. `None` when the entry has
    /// no usable star rating; the sync driver logs and skips those.
    pub fn to_submission(&self) -> Option<RatingSubmission> {
        self.star_rating.map(|rating| RatingSubmission {
            rating,
            profiles: self.profiles.clone(),
        })
    }
}

/// Abstraction over wherever a day's submissions are kept.
#[async_trait::async_trait]
pub trait SubmissionSource {
    /// Returns every submission recorded on `date`. A day nobody rated
    /// anything is an empty batch, not an error.
    async fn fetch_batch(&self, date: NaiveDate) -> Result<Vec<StoredSubmission>>;
}
