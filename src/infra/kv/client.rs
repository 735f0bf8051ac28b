//! Reads daily rating batches out of the Cloudflare KV namespace the
//! submission worker writes to.
//!
//! The worker appends each rating to a per-day key named
//! `ratings_{YYYY-MM-DD}`. This client pulls one day's blob through the
//! Cloudflare REST API, authenticating every request with a bearer token.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use reqwest::{Method, Request, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::services::ratings_api::{StoredSubmission, SubmissionSource};
use blend_rater::fetch::{BasicClient, BearerAuth, HttpClient};

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

pub struct KvRatingsClient<C = BasicClient> {
    http: BearerAuth<C>,
    base_url: String,
    account_id: String,
    namespace_id: String,
}

impl KvRatingsClient<BasicClient> {
    pub fn new(account_id: String, namespace_id: String, api_token: &str) -> Self {
        Self::with_client(BasicClient::new(), account_id, namespace_id, api_token)
    }
}

impl<C: HttpClient> KvRatingsClient<C> {
    pub fn with_client(
        client: C,
        account_id: String,
        namespace_id: String,
        api_token: &str,
    ) -> Self {
        Self {
            http: BearerAuth::new(client, api_token),
            base_url: API_BASE.to_string(),
            account_id,
            namespace_id,
        }
    }

    fn value_url(&self, key: &str) -> String {
        format!(
            "{}/accounts/{}/storage/kv/namespaces/{}/values/{}",
            self.base_url, self.account_id, self.namespace_id, key
        )
    }
}

#[async_trait::async_trait]
impl<C: HttpClient> SubmissionSource for KvRatingsClient<C> {
    async fn fetch_batch(&self, date: NaiveDate) -> Result<Vec<StoredSubmission>> {
        let key = format!("ratings_{}", date.format("%Y-%m-%d"));

        let mut req = Request::new(Method::GET, self.value_url(&key).parse()?);
        *req.timeout_mut() = Some(Duration::from_secs(30));

        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| anyhow!("Failed to fetch KV key '{}': {}", key, e))?;

        // A day with no submissions has no key at all.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "KV read for '{}' failed with status {}: {}",
                key,
                status,
                body
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read KV value for '{}': {}", key, e))?;

        parse_batch(&body).map_err(|e| anyhow!("KV value for '{}' is malformed: {}", key, e))
    }
}

/// Decodes a stored batch. Older worker deployments double-encoded the array
/// (a JSON string containing JSON), so fall back to unwrapping one layer.
fn parse_batch(body: &str) -> Result<Vec<StoredSubmission>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBatch {
        Batch(Vec<StoredSubmission>),
        Encoded(String),
    }

    match serde_json::from_str::<RawBatch>(body)? {
        RawBatch::Batch(batch) => Ok(batch),
        RawBatch::Encoded(inner) => Ok(serde_json::from_str(&inner)?),
    }
}
