//! CLI entry point for the blend wiki toolkit.
//!
//! Provides subcommands for folding rating submissions into blend records,
//! syncing a day's batch from the submission worker's KV store, regenerating
//! the site index, auditing records for missing fields, and creating new
//! blend records.

mod infra;
mod services;

use crate::infra::kv::KvRatingsClient;
use crate::services::ratings_api::{StoredSubmission, SubmissionSource};
use anyhow::{Context, Result};
use blend_rater::{
    audit::run_audit,
    fetch::{BasicClient, fetch_bytes},
    indexer::build_index,
    rating::{self, BlendRating, RatingSubmission},
    store::{BlendRecordFile, BlendStore, blend_key, image_path},
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::ffi::OsStr;
use std::path::Path;
use tracing::Instrument;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "blend_rater")]
#[command(about = "Maintains the blend wiki's rating records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold a batch of submissions from a file or URL into one blend record
    Apply {
        /// Record file name inside the blend directory
        #[arg(value_name = "RECORD_FILE")]
        record: String,

        /// Path or URL of a JSON array of submissions
        #[arg(value_name = "FILE_OR_URL")]
        submissions: String,

        /// Directory holding the blend records
        #[arg(short, long, default_value = "blend_data")]
        blend_dir: String,
    },
    /// Fetch one day's submissions from the ratings KV store and fold them in
    Sync {
        /// Day to sync, YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Directory holding the blend records
        #[arg(short, long, default_value = "blend_data")]
        blend_dir: String,

        /// Maximum number of blends updated concurrently
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        /// Apply and report, but write nothing back
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Regenerate the site index, metadata, and manifest files
    Index {
        /// Directory holding the blend records
        #[arg(short, long, default_value = "blend_data")]
        blend_dir: String,

        /// Directory the site data files are written to
        #[arg(short, long, default_value = "assets/data")]
        output_dir: String,
    },
    /// Report blends with missing metadata fields
    Audit {
        /// Directory holding the blend records
        #[arg(short, long, default_value = "blend_data")]
        blend_dir: String,

        /// CSV report path
        #[arg(short, long, default_value = "site_tools_output/missing_data.csv")]
        output: String,

        /// Only report blends missing this specific field
        #[arg(long)]
        field: Option<String>,
    },
    /// Create a fresh blend record with zeroed rating statistics
    NewBlend {
        #[arg(long)]
        name: String,

        #[arg(long)]
        brand: String,

        /// Defaults to the brand
        #[arg(long)]
        blended_by: Option<String>,

        /// Defaults to the brand
        #[arg(long)]
        manufactured_by: Option<String>,

        #[arg(long, default_value = "Currently Available")]
        production: String,

        #[arg(long, default_value = "")]
        country: String,

        #[arg(long, default_value = "")]
        blend_type: String,

        #[arg(long, default_value = "")]
        contents: String,

        #[arg(long, default_value = "")]
        cut: String,

        #[arg(long, default_value = "")]
        packaging: String,

        #[arg(long, default_value = "")]
        flavoring: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        notes: String,

        /// Directory holding the blend records
        #[arg(short = 'd', long, default_value = "blend_data")]
        blend_dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/blend_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("blend_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            record,
            submissions,
            blend_dir,
        } => {
            let bytes = fetcher(&submissions).await?;
            let batch: Vec<RatingSubmission> = serde_json::from_slice(&bytes)
                .context("submissions input is not a JSON array of ratings")?;

            let store = BlendStore::new(&blend_dir);
            let mut record_file = store.load(&record)?;
            for submission in &batch {
                rating::apply(&mut record_file.record, submission)?;
            }
            store.save(&record, &record_file)?;

            info!(
                record,
                applied = batch.len(),
                total_reviews = record_file.record.total_reviews,
                average = record_file.record.average_rating,
                "Record updated"
            );
        }
        Commands::Sync {
            date,
            blend_dir,
            concurrency,
            dry_run,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            sync_ratings(&blend_dir, date, concurrency, dry_run).await?;
        }
        Commands::Index {
            blend_dir,
            output_dir,
        } => {
            let store = BlendStore::new(&blend_dir);
            build_index(&store, Path::new(&output_dir))?;
        }
        Commands::Audit {
            blend_dir,
            output,
            field,
        } => {
            let store = BlendStore::new(&blend_dir);
            run_audit(&store, Path::new(&output), field.as_deref())?;
        }
        Commands::NewBlend {
            name,
            brand,
            blended_by,
            manufactured_by,
            production,
            country,
            blend_type,
            contents,
            cut,
            packaging,
            flavoring,
            description,
            notes,
            blend_dir,
        } => {
            let store = BlendStore::new(&blend_dir);
            let file_name = format!("{brand} - {name}.json");

            let mut record = BlendRating::template();
            let fields = [
                ("imagePath", image_path(&brand, &name)),
                ("name", name.clone()),
                ("blender", brand.clone()),
                ("blendedBy", blended_by.unwrap_or_else(|| brand.clone())),
                (
                    "manufacturedBy",
                    manufactured_by.unwrap_or_else(|| brand.clone()),
                ),
                ("production", production),
                ("country", country),
                ("blendType", blend_type),
                ("contents", contents),
                ("cut", cut),
                ("packaging", packaging),
                ("flavoring", flavoring),
                ("description", description),
                ("notes", notes),
            ];
            for (key, value) in fields {
                record
                    .details
                    .insert(key.to_string(), serde_json::Value::String(value));
            }

            let record_file = BlendRecordFile {
                blend_key: blend_key(&name),
                record,
            };
            store.create(&file_name, &record_file)?;

            info!(file = %file_name, blend_key = %record_file.blend_key, "Blend record created");
        }
    }

    Ok(())
}

/// Loads submission data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %source))]
async fn fetcher(source: &String) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, source).await?
    } else {
        std::fs::read(source)?
    };
    Ok(bytes)
}

/// Fetches one day's batch from KV, groups it by blend, and folds each
/// blend's submissions into its record sequentially. Blends are independent,
/// so they update concurrently under the semaphore; submissions for one
/// record never run concurrently with each other.
#[tracing::instrument(skip(blend_dir), fields(blend_dir, date = %date, concurrency, dry_run))]
async fn sync_ratings(
    blend_dir: &str,
    date: NaiveDate,
    concurrency: usize,
    dry_run: bool,
) -> Result<()> {
    let account_id = std::env::var("CF_ACCOUNT_ID").context("CF_ACCOUNT_ID must be set")?;
    let namespace_id =
        std::env::var("CF_KV_NAMESPACE_ID").context("CF_KV_NAMESPACE_ID must be set")?;
    let api_token = std::env::var("CF_API_TOKEN").context("CF_API_TOKEN must be set")?;

    let client = KvRatingsClient::new(account_id, namespace_id, &api_token);

    let mut batch = client.fetch_batch(date).await?;
    info!(count = batch.len(), "Submission batch fetched");
    if batch.is_empty() {
        return Ok(());
    }

    // Records are folded one event at a time, in submission order.
    batch.sort_by_key(|s| s.timestamp);

    let mut by_blend: IndexMap<String, Vec<StoredSubmission>> = IndexMap::new();
    for submission in batch {
        by_blend
            .entry(submission.blend_key.clone())
            .or_default()
            .push(submission);
    }

    let store = BlendStore::new(blend_dir);
    let key_index = store.blend_key_index()?;

    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(concurrency));
    let mut tasks = vec![];

    for (key, submissions) in by_blend {
        let Some(file_name) = key_index.get(&key).cloned() else {
            warn!(blend_key = %key, dropped = submissions.len(), "No record for blend key");
            continue;
        };

        let sem = semaphore.clone();
        let store = store.clone();

        let blend_span = tracing::info_span!(
            "sync_blend",
            blend_key = %key,
            file = %file_name,
        );

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire().await.unwrap();

                if let Err(e) = fold_blend_batch(&store, &file_name, &submissions, dry_run) {
                    error!(error = %e, "Blend sync failed, record left untouched");
                }
            }
            .instrument(blend_span),
        );

        tasks.push(task);
    }

    for task in tasks {
        let _ = task.await;
    }

    info!("Sync complete");
    Ok(())
}

/// Applies one blend's submissions to its record, strictly in order, and
/// saves once at the end. Any aggregation error abandons the whole blend;
/// the on-disk record is never overwritten with a half-applied batch.
fn fold_blend_batch(
    store: &BlendStore,
    file_name: &str,
    submissions: &[StoredSubmission],
    dry_run: bool,
) -> Result<()> {
    let mut record_file = store.load(file_name)?;
    let mut applied = 0usize;
    let mut skipped = 0usize;

    for stored in submissions {
        let Some(submission) = stored.to_submission() else {
            warn!(timestamp = %stored.timestamp, "Skipping submission with no star rating");
            skipped += 1;
            continue;
        };
        rating::apply(&mut record_file.record, &submission)?;
        applied += 1;
    }

    if applied > 0 && !dry_run {
        store.save(file_name, &record_file)?;
    }

    info!(
        applied,
        skipped,
        total_reviews = record_file.record.total_reviews,
        average = record_file.record.average_rating,
        dry_run,
        "Blend synced"
    );
    Ok(())
}
