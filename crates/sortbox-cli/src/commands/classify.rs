//! `sortbox classify` -- classify the threads of a mailbox file.
//!
//! Loads a mailbox (`{ "buckets"?: [...], "threads": [...] }`) into an
//! in-memory store, seeds the default buckets when the file names none, and
//! runs the classification pipeline against the configured provider. Step
//! events stream to stdout as NDJSON.
//!
//! # Example
//!
//! ```text
//! sortbox classify --mailbox inbox.json
//! sortbox classify --mailbox inbox.json --full --output sorted.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use sortbox_core::buckets::seed_default_buckets;
use sortbox_core::pipeline::{ClassificationPipeline, LlmBatchClassifier, NdjsonSink, PipelineSettings};
use sortbox_core::store::{BucketStore, InMemoryStore, ThreadStore};
use sortbox_llm::{LlmProviderConfig, OpenAiCompatProvider};
use sortbox_types::config::{Config, ProviderSettings};
use sortbox_types::{BucketDefinition, ClassificationMode, EmailThread, SortboxError};

use super::load_config;

/// Arguments for the `sortbox classify` subcommand.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Mailbox JSON file with `threads` and optional `buckets`.
    #[arg(short, long)]
    pub mailbox: PathBuf,

    /// Reclassify every thread that was not sorted by hand.
    #[arg(long)]
    pub full: bool,

    /// User the mailbox belongs to.
    #[arg(short, long, default_value = "local")]
    pub user: String,

    /// Write the classified threads to this file when done.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Mailbox file contents.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    #[serde(default)]
    pub buckets: Vec<BucketDefinition>,
    pub threads: Vec<EmailThread>,
}

/// One thread of the `--output` file, with its bucket resolved to a name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SortedThread {
    id: String,
    subject: String,
    bucket: Option<String>,
    confidence: Option<f64>,
    user_override: bool,
}

/// Run the classify command.
pub async fn run(args: ClassifyArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mailbox = read_mailbox(&args.mailbox)?;

    let store = Arc::new(InMemoryStore::new());
    populate(&store, &args.user, mailbox).await?;

    let classifier = Arc::new(build_classifier(&config));
    let pipeline = ClassificationPipeline::new(
        store.clone(),
        classifier,
        PipelineSettings::from(&config),
    );

    let mode = if args.full {
        ClassificationMode::FullReclassify
    } else {
        ClassificationMode::Incremental
    };
    let sink = NdjsonSink::new(std::io::stdout());
    let summary = pipeline.run(&args.user, mode, Some(&sink)).await?;

    info!(
        classified = summary.classified_count,
        total = summary.total_threads,
        failed_batches = summary.failed_batches,
        "classification finished"
    );

    if let Some(output) = &args.output {
        write_sorted(&store, &args.user, output).await?;
    }
    Ok(())
}

fn read_mailbox(path: &Path) -> anyhow::Result<Mailbox> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read mailbox {}", path.display()))?;
    let mailbox: Mailbox = serde_json::from_str(&contents).map_err(|e| SortboxError::InvalidInput {
        reason: format!("{}: {e}", path.display()),
    })?;
    Ok(mailbox)
}

/// Load buckets and threads into the store for `user_id`.
pub async fn populate(store: &InMemoryStore, user_id: &str, mailbox: Mailbox) -> anyhow::Result<()> {
    if mailbox.buckets.is_empty() {
        seed_default_buckets(store, user_id).await?;
    } else {
        for bucket in &mailbox.buckets {
            store
                .create_bucket(user_id, &bucket.name, &bucket.description, false)
                .await?;
        }
    }
    let count = store.upsert_threads(user_id, mailbox.threads).await?;
    info!(user_id, threads = count, "mailbox loaded");
    Ok(())
}

/// Provider endpoint settings in the shape the LLM crate expects.
pub fn provider_config(settings: &ProviderSettings) -> LlmProviderConfig {
    LlmProviderConfig {
        name: settings.name.clone(),
        base_url: settings.base_url.clone(),
        api_key_env: settings.api_key_env.clone(),
        headers: settings.headers.clone(),
        timeout_secs: settings.timeout_secs,
    }
}

fn build_classifier(config: &Config) -> LlmBatchClassifier<OpenAiCompatProvider> {
    let provider = OpenAiCompatProvider::new(provider_config(&config.classifier.provider));
    LlmBatchClassifier::new(provider, config.classifier.model.clone())
        .with_temperature(config.classifier.temperature)
        .with_max_tokens(config.classifier.max_tokens)
}

async fn write_sorted(store: &InMemoryStore, user_id: &str, path: &Path) -> anyhow::Result<()> {
    let buckets = store.list_buckets(user_id).await?;
    let sorted: Vec<SortedThread> = store
        .list_threads(user_id)
        .await?
        .into_iter()
        .map(|t| SortedThread {
            bucket: t
                .bucket_id
                .as_deref()
                .and_then(|id| buckets.iter().find(|b| b.id == id))
                .map(|b| b.name.clone()),
            id: t.id,
            subject: t.subject,
            confidence: t.confidence,
            user_override: t.user_override,
        })
        .collect();
    let json = serde_json::to_string_pretty(&sorted)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
