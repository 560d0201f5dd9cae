//! Core engine for sortbox.
//!
//! Classifies a user's synced email threads into their buckets by
//! fanning fixed-size batches out to an LLM and writing the verdicts back.
//!
//! # Modules
//!
//! - [`pipeline`] -- batch partitioning, retry, concurrent execution,
//!   prompt formatting, the LLM classifier, costing and the run orchestrator
//! - [`store`] -- bucket, thread and run-record store traits plus an
//!   in-memory implementation
//! - [`buckets`] -- the default bucket set seeded for new users
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sortbox_core::pipeline::{ClassificationPipeline, LlmBatchClassifier, PipelineSettings};
//! use sortbox_core::store::InMemoryStore;
//! use sortbox_types::ClassificationMode;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let classifier = Arc::new(LlmBatchClassifier::new(provider, "gpt-4o-mini"));
//! let pipeline = ClassificationPipeline::new(store, classifier, PipelineSettings::default());
//! let summary = pipeline.run("user-1", ClassificationMode::Incremental, None).await?;
//! ```

pub mod buckets;
pub mod pipeline;
pub mod store;
