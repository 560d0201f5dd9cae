//! # sortbox-types
//!
//! Core type definitions for the sortbox email triage engine.
//!
//! This crate is the foundation of the dependency graph -- all other
//! sortbox crates depend on it. It contains:
//!
//! - **[`error`]** -- [`SortboxError`], the top-level error type
//! - **[`config`]** -- Configuration schema (classifier, pipeline, pricing)
//! - **[`model`]** -- Buckets, threads, classification outcomes and run records
//! - **[`progress`]** -- Step events streamed while a classification run executes

pub mod config;
pub mod error;
pub mod model;
pub mod progress;

pub use error::{Result, SortboxError};
pub use model::{
    Bucket, BucketDefinition, ClassificationCandidate, ClassificationMode, ClassificationOutcome,
    ClassificationRun, EmailThread, NewRun, RunStatus, RunUpdate,
};
pub use progress::ProgressEvent;
