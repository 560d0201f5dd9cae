//! In-memory store over `std::sync::RwLock` collections.
//!
//! Every mutation takes a single write lock, so each per-thread write and
//! each run update is atomic with respect to concurrent readers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use sortbox_types::{Bucket, ClassificationRun, EmailThread, NewRun, RunStatus, RunUpdate};

use super::{BucketStore, RunStore, StoreError, StoreResult, ThreadStore};

/// Process-local store for buckets, threads and runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: RwLock<Vec<Bucket>>,
    threads: RwLock<HashMap<String, EmailThread>>,
    /// Insertion order doubles as recency.
    runs: RwLock<Vec<ClassificationRun>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Backend("store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Backend("store lock poisoned".into()))
}

#[async_trait]
impl BucketStore for InMemoryStore {
    async fn list_buckets(&self, user_id: &str) -> StoreResult<Vec<Bucket>> {
        let mut buckets: Vec<Bucket> = read(&self.buckets)?
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        buckets.sort_by_key(|b| b.sort_order);
        Ok(buckets)
    }

    async fn create_bucket(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        is_default: bool,
    ) -> StoreResult<Bucket> {
        let mut buckets = write(&self.buckets)?;
        let owned = buckets.iter().filter(|b| b.user_id == user_id);
        let mut next_order = 0;
        for existing in owned {
            if existing.name == name {
                return Err(StoreError::Conflict(format!(
                    "bucket '{name}' already exists"
                )));
            }
            next_order = next_order.max(existing.sort_order + 1);
        }

        let bucket = Bucket {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            description: description.into(),
            sort_order: next_order,
            is_default,
        };
        buckets.push(bucket.clone());
        Ok(bucket)
    }

    async fn count_buckets(&self, user_id: &str) -> StoreResult<usize> {
        Ok(read(&self.buckets)?
            .iter()
            .filter(|b| b.user_id == user_id)
            .count())
    }

    async fn update_bucket(
        &self,
        user_id: &str,
        bucket_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Bucket> {
        let name = name.filter(|n| !n.is_empty());
        let description = description.filter(|d| !d.is_empty());

        let mut buckets = write(&self.buckets)?;
        if let Some(name) = name {
            let taken = buckets
                .iter()
                .any(|b| b.user_id == user_id && b.id != bucket_id && b.name == name);
            if taken {
                return Err(StoreError::Conflict(format!(
                    "bucket '{name}' already exists"
                )));
            }
        }

        let bucket = buckets
            .iter_mut()
            .find(|b| b.id == bucket_id && b.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("bucket", bucket_id))?;
        if let Some(name) = name {
            bucket.name = name.into();
        }
        if let Some(description) = description {
            bucket.description = description.into();
        }
        Ok(bucket.clone())
    }

    async fn delete_bucket(&self, user_id: &str, bucket_id: &str) -> StoreResult<()> {
        // Buckets before threads, the same order classification writes use.
        let mut buckets = write(&self.buckets)?;
        let index = buckets
            .iter()
            .position(|b| b.id == bucket_id && b.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("bucket", bucket_id))?;
        buckets.remove(index);

        let mut threads = write(&self.threads)?;
        let mut released = 0;
        for thread in threads
            .values_mut()
            .filter(|t| t.bucket_id.as_deref() == Some(bucket_id))
        {
            thread.bucket_id = None;
            thread.confidence = None;
            thread.classified_at = None;
            thread.user_override = false;
            released += 1;
        }
        debug!(user_id, bucket_id, released, "bucket deleted");
        Ok(())
    }
}

#[async_trait]
impl ThreadStore for InMemoryStore {
    async fn list_threads(&self, user_id: &str) -> StoreResult<Vec<EmailThread>> {
        let mut threads: Vec<EmailThread> = read(&self.threads)?
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(threads)
    }

    async fn update_thread_classification(
        &self,
        thread_id: &str,
        bucket_id: &str,
        confidence: f64,
        classified_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let buckets = read(&self.buckets)?;
        if !buckets.iter().any(|b| b.id == bucket_id) {
            debug!(thread_id, bucket_id, "bucket deleted before classification was applied");
            return Ok(false);
        }
        let mut threads = write(&self.threads)?;
        let Some(thread) = threads.get_mut(thread_id) else {
            debug!(thread_id, "thread vanished before classification was applied");
            return Ok(false);
        };
        if thread.user_override {
            debug!(thread_id, "thread overridden by user, keeping manual bucket");
            return Ok(false);
        }
        thread.bucket_id = Some(bucket_id.into());
        thread.confidence = Some(confidence);
        thread.classified_at = Some(classified_at);
        Ok(true)
    }

    async fn upsert_threads(&self, user_id: &str, threads: Vec<EmailThread>) -> StoreResult<usize> {
        let mut stored = write(&self.threads)?;
        let mut written = 0;
        for mut incoming in threads {
            match stored.get_mut(&incoming.id) {
                Some(existing) if existing.user_id != user_id => {
                    return Err(StoreError::Conflict(format!(
                        "thread {} belongs to another user",
                        incoming.id
                    )));
                }
                Some(existing) => {
                    existing.sender = incoming.sender;
                    existing.subject = incoming.subject;
                    existing.snippet = incoming.snippet;
                    existing.date = incoming.date;
                }
                None => {
                    incoming.user_id = user_id.into();
                    stored.insert(incoming.id.clone(), incoming);
                }
            }
            written += 1;
        }
        Ok(written)
    }

    async fn override_thread_bucket(
        &self,
        user_id: &str,
        thread_id: &str,
        bucket_id: &str,
    ) -> StoreResult<()> {
        let bucket_owned = read(&self.buckets)?
            .iter()
            .any(|b| b.id == bucket_id && b.user_id == user_id);
        if !bucket_owned {
            return Err(StoreError::not_found("bucket", bucket_id));
        }

        let mut threads = write(&self.threads)?;
        let thread = threads
            .get_mut(thread_id)
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("thread", thread_id))?;
        thread.bucket_id = Some(bucket_id.into());
        thread.user_override = true;
        Ok(())
    }
}

#[async_trait]
impl RunStore for InMemoryStore {
    async fn create_run(&self, run: NewRun) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let record = ClassificationRun {
            id: id.clone(),
            user_id: run.user_id,
            status: RunStatus::Running,
            total_threads: run.total_threads,
            classified_count: 0,
            bucket_snapshot: run.bucket_snapshot,
            model: run.model,
            input_tokens: 0,
            output_tokens: 0,
            cost_cents: 0.0,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        write(&self.runs)?.push(record);
        Ok(id)
    }

    async fn update_run(&self, run_id: &str, update: RunUpdate) -> StoreResult<()> {
        let mut runs = write(&self.runs)?;
        let run = runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| StoreError::not_found("run", run_id))?;
        if run.status.is_terminal() {
            return Err(StoreError::RunFinalized(run_id.into()));
        }
        update.apply_to(run);
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> StoreResult<Option<ClassificationRun>> {
        Ok(read(&self.runs)?.iter().find(|r| r.id == run_id).cloned())
    }

    async fn list_runs(&self, user_id: &str, limit: usize) -> StoreResult<Vec<ClassificationRun>> {
        Ok(read(&self.runs)?
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sortbox_types::BucketDefinition;

    fn thread(id: &str, day: u32) -> EmailThread {
        EmailThread {
            id: id.into(),
            user_id: String::new(),
            sender: "Bob <bob@example.com>".into(),
            subject: format!("Subject {id}"),
            snippet: "snippet".into(),
            date: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            bucket_id: None,
            confidence: None,
            classified_at: None,
            user_override: false,
        }
    }

    fn new_run(user: &str) -> NewRun {
        NewRun {
            user_id: user.into(),
            total_threads: 3,
            bucket_snapshot: vec![BucketDefinition::new("FYI", "info")],
            model: "gpt-4o-mini".into(),
        }
    }

    #[tokio::test]
    async fn buckets_are_ordered_and_unique_per_user() {
        let store = InMemoryStore::new();
        store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        store.create_bucket("u-1", "Later", "later", false).await.unwrap();
        store.create_bucket("u-2", "FYI", "info", true).await.unwrap();

        let err = store.create_bucket("u-1", "FYI", "again", false).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let buckets = store.list_buckets("u-1").await.unwrap();
        let names: Vec<_> = buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["FYI", "Later"]);
        assert_eq!(buckets[1].sort_order, 1);
        assert_eq!(store.count_buckets("u-2").await.unwrap(), 1);
        assert_eq!(store.count_buckets("u-3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn threads_listed_newest_first_for_owner_only() {
        let store = InMemoryStore::new();
        store
            .upsert_threads("u-1", vec![thread("a", 1), thread("b", 3), thread("c", 2)])
            .await
            .unwrap();
        store.upsert_threads("u-2", vec![thread("z", 9)]).await.unwrap();

        let ids: Vec<_> = store
            .list_threads("u-1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn resync_keeps_classification_state() {
        let store = InMemoryStore::new();
        let bucket = store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        store.upsert_threads("u-1", vec![thread("a", 1)]).await.unwrap();
        assert!(
            store
                .update_thread_classification("a", &bucket.id, 0.9, Utc::now())
                .await
                .unwrap()
        );

        let mut refreshed = thread("a", 2);
        refreshed.subject = "Re: Subject a".into();
        store.upsert_threads("u-1", vec![refreshed]).await.unwrap();

        let stored = &store.list_threads("u-1").await.unwrap()[0];
        assert_eq!(stored.subject, "Re: Subject a");
        assert_eq!(stored.bucket_id.as_deref(), Some(bucket.id.as_str()));
        assert_eq!(stored.confidence, Some(0.9));

        let err = store.upsert_threads("u-2", vec![thread("a", 3)]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn override_blocks_later_classification() {
        let store = InMemoryStore::new();
        let bucket = store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        let other = store.create_bucket("u-1", "Later", "later", false).await.unwrap();
        store.upsert_threads("u-1", vec![thread("a", 1)]).await.unwrap();

        store.override_thread_bucket("u-1", "a", &bucket.id).await.unwrap();
        let applied = store
            .update_thread_classification("a", &other.id, 0.5, Utc::now())
            .await
            .unwrap();
        assert!(!applied);

        let stored = &store.list_threads("u-1").await.unwrap()[0];
        assert!(stored.user_override);
        assert_eq!(stored.bucket_id.as_deref(), Some(bucket.id.as_str()));
    }

    #[tokio::test]
    async fn override_requires_ownership() {
        let store = InMemoryStore::new();
        let bucket = store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        store.upsert_threads("u-2", vec![thread("a", 1)]).await.unwrap();

        let err = store
            .override_thread_bucket("u-1", "a", &bucket.id)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::not_found("thread", "a"));

        let err = store
            .override_thread_bucket("u-2", "a", &bucket.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "bucket", .. }));
    }

    #[tokio::test]
    async fn rename_and_redescribe_bucket() {
        let store = InMemoryStore::new();
        let fyi = store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        store.create_bucket("u-1", "Later", "later", false).await.unwrap();

        let renamed = store
            .update_bucket("u-1", &fyi.id, Some("Reference"), None)
            .await
            .unwrap();
        assert_eq!(renamed.name, "Reference");
        assert_eq!(renamed.description, "info");
        assert_eq!(renamed.sort_order, fyi.sort_order);

        let described = store
            .update_bucket("u-1", &fyi.id, Some(""), Some("Keep for later lookup"))
            .await
            .unwrap();
        assert_eq!(described.name, "Reference");
        assert_eq!(described.description, "Keep for later lookup");

        // Renaming onto itself is not a clash.
        store
            .update_bucket("u-1", &fyi.id, Some("Reference"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rename_keeps_names_unique_and_scoped() {
        let store = InMemoryStore::new();
        let fyi = store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        store.create_bucket("u-1", "Later", "later", false).await.unwrap();
        store.create_bucket("u-2", "Work", "work", false).await.unwrap();

        let err = store
            .update_bucket("u-1", &fyi.id, Some("Later"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Another user's bucket names do not collide.
        store
            .update_bucket("u-1", &fyi.id, Some("Work"), None)
            .await
            .unwrap();

        let err = store
            .update_bucket("u-2", &fyi.id, Some("Mine"), None)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::not_found("bucket", fyi.id.clone()));
        assert_eq!(store.list_buckets("u-1").await.unwrap()[0].name, "Work");
    }

    #[tokio::test]
    async fn delete_bucket_releases_its_threads() {
        let store = InMemoryStore::new();
        let fyi = store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        let later = store.create_bucket("u-1", "Later", "later", false).await.unwrap();
        store
            .upsert_threads("u-1", vec![thread("a", 1), thread("b", 2), thread("c", 3)])
            .await
            .unwrap();
        store
            .update_thread_classification("a", &fyi.id, 0.9, Utc::now())
            .await
            .unwrap();
        store.override_thread_bucket("u-1", "b", &fyi.id).await.unwrap();
        store
            .update_thread_classification("c", &later.id, 0.7, Utc::now())
            .await
            .unwrap();

        let err = store.delete_bucket("u-2", &fyi.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "bucket", .. }));

        store.delete_bucket("u-1", &fyi.id).await.unwrap();
        assert_eq!(store.count_buckets("u-1").await.unwrap(), 1);

        let threads = store.list_threads("u-1").await.unwrap();
        let by_id = |id: &str| threads.iter().find(|t| t.id == id).unwrap().clone();
        for id in ["a", "b"] {
            let t = by_id(id);
            assert!(t.bucket_id.is_none());
            assert!(t.confidence.is_none());
            assert!(!t.user_override);
        }
        assert_eq!(by_id("c").bucket_id.as_deref(), Some(later.id.as_str()));

        // Verdicts pointing at the deleted bucket are not written.
        let applied = store
            .update_thread_classification("a", &fyi.id, 0.9, Utc::now())
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn missing_thread_is_not_applied() {
        let store = InMemoryStore::new();
        let bucket = store.create_bucket("u-1", "FYI", "info", true).await.unwrap();
        let applied = store
            .update_thread_classification("ghost", &bucket.id, 1.0, Utc::now())
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn terminal_runs_are_immutable() {
        let store = InMemoryStore::new();
        let id = store.create_run(new_run("u-1")).await.unwrap();

        let run = store.get_run(&id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.completed_at.is_none());

        store
            .update_run(&id, RunUpdate::completed(3, 100, 20, 0.03, None))
            .await
            .unwrap();
        let err = store
            .update_run(&id, RunUpdate::failed("late failure"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::RunFinalized(id.clone()));

        let run = store.get_run(&id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.classified_count, 3);
        assert!(run.completed_at.is_some());
        assert!(run.error_message.is_none());
    }

    #[tokio::test]
    async fn update_unknown_run_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update_run("nope", RunUpdate::failed("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "run", .. }));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let store = InMemoryStore::new();
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(store.create_run(new_run("u-1")).await.unwrap());
        }
        store.create_run(new_run("u-2")).await.unwrap();

        let history = store.list_runs("u-1", 3).await.unwrap();
        let got: Vec<_> = history.iter().map(|r| r.id.clone()).collect();
        assert_eq!(got, vec![ids[3].clone(), ids[2].clone(), ids[1].clone()]);
    }
}
