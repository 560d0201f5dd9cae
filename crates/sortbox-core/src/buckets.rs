//! The bucket set every new user starts with.

use tracing::info;

use sortbox_types::{Bucket, BucketDefinition};

use crate::store::{BucketStore, StoreResult};

/// Default buckets as `(name, description)`, in sort order.
pub const DEFAULT_BUCKETS: [(&str, &str); 5] = [
    (
        "Needs Action",
        "Emails requiring a response, decision, or action from the user within 24-48 hours. \
         Includes direct asks, approvals, scheduling requests, and time-sensitive items.",
    ),
    (
        "FYI",
        "Informational emails that are relevant but don't require a response. Updates from \
         colleagues, shared documents, project status updates, announcements.",
    ),
    (
        "Newsletters",
        "Subscriptions, digests, marketing emails, content updates, and promotional content \
         from brands or publications the user has subscribed to.",
    ),
    (
        "Notifications",
        "Automated messages from apps and services: GitHub notifications, calendar reminders, \
         shipping updates, social media alerts, security alerts, two-factor codes.",
    ),
    (
        "Auto-Archive",
        "Low-value automated emails: receipts, order confirmations, password reset \
         confirmations, unsubscribe confirmations, out-of-office replies, and other emails \
         that can be safely archived.",
    ),
];

/// The default set as bucket definitions.
pub fn default_definitions() -> Vec<BucketDefinition> {
    DEFAULT_BUCKETS
        .iter()
        .map(|(name, description)| BucketDefinition::new(*name, *description))
        .collect()
}

/// Give `user_id` the default buckets unless they already have some.
///
/// Returns the buckets created (empty when the user was already set up).
pub async fn seed_default_buckets<S>(store: &S, user_id: &str) -> StoreResult<Vec<Bucket>>
where
    S: BucketStore + ?Sized,
{
    if store.count_buckets(user_id).await? > 0 {
        return Ok(Vec::new());
    }

    let mut created = Vec::with_capacity(DEFAULT_BUCKETS.len());
    for (name, description) in DEFAULT_BUCKETS {
        created.push(store.create_bucket(user_id, name, description, true).await?);
    }
    info!(user_id, count = created.len(), "seeded default buckets");
    Ok(created)
}
