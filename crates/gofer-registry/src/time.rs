//! Registry for time-predicate subscriptions.

use chrono::{DateTime, Utc};
use gofer_core::ids::SubscriptionKey;
use gofer_core::subscription::Subscription;
use gofer_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Membership test over wall-clock instants.
pub trait TimePredicate: Send + Sync {
    fn admits(&self, at: DateTime<Utc>) -> bool;
}

impl<F> TimePredicate for F
where
    F: Fn(DateTime<Utc>) -> bool + Send + Sync,
{
    fn admits(&self, at: DateTime<Utc>) -> bool {
        self(at)
    }
}

/// Flat map of time-predicate subscriptions keyed by subscription key.
pub struct TimeRegistry<P> {
    entries: Mutex<HashMap<SubscriptionKey, Arc<Subscription<P>>>>,
}

impl<P: TimePredicate> TimeRegistry<P> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Add a subscription; fails with [`Error::SubscriptionExists`] on key collision.
    pub async fn insert(&self, subscription: Subscription<P>) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&subscription.key) {
            return Err(Error::SubscriptionExists(subscription.key.to_string()));
        }
        entries.insert(subscription.key.clone(), Arc::new(subscription));
        Ok(())
    }

    /// Remove a subscription; returns whether one was present.
    pub async fn remove(&self, key: &SubscriptionKey) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    /// Subscriptions whose predicate admits `now`.
    ///
    /// Entries are snapshotted under the lock and evaluated after it is
    /// released, so subscribe/unsubscribe never wait on a scan.
    pub async fn lookup_time(&self, now: DateTime<Utc>) -> Vec<Arc<Subscription<P>>> {
        let snapshot: Vec<Arc<Subscription<P>>> =
            self.entries.lock().await.values().cloned().collect();

        snapshot
            .into_iter()
            .filter(|sub| sub.matcher.admits(now))
            .collect()
    }

    pub async fn get(&self, key: &SubscriptionKey) -> Option<Arc<Subscription<P>>> {
        self.entries.lock().await.get(key).cloned()
    }

    /// All registered keys, sorted.
    pub async fn keys(&self) -> Vec<SubscriptionKey> {
        let mut keys: Vec<SubscriptionKey> = self.entries.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<P: TimePredicate> Default for TimeRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
