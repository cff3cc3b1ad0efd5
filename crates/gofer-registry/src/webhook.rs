//! Registry for webhook subscriptions.
//!
//! Subscriptions are indexed `event -> repository -> [subscription]`. Lookup
//! is two hash probes per registry key followed by an action filter over a
//! short list.

use crate::filter::{EventFilter, Repository};
use gofer_core::events::WebhookEvent;
use gofer_core::ids::SubscriptionKey;
use gofer_core::subscription::Subscription;
use gofer_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Parsed match state of a webhook subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookMatch {
    pub filter: EventFilter,
    pub repository: Repository,
}

impl WebhookMatch {
    pub fn new(filter: EventFilter, repository: Repository) -> Self {
        Self { filter, repository }
    }

    /// Whether a run started for this subscription owes a report back.
    pub fn reports_back(&self) -> bool {
        self.filter.event.reports_back()
    }
}

type Entry = Arc<Subscription<WebhookMatch>>;

#[derive(Default)]
struct Index {
    by_event: HashMap<WebhookEvent, HashMap<Repository, Vec<Entry>>>,
    keys: HashMap<SubscriptionKey, (WebhookEvent, Repository)>,
}

/// Two-level webhook subscription index.
#[derive(Default)]
pub struct WebhookRegistry {
    index: Mutex<Index>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription; fails with [`Error::SubscriptionExists`] on key collision.
    pub async fn insert(&self, subscription: Subscription<WebhookMatch>) -> Result<()> {
        let mut index = self.index.lock().await;
        if index.keys.contains_key(&subscription.key) {
            return Err(Error::SubscriptionExists(subscription.key.to_string()));
        }

        let event = subscription.matcher.filter.event;
        let repository = subscription.matcher.repository.clone();
        index
            .keys
            .insert(subscription.key.clone(), (event, repository.clone()));
        index
            .by_event
            .entry(event)
            .or_default()
            .entry(repository)
            .or_default()
            .push(Arc::new(subscription));
        Ok(())
    }

    /// Remove a subscription; returns whether one was present.
    pub async fn remove(&self, key: &SubscriptionKey) -> bool {
        let mut index = self.index.lock().await;
        let Some((event, repository)) = index.keys.remove(key) else {
            return false;
        };

        if let Some(repos) = index.by_event.get_mut(&event) {
            if let Some(list) = repos.get_mut(&repository) {
                list.retain(|sub| &sub.key != key);
                if list.is_empty() {
                    repos.remove(&repository);
                }
            }
            if repos.is_empty() {
                index.by_event.remove(&event);
            }
        }
        true
    }

    /// Subscriptions matching an incoming `(event, repository, action)`.
    ///
    /// An incoming `pull_request` also returns subscriptions stored under
    /// `pull_request_with_check`.
    pub async fn lookup_webhook(
        &self,
        event: WebhookEvent,
        repository: &Repository,
        action: Option<&str>,
    ) -> Vec<Entry> {
        let index = self.index.lock().await;
        event
            .lookup_keys()
            .iter()
            .filter_map(|key| index.by_event.get(key))
            .filter_map(|repos| repos.get(repository))
            .flatten()
            .filter(|sub| sub.matcher.filter.admits(action))
            .cloned()
            .collect()
    }

    /// All registered keys, sorted.
    pub async fn keys(&self) -> Vec<SubscriptionKey> {
        let mut keys: Vec<SubscriptionKey> =
            self.index.lock().await.keys.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_event_filter;
    use gofer_core::subscription::SubscriptionParams;
    use pretty_assertions::assert_eq;

    const REPO: &str = "clintjedwards/experimental";

    fn sub(id: &str, filter: &str, repo: &str) -> Subscription<WebhookMatch> {
        Subscription::new(
            SubscriptionKey::parse("default", "build", id).unwrap(),
            WebhookMatch::new(
                parse_event_filter(filter).unwrap(),
                Repository::new(repo).unwrap(),
            ),
            SubscriptionParams::default(),
        )
    }

    fn repo() -> Repository {
        Repository::new(REPO).unwrap()
    }

    fn ids(entries: &[Entry]) -> Vec<String> {
        let mut ids: Vec<String> = entries
            .iter()
            .map(|e| e.key.subscription_id.to_string())
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_action_filtering() {
        let registry = WebhookRegistry::new();
        registry.insert(sub("opened", "pull_request:opened", REPO)).await.unwrap();
        registry.insert(sub("any", "pull_request", REPO)).await.unwrap();

        let hits = registry
            .lookup_webhook(WebhookEvent::PullRequest, &repo(), Some("closed"))
            .await;
        assert_eq!(ids(&hits), vec!["any"]);

        let hits = registry
            .lookup_webhook(WebhookEvent::PullRequest, &repo(), Some("OPENED"))
            .await;
        assert_eq!(ids(&hits), vec!["any", "opened"]);

        let hits = registry
            .lookup_webhook(WebhookEvent::PullRequest, &repo(), None)
            .await;
        assert_eq!(ids(&hits), vec!["any", "opened"]);
    }

    #[tokio::test]
    async fn test_repository_and_event_must_match() {
        let registry = WebhookRegistry::new();
        registry.insert(sub("push", "push", REPO)).await.unwrap();

        let other = Repository::new("clintjedwards/gofer").unwrap();
        assert!(registry.lookup_webhook(WebhookEvent::Push, &other, None).await.is_empty());
        assert!(registry.lookup_webhook(WebhookEvent::Create, &repo(), None).await.is_empty());
        assert_eq!(registry.lookup_webhook(WebhookEvent::Push, &repo(), None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_pull_request_alias_union() {
        let registry = WebhookRegistry::new();
        registry.insert(sub("plain", "pull_request", REPO)).await.unwrap();
        registry.insert(sub("checked", "pull_request_with_check", REPO)).await.unwrap();

        let hits = registry
            .lookup_webhook(WebhookEvent::PullRequest, &repo(), Some("opened"))
            .await;
        assert_eq!(ids(&hits), vec!["checked", "plain"]);

        let hits = registry
            .lookup_webhook(WebhookEvent::PullRequestWithCheck, &repo(), Some("opened"))
            .await;
        assert_eq!(ids(&hits), vec!["checked"]);
        assert!(hits[0].matcher.reports_back());
    }

    #[tokio::test]
    async fn test_duplicate_and_remove() {
        let registry = WebhookRegistry::new();
        registry.insert(sub("a", "push", REPO)).await.unwrap();
        assert!(matches!(
            registry.insert(sub("a", "release", REPO)).await,
            Err(Error::SubscriptionExists(_))
        ));
        assert_eq!(registry.len().await, 1);

        let key = SubscriptionKey::parse("default", "build", "a").unwrap();
        assert!(registry.remove(&key).await);
        assert!(registry.is_empty().await);
        assert!(registry.lookup_webhook(WebhookEvent::Push, &repo(), None).await.is_empty());
        assert!(!registry.remove(&key).await);
    }
}
