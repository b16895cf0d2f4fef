use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use super::{DocumentStore, FeedSubscription, SUBSCRIPTION_BUFFER};
use crate::{
    errors::FeedError,
    id::generate_document_id,
    types::{CommentBundle, FeedSnapshot, PostRecord},
};

/// Number of calls the store has served, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub subscriptions: usize,
    pub comment_reads: usize,
    pub mutations: usize,
    pub link_reads: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    posts: BTreeMap<String, PostRecord>,
    bundles: HashMap<String, CommentBundle>,
    links: Option<Map<String, Value>>,
    failing_reads: HashSet<String>,
    read_delays: HashMap<String, Duration>,
    failing_mutations: bool,
    subscription_error: Option<String>,
    calls: CallCounts,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<MemoryState>,
    /// Bumped on every post document write; subscriptions re-snapshot on change.
    revision: watch::Sender<u64>,
}

/// In-process document store with the same semantics as the Redis backend.
///
/// Besides serving the feed it exposes knobs to inject read failures,
/// read latency, mutation failures and stream errors.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(MemoryState::default()),
                revision,
            }),
        }
    }

    /// Stores a post, minting an id when `record.id` is empty. Returns the id.
    pub fn insert_post(&self, mut record: PostRecord) -> String {
        if record.id.is_empty() {
            record.id = generate_document_id();
        }
        let id = record.id.clone();
        self.inner.state.lock().posts.insert(id.clone(), record);
        self.notify();
        id
    }

    pub fn post(&self, post_id: &str) -> Option<PostRecord> {
        self.inner.state.lock().posts.get(post_id).cloned()
    }

    /// Writes a bundle directly. Bundles live outside the subscribed
    /// collection, so no change is announced.
    pub fn put_comment_bundle(&self, post_id: &str, bundle: CommentBundle) {
        self.inner.state.lock().bundles.insert(post_id.to_string(), bundle);
    }

    pub fn stored_comment_bundle(&self, post_id: &str) -> Option<CommentBundle> {
        self.inner.state.lock().bundles.get(post_id).cloned()
    }

    pub fn set_links_document(&self, document: Map<String, Value>) {
        self.inner.state.lock().links = Some(document);
    }

    /// Makes every subsequent bundle read for `post_id` fail (or succeed again).
    pub fn set_comment_read_failure(&self, post_id: &str, failing: bool) {
        let mut state = self.inner.state.lock();
        if failing {
            state.failing_reads.insert(post_id.to_string());
        } else {
            state.failing_reads.remove(post_id);
        }
    }

    /// Delays the next bundle read for `post_id` by `delay`, after the data is read.
    pub fn delay_next_comment_read(&self, post_id: &str, delay: Duration) {
        self.inner.state.lock().read_delays.insert(post_id.to_string(), delay);
    }

    pub fn set_mutations_failing(&self, failing: bool) {
        self.inner.state.lock().failing_mutations = failing;
    }

    /// Reports `message` as an error on every open subscription, which then ends.
    pub fn break_subscriptions(&self, message: &str) {
        self.inner.state.lock().subscription_error = Some(message.to_string());
        self.notify();
    }

    pub fn calls(&self) -> CallCounts {
        self.inner.state.lock().calls
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let records = self.inner.state.lock().posts.values().cloned().collect();
        FeedSnapshot::from_unordered(records)
    }

    fn next_delivery(&self) -> Result<FeedSnapshot, FeedError> {
        // The guard must be released before `snapshot` locks again.
        let error = self.inner.state.lock().subscription_error.clone();
        match error {
            Some(message) => Err(FeedError::subscription(message)),
            None => Ok(self.snapshot()),
        }
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }

    fn mutate<F>(&self, operation: &str, apply: F) -> Result<(), FeedError>
    where
        F: FnOnce(&mut MemoryState) -> Result<bool, FeedError>,
    {
        let announce = {
            let mut state = self.inner.state.lock();
            state.calls.mutations += 1;
            if state.failing_mutations {
                return Err(FeedError::Other {
                    message: format!("{operation} rejected: store unavailable").into(),
                });
            }
            apply(&mut state)?
        };
        if announce {
            self.notify();
        }
        Ok(())
    }
}

fn post_mut<'a>(state: &'a mut MemoryState, post_id: &str) -> Result<&'a mut PostRecord, FeedError> {
    state
        .posts
        .get_mut(post_id)
        .ok_or_else(|| FeedError::not_found(format!("posts/{post_id}")))
}

impl DocumentStore for MemoryStore {
    async fn subscribe(&self) -> Result<FeedSubscription, FeedError> {
        let mut changes = self.inner.revision.subscribe();
        self.inner.state.lock().calls.subscriptions += 1;

        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let store = self.clone();
        let pump = tokio::spawn(async move {
            loop {
                let delivery = store.next_delivery();
                let failed = delivery.is_err();
                if sender.send(delivery).await.is_err() || failed {
                    break;
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        });
        Ok(FeedSubscription::new(receiver, pump))
    }

    async fn comment_bundle(&self, post_id: &str) -> Result<Option<CommentBundle>, FeedError> {
        let (result, delay) = {
            let mut state = self.inner.state.lock();
            state.calls.comment_reads += 1;
            let delay = state.read_delays.remove(post_id);
            let result = if state.failing_reads.contains(post_id) {
                Err(FeedError::Other {
                    message: format!("comment read failed for {post_id}").into(),
                })
            } else {
                Ok(state.bundles.get(post_id).cloned())
            };
            (result, delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn add_like(&self, post_id: &str, user_id: &str) -> Result<(), FeedError> {
        self.mutate("add_like", |state| {
            let post = post_mut(state, post_id)?;
            if !post.is_liked_by(user_id) {
                post.likes.push(user_id.to_string());
            }
            Ok(true)
        })
    }

    async fn remove_like(&self, post_id: &str, user_id: &str) -> Result<(), FeedError> {
        self.mutate("remove_like", |state| {
            let post = post_mut(state, post_id)?;
            post.likes.retain(|liker| liker != user_id);
            Ok(true)
        })
    }

    async fn append_comment(&self, post_id: &str, author: &str, text: &str) -> Result<(), FeedError> {
        self.mutate("append_comment", |state| {
            state
                .bundles
                .entry(post_id.to_string())
                .or_default()
                .append_unique(author, text);
            Ok(false)
        })
    }

    async fn increment_comment_count(&self, post_id: &str, by: i64) -> Result<(), FeedError> {
        self.mutate("increment_comment_count", |state| {
            post_mut(state, post_id)?.comments += by;
            Ok(true)
        })
    }

    async fn links_document(&self) -> Result<Option<Map<String, Value>>, FeedError> {
        let mut state = self.inner.state.lock();
        state.calls.link_reads += 1;
        Ok(state.links.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn record(id: &str, likes: &[&str]) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            author: "Gus".to_string(),
            category: Category::Sports,
            date_created: "2024-03-05T14:30:00".to_string(),
            image: None,
            location: "Lund Center".to_string(),
            text: "Game tonight".to_string(),
            tags: vec!["hockey".to_string()],
            likes: likes.iter().map(|s| s.to_string()).collect(),
            comments: 0,
        }
    }

    #[tokio::test]
    async fn like_set_is_a_set() {
        let store = MemoryStore::new();
        store.insert_post(record("p1", &["u1"]));

        store.add_like("p1", "u1").await.unwrap();
        store.add_like("p1", "u2").await.unwrap();
        assert_eq!(store.post("p1").unwrap().likes, ["u1", "u2"]);

        store.remove_like("p1", "u1").await.unwrap();
        assert_eq!(store.post("p1").unwrap().likes, ["u2"]);
    }

    #[tokio::test]
    async fn mutations_on_missing_post_are_not_found() {
        let store = MemoryStore::new();
        let err = store.increment_comment_count("ghost", 1).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound { .. }));
        assert_eq!(store.calls().mutations, 1);
    }

    #[tokio::test]
    async fn append_creates_missing_bundle() {
        let store = MemoryStore::new();
        store.insert_post(record("p1", &[]));
        assert_eq!(store.comment_bundle("p1").await.unwrap(), None);

        store.append_comment("p1", "Anonymous", "nice").await.unwrap();
        store.append_comment("p1", "Anonymous", "nice").await.unwrap();
        let bundle = store.comment_bundle("p1").await.unwrap().unwrap();
        assert_eq!(bundle.comments, ["nice"]);
        assert!(bundle.is_aligned());
    }

    #[tokio::test]
    async fn subscription_delivers_initial_and_changed_snapshots() {
        let store = MemoryStore::new();
        store.insert_post(record("p1", &[]));
        let mut subscription = store.subscribe().await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("first snapshot delivered")
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), 1);

        store.insert_post(record("p2", &[]));
        let second = subscription.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn broken_subscription_reports_error_then_ends() {
        let store = MemoryStore::new();
        let mut subscription = store.subscribe().await.unwrap();
        assert!(subscription.next().await.unwrap().is_ok());

        store.break_subscriptions("permission denied");
        assert!(matches!(
            subscription.next().await,
            Some(Err(FeedError::Subscription { .. }))
        ));
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn failing_mutations_leave_documents_untouched() {
        let store = MemoryStore::new();
        store.insert_post(record("p1", &[]));
        store.set_mutations_failing(true);
        assert!(store.add_like("p1", "u1").await.is_err());
        assert!(store.post("p1").unwrap().likes.is_empty());
    }
}
