//! Backing document store: the subscribe / point-read / mutation primitives
//! the feed core consumes.

mod memory;
mod redis_store;

pub use memory::{CallCounts, MemoryStore};
pub use redis_store::RedisStore;

use serde_json::{Map, Value};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    errors::FeedError,
    types::{CommentBundle, FeedSnapshot},
};

/// Buffered snapshots per subscription before the pump waits on the consumer.
pub(crate) const SUBSCRIPTION_BUFFER: usize = 16;

pub(crate) const LIKES_FIELD: &str = "likes";
pub(crate) const COMMENT_COUNT_FIELD: &str = "comments";

/// Remote document database as seen by the feed.
///
/// Every method may fail independently; there are no transactions spanning calls.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Opens a live stream of full, newest-first snapshots of the post collection.
    async fn subscribe(&self) -> Result<FeedSubscription, FeedError>;

    /// Point-read of a post's comment bundle; `None` when the bundle does not exist.
    async fn comment_bundle(&self, post_id: &str) -> Result<Option<CommentBundle>, FeedError>;

    /// Set-add of `user_id` to the post's like-set.
    async fn add_like(&self, post_id: &str, user_id: &str) -> Result<(), FeedError>;

    /// Set-remove of `user_id` from the post's like-set.
    async fn remove_like(&self, post_id: &str, user_id: &str) -> Result<(), FeedError>;

    /// Union-append of one `(author, comment)` pair to the post's bundle,
    /// creating the bundle when missing.
    async fn append_comment(&self, post_id: &str, author: &str, text: &str) -> Result<(), FeedError>;

    /// Adds `by` to the post's denormalized comment counter.
    async fn increment_comment_count(&self, post_id: &str, by: i64) -> Result<(), FeedError>;

    /// Reads the campus links document (title → URL fields).
    async fn links_document(&self) -> Result<Option<Map<String, Value>>, FeedError>;
}

/// Handle to a live snapshot stream.
///
/// Dropping the handle releases the subscription.
#[derive(Debug)]
pub struct FeedSubscription {
    receiver: mpsc::Receiver<Result<FeedSnapshot, FeedError>>,
    pump: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    pub(crate) fn new(receiver: mpsc::Receiver<Result<FeedSnapshot, FeedError>>, pump: JoinHandle<()>) -> Self {
        Self {
            receiver,
            pump: Some(pump),
        }
    }

    /// Next snapshot or stream error; `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<FeedSnapshot, FeedError>> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.receiver.close();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
