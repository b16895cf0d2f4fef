//! campusfeed core library.
//!
//! Live campus social feed on a document store: snapshot synchronization,
//! per-post comment aggregation, optimistic likes and the campus links
//! directory, with in-memory and Redis Stack backends.

pub mod alerts;
pub mod config;
pub mod errors;
pub mod feed;
pub mod format;
pub mod id;
pub mod identity;
pub mod keys;
pub mod links;
pub mod runtime;
pub mod store;
pub mod types;

pub use alerts::{Alert, AlertSink, LogAlerts};
pub use config::FeedConfig;
pub use errors::*;
pub use feed::{FeedEvent, FeedSession, FeedState, LikeToggle, RenderedPost, SnapshotVersion};
pub use identity::{FilePreferences, LocalIdentity};
pub use store::{DocumentStore, FeedSubscription, MemoryStore, RedisStore};
pub use types::{Category, CategoryFilter, CommentBundle, FeedSnapshot, Post, PostRecord};

pub use redis;
pub use redis::aio::ConnectionManager;

/// Delete all keys matching a pattern (for test cleanup).
///
/// This performs a SCAN + DEL operation to safely delete keys without blocking Redis.
pub async fn cleanup_pattern(conn: &mut ConnectionManager, pattern: &str) -> Result<u64, FeedError> {
    const SCAN_COUNT: usize = 1000;
    let mut cursor: u64 = 0;
    let mut total_deleted: u64 = 0;

    loop {
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;

        if !keys.is_empty() {
            let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(conn).await?;
            total_deleted += deleted;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    Ok(total_deleted)
}
