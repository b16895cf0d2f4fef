use std::collections::HashMap;

use futures::future::join_all;

use super::synchronizer::{FanOutTicket, SnapshotVersion};
use crate::{
    errors::{FeedError, ValidationError},
    identity::LocalIdentity,
    store::DocumentStore,
    types::CommentBundle,
};

static EMPTY_BUNDLE: CommentBundle = CommentBundle::EMPTY;

/// Outcome of one post's bundle read.
#[derive(Debug)]
pub enum BundleFetch {
    Found(CommentBundle),
    Missing,
    Failed(FeedError),
}

/// Settled fan-out for one snapshot version.
#[derive(Debug)]
pub struct FanIn {
    pub version: SnapshotVersion,
    pub results: Vec<(String, BundleFetch)>,
}

/// Reads every bundle named by `ticket` concurrently and waits for all of them.
pub async fn fetch_bundles<S: DocumentStore>(store: &S, ticket: FanOutTicket) -> FanIn {
    let reads = ticket.post_ids.into_iter().map(|post_id| async move {
        let fetch = match store.comment_bundle(&post_id).await {
            Ok(Some(bundle)) => BundleFetch::Found(bundle),
            Ok(None) => BundleFetch::Missing,
            Err(err) => BundleFetch::Failed(err),
        };
        (post_id, fetch)
    });
    FanIn {
        version: ticket.version,
        results: join_all(reads).await,
    }
}

#[derive(Debug)]
struct CachedBundle {
    version: SnapshotVersion,
    bundle: CommentBundle,
}

/// Comment bundles keyed by post id. Entries are only ever added or replaced.
#[derive(Debug, Default)]
pub struct CommentCache {
    entries: HashMap<String, CachedBundle>,
}

impl CommentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a fan-in. Results older than the cached entry are skipped and a
    /// failed read keeps whatever the post had before.
    pub fn merge(&mut self, fan_in: FanIn) {
        let version = fan_in.version;
        for (post_id, fetch) in fan_in.results {
            if self
                .entries
                .get(&post_id)
                .is_some_and(|cached| cached.version > version)
            {
                log::debug!("ignoring {version} comments for {post_id}: cache is newer");
                continue;
            }
            match fetch {
                BundleFetch::Found(bundle) => {
                    self.entries.insert(post_id, CachedBundle { version, bundle });
                }
                BundleFetch::Missing => {
                    self.entries.insert(
                        post_id,
                        CachedBundle {
                            version,
                            bundle: CommentBundle::default(),
                        },
                    );
                }
                BundleFetch::Failed(err) => {
                    log::warn!("failed to load comments for {post_id}: {err}");
                    self.entries.entry(post_id).or_insert(CachedBundle {
                        version,
                        bundle: CommentBundle::default(),
                    });
                }
            }
        }
    }

    /// Reflects a successful local append until the next fan-in replaces it.
    pub fn record_append(&mut self, post_id: &str, author: &str, text: &str) {
        if let Some(cached) = self.entries.get_mut(post_id) {
            cached.bundle.append_unique(author, text);
        }
    }

    /// The cached bundle, or an empty one for unknown posts.
    pub fn get(&self, post_id: &str) -> &CommentBundle {
        self.entries
            .get(post_id)
            .map(|cached| &cached.bundle)
            .unwrap_or(&EMPTY_BUNDLE)
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.entries.contains_key(post_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a comment submission. The two remote writes are independent, so
/// each reports its own outcome.
#[derive(Debug)]
pub struct CommentAppend {
    pub author: String,
    pub text: String,
    pub bundle: Result<(), FeedError>,
    pub counter: Result<(), FeedError>,
}

impl CommentAppend {
    pub fn is_complete(&self) -> bool {
        self.bundle.is_ok() && self.counter.is_ok()
    }
}

/// Appends `text` to the post's bundle and bumps its comment counter.
///
/// Blank text is rejected with a validation error before anything is sent.
pub async fn append_comment<S: DocumentStore>(
    store: &S,
    identity: &LocalIdentity,
    post_id: &str,
    text: &str,
) -> Result<CommentAppend, FeedError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::single("comment", "empty", "comment text must not be empty").into());
    }
    let author = identity.author_name().to_string();

    let (bundle, counter) = futures::join!(
        store.append_comment(post_id, &author, text),
        store.increment_comment_count(post_id, 1)
    );
    if let Err(err) = &bundle {
        log::warn!("failed to append comment to {post_id}: {err}");
    }
    if let Err(err) = &counter {
        log::warn!("failed to increment comment count for {post_id}: {err}");
    }

    Ok(CommentAppend {
        author,
        text: text.to_string(),
        bundle,
        counter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn fan_in(version: u64, results: Vec<(&str, BundleFetch)>) -> FanIn {
        FanIn {
            version: SnapshotVersion::new(version),
            results: results.into_iter().map(|(id, fetch)| (id.to_string(), fetch)).collect(),
        }
    }

    fn bundle(comment: &str) -> CommentBundle {
        CommentBundle {
            authors: vec!["Ann".to_string()],
            comments: vec![comment.to_string()],
        }
    }

    #[test]
    fn stale_results_do_not_overwrite_newer() {
        let mut cache = CommentCache::new();
        cache.merge(fan_in(2, vec![("p1", BundleFetch::Found(bundle("fresh")))]));
        cache.merge(fan_in(1, vec![("p1", BundleFetch::Found(bundle("stale")))]));
        assert_eq!(cache.get("p1").comments, ["fresh"]);
    }

    #[test]
    fn failed_read_keeps_previous_bundle() {
        let mut cache = CommentCache::new();
        cache.merge(fan_in(1, vec![("p1", BundleFetch::Found(bundle("kept")))]));
        cache.merge(fan_in(
            2,
            vec![
                ("p1", BundleFetch::Failed(FeedError::not_found("x"))),
                ("p2", BundleFetch::Failed(FeedError::not_found("y"))),
            ],
        ));
        assert_eq!(cache.get("p1").comments, ["kept"]);
        assert!(cache.contains("p2"));
        assert!(cache.get("p2").is_empty());
    }

    #[test]
    fn entries_are_not_evicted() {
        let mut cache = CommentCache::new();
        cache.merge(fan_in(1, vec![("p1", BundleFetch::Missing)]));
        cache.merge(fan_in(2, vec![("p2", BundleFetch::Missing)]));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("unknown").is_empty());
    }

    #[tokio::test]
    async fn blank_comment_is_rejected_locally() {
        let store = MemoryStore::new();
        let identity = LocalIdentity::new("u1", None);
        for text in ["", "   "] {
            let err = append_comment(&store, &identity, "p1", text).await.unwrap_err();
            match err {
                FeedError::Validation(validation) => assert!(validation.has_code("empty")),
                other => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(store.calls().mutations, 0);
    }

    #[tokio::test]
    async fn partial_failure_is_reported_per_write() {
        let store = MemoryStore::new();
        let identity = LocalIdentity::new("u1", Some("Gus".to_string()));
        let outcome = append_comment(&store, &identity, "ghost", "  hello ").await.unwrap();
        assert_eq!(outcome.author, "Gus");
        assert_eq!(outcome.text, "hello");
        assert!(outcome.bundle.is_ok());
        assert!(matches!(outcome.counter, Err(FeedError::NotFound { .. })));
        assert!(!outcome.is_complete());
        assert_eq!(store.calls().mutations, 2);
    }
}
