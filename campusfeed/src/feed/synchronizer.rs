use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use crate::types::{FeedSnapshot, Post};

/// Monotonically increasing tag assigned to each received snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotVersion(u64);

impl SnapshotVersion {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The comment reads a received snapshot still needs before it can be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutTicket {
    pub version: SnapshotVersion,
    pub post_ids: Vec<String>,
}

#[derive(Debug)]
struct StagedSnapshot {
    posts: Vec<Post>,
    liked: HashSet<String>,
}

/// Keeps the visible post list, replacing it wholesale with each snapshot
/// once that snapshot's comment fan-out has settled.
#[derive(Debug)]
pub struct FeedSynchronizer {
    next_version: u64,
    latest_received: Option<SnapshotVersion>,
    applied: Option<SnapshotVersion>,
    posts: Vec<Post>,
    staged: BTreeMap<SnapshotVersion, StagedSnapshot>,
    loading: bool,
}

impl Default for FeedSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedSynchronizer {
    pub fn new() -> Self {
        Self {
            next_version: 0,
            latest_received: None,
            applied: None,
            posts: Vec::new(),
            staged: BTreeMap::new(),
            loading: true,
        }
    }

    /// Stages `snapshot` under a fresh version. `user_id` selects which posts
    /// count as liked by the local user.
    pub fn receive(&mut self, snapshot: FeedSnapshot, user_id: Option<&str>) -> FanOutTicket {
        self.next_version += 1;
        let version = SnapshotVersion::new(self.next_version);
        self.latest_received = Some(version);

        let liked = match user_id {
            Some(user_id) => snapshot
                .records
                .iter()
                .filter(|record| record.is_liked_by(user_id))
                .map(|record| record.id.clone())
                .collect(),
            None => HashSet::new(),
        };
        let posts: Vec<Post> = snapshot.records.iter().map(Post::from).collect();
        let post_ids = posts.iter().map(|post| post.id.clone()).collect();

        log::debug!("staged snapshot {version} with {} posts", posts.len());
        self.staged.insert(version, StagedSnapshot { posts, liked });
        FanOutTicket { version, post_ids }
    }

    /// Makes the staged snapshot `version` visible and returns the local
    /// user's liked set for it. Returns `None` when a version at least as new
    /// was already applied.
    pub(crate) fn complete(&mut self, version: SnapshotVersion) -> Option<HashSet<String>> {
        let staged = self.staged.remove(&version)?;
        if self.applied.is_some_and(|applied| applied >= version) {
            return None;
        }

        self.posts = staged.posts;
        self.applied = Some(version);
        self.loading = false;
        // Anything staged before this version can never be applied now.
        self.staged = self.staged.split_off(&version);
        Some(staged.liked)
    }

    /// Records a stream failure; the applied list stays as it is.
    pub fn fail(&mut self) {
        self.loading = false;
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn applied(&self) -> Option<SnapshotVersion> {
        self.applied
    }

    pub fn latest_received(&self) -> Option<SnapshotVersion> {
        self.latest_received
    }

    /// True until the first snapshot is applied or the stream fails.
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Number of received snapshots still waiting on their fan-in.
    pub fn pending(&self) -> usize {
        self.staged.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, PostRecord};

    fn record(id: &str, likes: &[&str]) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            author: "Gus".to_string(),
            category: Category::Library,
            date_created: format!("2024-03-0{}T10:00:00", id.len()),
            image: None,
            location: String::new(),
            text: String::new(),
            tags: Vec::new(),
            likes: likes.iter().map(|s| s.to_string()).collect(),
            comments: 0,
        }
    }

    fn snapshot(ids: &[&str]) -> FeedSnapshot {
        FeedSnapshot::from_unordered(ids.iter().map(|id| record(id, &["u1"])).collect())
    }

    #[test]
    fn staged_snapshot_is_invisible_until_completed() {
        let mut sync = FeedSynchronizer::new();
        let ticket = sync.receive(snapshot(&["a", "b"]), Some("u1"));
        assert!(sync.posts().is_empty());
        assert!(sync.loading());

        let liked = sync.complete(ticket.version).unwrap();
        assert_eq!(sync.posts().len(), 2);
        assert_eq!(liked.len(), 2);
        assert!(!sync.loading());
    }

    #[test]
    fn older_version_is_discarded_after_newer_applies() {
        let mut sync = FeedSynchronizer::new();
        let old = sync.receive(snapshot(&["a"]), None);
        let new = sync.receive(snapshot(&["a", "b", "c"]), None);

        assert!(sync.complete(new.version).is_some());
        assert!(sync.complete(old.version).is_none());
        assert_eq!(sync.posts().len(), 3);
        assert_eq!(sync.applied(), Some(new.version));
        assert_eq!(sync.pending(), 0);
    }

    #[test]
    fn versions_increase() {
        let mut sync = FeedSynchronizer::new();
        let first = sync.receive(FeedSnapshot::default(), None);
        let second = sync.receive(FeedSnapshot::default(), None);
        assert!(second.version > first.version);
        assert_eq!(sync.latest_received(), Some(second.version));
    }

    #[test]
    fn failure_clears_loading_and_keeps_posts() {
        let mut sync = FeedSynchronizer::new();
        let ticket = sync.receive(snapshot(&["a"]), None);
        sync.complete(ticket.version);
        sync.fail();
        assert!(!sync.loading());
        assert_eq!(sync.posts().len(), 1);
    }
}
