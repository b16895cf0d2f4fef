//! Client-side feed reconciliation.
//!
//! A received snapshot is staged under a [`SnapshotVersion`] and its comment
//! bundles are fetched concurrently; the snapshot replaces the visible post
//! list only once that fan-out settles, and only if nothing newer was applied
//! first. Like state is re-derived from each applied snapshot and overlaid
//! with optimistic changes until a later snapshot supersedes them.

mod comments;
mod filter;
mod likes;
mod session;
mod synchronizer;

pub use comments::{BundleFetch, CommentAppend, CommentCache, FanIn, append_comment, fetch_bundles};
pub use filter::filter_posts;
pub use likes::{LikeAction, LikeMutation, LikeStatus, LikeTracker};
pub use session::{FeedEvent, FeedSession, LikeToggle};
pub use synchronizer::{FanOutTicket, FeedSynchronizer, SnapshotVersion};

use serde::Serialize;

use crate::{
    errors::FeedError,
    identity::LocalIdentity,
    types::{CategoryFilter, CommentBundle, FeedSnapshot, Post},
};

/// What happened to a settled fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanInOutcome {
    Applied(SnapshotVersion),
    /// A version at least as new was already applied.
    Discarded(SnapshotVersion),
}

/// One post as it should be displayed.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPost<'a> {
    pub post: &'a Post,
    pub likes: usize,
    pub is_liked: bool,
    pub comments: &'a CommentBundle,
}

/// All feed state owned by one view: synchronizer, comment cache, like
/// tracker and the selected category.
#[derive(Debug, Default)]
pub struct FeedState {
    sync: FeedSynchronizer,
    comments: CommentCache,
    likes: LikeTracker,
    filter: CategoryFilter,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receive_snapshot(&mut self, snapshot: FeedSnapshot, identity: &LocalIdentity) -> FanOutTicket {
        self.sync.receive(snapshot, identity.user_id())
    }

    pub fn complete_fan_out(&mut self, fan_in: FanIn) -> FanInOutcome {
        let version = fan_in.version;
        match self.sync.complete(version) {
            Some(liked) => {
                self.comments.merge(fan_in);
                self.likes.reconcile(liked, version);
                log::debug!("applied snapshot {version} ({} posts)", self.sync.posts().len());
                FanInOutcome::Applied(version)
            }
            None => {
                log::debug!("discarded stale snapshot {version}");
                FanInOutcome::Discarded(version)
            }
        }
    }

    pub fn subscription_failed(&mut self) {
        self.sync.fail();
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn begin_like_toggle(&mut self, post_id: &str, identity: &LocalIdentity) -> Option<LikeMutation> {
        self.likes.begin_toggle(post_id, identity)
    }

    pub fn settle_like(&mut self, mutation: &LikeMutation, result: &Result<(), FeedError>) {
        self.likes.settle(mutation, result, self.sync.latest_received());
    }

    pub fn record_comment(&mut self, post_id: &str, author: &str, text: &str) {
        self.comments.record_append(post_id, author, text);
    }

    /// The full applied post list, newest first.
    pub fn posts(&self) -> &[Post] {
        self.sync.posts()
    }

    /// Applied posts that pass the selected category.
    pub fn visible_posts(&self) -> Vec<&Post> {
        filter_posts(self.sync.posts(), &self.filter)
    }

    pub fn rendered(&self) -> Vec<RenderedPost<'_>> {
        self.visible_posts()
            .into_iter()
            .map(|post| RenderedPost {
                post,
                likes: self.likes.adjusted_count(&post.id, post.likes),
                is_liked: self.likes.is_liked(&post.id),
                comments: self.comments.get(&post.id),
            })
            .collect()
    }

    pub fn comments_for(&self, post_id: &str) -> &CommentBundle {
        self.comments.get(post_id)
    }

    pub fn is_liked(&self, post_id: &str) -> bool {
        self.likes.is_liked(post_id)
    }

    pub fn like_status(&self, post_id: &str) -> Option<LikeStatus> {
        self.likes.status(post_id)
    }

    pub fn loading(&self) -> bool {
        self.sync.loading()
    }

    pub fn applied_version(&self) -> Option<SnapshotVersion> {
        self.sync.applied()
    }

    pub fn latest_received(&self) -> Option<SnapshotVersion> {
        self.sync.latest_received()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, PostRecord};

    fn record(id: &str, category: Category, likes: &[&str]) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            author: "Gus".to_string(),
            category,
            date_created: "2024-03-05T14:30:00".to_string(),
            image: None,
            location: String::new(),
            text: String::new(),
            tags: Vec::new(),
            likes: likes.iter().map(|s| s.to_string()).collect(),
            comments: 3,
        }
    }

    fn empty_fan_in(ticket: FanOutTicket) -> FanIn {
        FanIn {
            version: ticket.version,
            results: ticket
                .post_ids
                .into_iter()
                .map(|id| (id, BundleFetch::Missing))
                .collect(),
        }
    }

    #[test]
    fn rendered_posts_combine_likes_and_comments() {
        let identity = LocalIdentity::new("u1", None);
        let mut state = FeedState::new();
        let snapshot = FeedSnapshot::from_unordered(vec![record("p1", Category::Sports, &["u1", "u2"])]);
        let ticket = state.receive_snapshot(snapshot, &identity);
        assert_eq!(state.complete_fan_out(empty_fan_in(ticket)), FanInOutcome::Applied(SnapshotVersion::new(1)));

        let rendered = state.rendered();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].likes, 2);
        assert!(rendered[0].is_liked);
        assert!(rendered[0].comments.is_empty());
        assert_eq!(rendered[0].post.comments, 3);
    }

    #[test]
    fn filter_applies_to_rendered_list() {
        let identity = LocalIdentity::unestablished();
        let mut state = FeedState::new();
        let snapshot = FeedSnapshot::from_unordered(vec![
            record("a", Category::Sports, &[]),
            record("b", Category::Events, &[]),
        ]);
        let ticket = state.receive_snapshot(snapshot, &identity);
        state.complete_fan_out(empty_fan_in(ticket));

        state.set_filter(CategoryFilter::Only(Category::Events));
        let ids: Vec<&str> = state.rendered().iter().map(|r| r.post.id.as_str()).collect();
        assert_eq!(ids, ["b"]);
        assert_eq!(state.posts().len(), 2);
    }
}
