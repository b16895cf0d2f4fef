use std::collections::{HashMap, HashSet};

use super::synchronizer::SnapshotVersion;
use crate::{errors::FeedError, identity::LocalIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Add,
    Remove,
}

/// Lifecycle of an optimistic like change.
///
/// `after` is the newest snapshot version received when the remote call
/// settled. A confirmed change stays until an applied snapshot agrees with
/// it, since a snapshot received later may still have been read before the
/// write. A failed change is superseded by any snapshot newer than `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStatus {
    Pending,
    Confirmed { after: Option<SnapshotVersion> },
    Failed { after: Option<SnapshotVersion> },
}

/// A like change the caller must send to the store, then hand back to
/// [`LikeTracker::settle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeMutation {
    pub post_id: String,
    pub user_id: String,
    pub action: LikeAction,
    seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct OptimisticLike {
    liked: bool,
    status: LikeStatus,
    seq: u64,
}

/// Local user's liked posts: the set derived from the last applied snapshot
/// plus an overlay of optimistic changes not yet seen in a snapshot.
#[derive(Debug, Default)]
pub struct LikeTracker {
    base: HashSet<String>,
    overlay: HashMap<String, OptimisticLike>,
    next_seq: u64,
}

impl LikeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_liked(&self, post_id: &str) -> bool {
        match self.overlay.get(post_id) {
            Some(entry) => entry.liked,
            None => self.base.contains(post_id),
        }
    }

    pub fn status(&self, post_id: &str) -> Option<LikeStatus> {
        self.overlay.get(post_id).map(|entry| entry.status)
    }

    /// Like count to render, given the count carried by the snapshot.
    pub fn adjusted_count(&self, post_id: &str, snapshot_count: usize) -> usize {
        let Some(entry) = self.overlay.get(post_id) else {
            return snapshot_count;
        };
        match (entry.liked, self.base.contains(post_id)) {
            (true, false) => snapshot_count + 1,
            (false, true) => snapshot_count.saturating_sub(1),
            _ => snapshot_count,
        }
    }

    /// Flips the local state and returns the remote change to issue, or
    /// `None` when the identity has no user id yet.
    pub fn begin_toggle(&mut self, post_id: &str, identity: &LocalIdentity) -> Option<LikeMutation> {
        let user_id = identity.user_id()?;
        let liked = self.is_liked(post_id);
        self.next_seq += 1;
        self.overlay.insert(
            post_id.to_string(),
            OptimisticLike {
                liked: !liked,
                status: LikeStatus::Pending,
                seq: self.next_seq,
            },
        );
        Some(LikeMutation {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            action: if liked { LikeAction::Remove } else { LikeAction::Add },
            seq: self.next_seq,
        })
    }

    /// Records the remote outcome. Failures are logged; the local state is kept.
    pub fn settle(
        &mut self,
        mutation: &LikeMutation,
        result: &Result<(), FeedError>,
        latest_received: Option<SnapshotVersion>,
    ) {
        if let Err(err) = result {
            log::warn!("failed to {:?} like on {}: {err}", mutation.action, mutation.post_id);
        }
        match self.overlay.get_mut(&mutation.post_id) {
            Some(entry) if entry.seq == mutation.seq => {
                entry.status = match result {
                    Ok(()) => LikeStatus::Confirmed { after: latest_received },
                    Err(_) => LikeStatus::Failed { after: latest_received },
                };
            }
            _ => log::debug!("like change on {} superseded before settling", mutation.post_id),
        }
    }

    /// Replaces the base set with the liked set of the snapshot `applied` and
    /// drops settled overlay entries that snapshot supersedes.
    pub fn reconcile(&mut self, liked: HashSet<String>, applied: SnapshotVersion) {
        self.base = liked;
        let base = &self.base;
        self.overlay.retain(|post_id, entry| match entry.status {
            LikeStatus::Pending => true,
            LikeStatus::Confirmed { .. } => base.contains(post_id) != entry.liked,
            LikeStatus::Failed { after } => after.is_some_and(|settled_at| applied <= settled_at),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liked(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn toggle_twice_restores_state() {
        let identity = LocalIdentity::new("u1", None);
        let mut tracker = LikeTracker::new();
        tracker.reconcile(liked(&["p1"]), SnapshotVersion::new(1));

        let first = tracker.begin_toggle("p1", &identity).unwrap();
        assert_eq!(first.action, LikeAction::Remove);
        assert!(!tracker.is_liked("p1"));

        let second = tracker.begin_toggle("p1", &identity).unwrap();
        assert_eq!(second.action, LikeAction::Add);
        assert!(tracker.is_liked("p1"));
    }

    #[test]
    fn no_user_id_means_no_toggle() {
        let mut tracker = LikeTracker::new();
        assert!(tracker.begin_toggle("p1", &LocalIdentity::unestablished()).is_none());
        assert!(!tracker.is_liked("p1"));
    }

    #[test]
    fn pending_overrides_snapshots() {
        let identity = LocalIdentity::new("u1", None);
        let mut tracker = LikeTracker::new();
        tracker.begin_toggle("p1", &identity).unwrap();
        tracker.reconcile(liked(&[]), SnapshotVersion::new(5));
        assert!(tracker.is_liked("p1"));
        assert_eq!(tracker.adjusted_count("p1", 0), 1);
    }

    #[test]
    fn failed_change_persists_until_newer_snapshot() {
        let identity = LocalIdentity::new("u1", None);
        let mut tracker = LikeTracker::new();
        tracker.reconcile(liked(&[]), SnapshotVersion::new(1));

        let mutation = tracker.begin_toggle("p1", &identity).unwrap();
        let failure = Err(FeedError::not_found("posts/p1"));
        tracker.settle(&mutation, &failure, Some(SnapshotVersion::new(2)));
        assert_eq!(
            tracker.status("p1"),
            Some(LikeStatus::Failed {
                after: Some(SnapshotVersion::new(2))
            })
        );

        // A snapshot received before settlement does not reconcile.
        tracker.reconcile(liked(&[]), SnapshotVersion::new(2));
        assert!(tracker.is_liked("p1"));

        tracker.reconcile(liked(&[]), SnapshotVersion::new(3));
        assert!(!tracker.is_liked("p1"));
        assert_eq!(tracker.status("p1"), None);
    }

    #[test]
    fn confirmed_change_survives_snapshot_read_before_the_write() {
        let identity = LocalIdentity::new("u1", None);
        let mut tracker = LikeTracker::new();
        tracker.reconcile(liked(&[]), SnapshotVersion::new(1));

        let mutation = tracker.begin_toggle("p1", &identity).unwrap();
        tracker.settle(&mutation, &Ok(()), Some(SnapshotVersion::new(1)));

        // Received after settlement, but loaded before the like was stored.
        tracker.reconcile(liked(&[]), SnapshotVersion::new(2));
        assert!(tracker.is_liked("p1"));
        assert_eq!(tracker.adjusted_count("p1", 0), 1);

        tracker.reconcile(liked(&["p1"]), SnapshotVersion::new(3));
        assert_eq!(tracker.status("p1"), None);
        assert!(tracker.is_liked("p1"));
        assert_eq!(tracker.adjusted_count("p1", 1), 1);
    }

    #[test]
    fn count_adjusts_only_on_disagreement() {
        let identity = LocalIdentity::new("u1", None);
        let mut tracker = LikeTracker::new();
        tracker.reconcile(liked(&["p1"]), SnapshotVersion::new(1));
        assert_eq!(tracker.adjusted_count("p1", 2), 2);

        tracker.begin_toggle("p1", &identity).unwrap();
        assert_eq!(tracker.adjusted_count("p1", 2), 1);
    }
}
