use futures::{
    FutureExt, StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};

use super::{
    CommentAppend, FanIn, FanInOutcome, FeedState, LikeAction, SnapshotVersion, append_comment, fetch_bundles,
};
use crate::{
    alerts::{Alert, AlertSink},
    errors::FeedError,
    identity::LocalIdentity,
    store::{DocumentStore, FeedSubscription},
    types::{CategoryFilter, FeedSnapshot},
};

/// Progress reported by [`FeedSession::next_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    /// A snapshot arrived and its comment fan-out started.
    Received(SnapshotVersion),
    /// A fan-out settled and its snapshot is now visible.
    Applied(SnapshotVersion),
    /// A fan-out settled after a newer snapshot was already shown.
    Discarded(SnapshotVersion),
    /// The live stream failed; the user has been alerted.
    SubscriptionFailed,
}

/// Result of [`FeedSession::toggle_like`].
#[derive(Debug)]
pub enum LikeToggle {
    /// No local user id is established; nothing changed.
    NoIdentity,
    /// The local state flipped to `liked`; `result` is the remote outcome.
    Toggled { liked: bool, result: Result<(), FeedError> },
}

impl LikeToggle {
    pub fn liked(&self) -> Option<bool> {
        match self {
            LikeToggle::NoIdentity => None,
            LikeToggle::Toggled { liked, .. } => Some(*liked),
        }
    }
}

enum Wake {
    FanIn(FanIn),
    Delivery(Option<Result<FeedSnapshot, FeedError>>),
}

/// Drives one feed view: owns the subscription, runs comment fan-outs on the
/// calling task and applies results to [`FeedState`].
pub struct FeedSession<S, A> {
    store: S,
    identity: LocalIdentity,
    alerts: A,
    state: FeedState,
    subscription: Option<FeedSubscription>,
    in_flight: FuturesUnordered<LocalBoxFuture<'static, FanIn>>,
}

impl<S, A> FeedSession<S, A>
where
    S: DocumentStore + Clone + 'static,
    A: AlertSink,
{
    /// Subscribes to the post collection. A failed subscribe is reported
    /// through `alerts` like any later stream failure.
    pub async fn open(store: S, identity: LocalIdentity, alerts: A) -> Self {
        let mut session = Self {
            store,
            identity,
            alerts,
            state: FeedState::new(),
            subscription: None,
            in_flight: FuturesUnordered::new(),
        };
        match session.store.subscribe().await {
            Ok(subscription) => session.subscription = Some(subscription),
            Err(err) => session.fail_subscription(err),
        }
        session
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Waits for the next snapshot or settled fan-out. Returns `None` once the
    /// subscription is gone and no fan-out is outstanding.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        loop {
            if self.subscription.is_none() && self.in_flight.is_empty() {
                return None;
            }

            let wake = tokio::select! {
                Some(fan_in) = self.in_flight.next(), if !self.in_flight.is_empty() => Wake::FanIn(fan_in),
                delivery = next_delivery(self.subscription.as_mut()) => Wake::Delivery(delivery),
            };

            match wake {
                Wake::FanIn(fan_in) => return Some(self.finish(fan_in)),
                Wake::Delivery(Some(Ok(snapshot))) => {
                    let ticket = self.state.receive_snapshot(snapshot, &self.identity);
                    let version = ticket.version;
                    let store = self.store.clone();
                    self.in_flight
                        .push(async move { fetch_bundles(&store, ticket).await }.boxed_local());
                    return Some(FeedEvent::Received(version));
                }
                Wake::Delivery(Some(Err(err))) => {
                    self.fail_subscription(err);
                    return Some(FeedEvent::SubscriptionFailed);
                }
                Wake::Delivery(None) => {
                    log::debug!("feed subscription ended");
                    self.subscription = None;
                }
            }
        }
    }

    /// Settles every outstanding fan-out without reading further snapshots.
    pub async fn drain_fan_outs(&mut self) -> Vec<FeedEvent> {
        let mut events = Vec::with_capacity(self.in_flight.len());
        while let Some(fan_in) = self.in_flight.next().await {
            events.push(self.finish(fan_in));
        }
        events
    }

    /// Optimistically flips the like state of `post_id`, then sends the change.
    pub async fn toggle_like(&mut self, post_id: &str) -> LikeToggle {
        let Some(mutation) = self.state.begin_like_toggle(post_id, &self.identity) else {
            log::debug!("ignoring like on {post_id}: no local user id");
            return LikeToggle::NoIdentity;
        };
        let result = match mutation.action {
            LikeAction::Add => self.store.add_like(&mutation.post_id, &mutation.user_id).await,
            LikeAction::Remove => self.store.remove_like(&mutation.post_id, &mutation.user_id).await,
        };
        self.state.settle_like(&mutation, &result);
        LikeToggle::Toggled {
            liked: mutation.action == LikeAction::Add,
            result,
        }
    }

    pub async fn add_comment(&mut self, post_id: &str, text: &str) -> Result<CommentAppend, FeedError> {
        let outcome = append_comment(&self.store, &self.identity, post_id, text).await?;
        if outcome.bundle.is_ok() {
            self.state.record_comment(post_id, &outcome.author, &outcome.text);
        }
        Ok(outcome)
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.state.set_filter(filter);
    }

    /// Releases the subscription. Outstanding fan-outs can still be drained.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            log::debug!("feed subscription released");
        }
    }

    fn finish(&mut self, fan_in: FanIn) -> FeedEvent {
        match self.state.complete_fan_out(fan_in) {
            FanInOutcome::Applied(version) => FeedEvent::Applied(version),
            FanInOutcome::Discarded(version) => FeedEvent::Discarded(version),
        }
    }

    fn fail_subscription(&mut self, err: FeedError) {
        log::error!("feed subscription failed: {err}");
        self.subscription = None;
        self.state.subscription_failed();
        self.alerts.alert(Alert::feed_unavailable());
    }
}

async fn next_delivery(subscription: Option<&mut FeedSubscription>) -> Option<Result<FeedSnapshot, FeedError>> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
