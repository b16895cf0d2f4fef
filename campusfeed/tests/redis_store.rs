//! Round trips against a Redis Stack server (RedisJSON). Run with
//! `REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored`.

use std::time::Duration;

use serde_json::json;

use campusfeed::{
    Alert, Category, CommentBundle, DocumentStore, FeedConfig, FeedError, FeedEvent, FeedSession, LocalIdentity,
    PostRecord, RedisStore, cleanup_pattern, links::load_links,
};

struct TestStore {
    store: RedisStore,
}

impl TestStore {
    async fn connect() -> Self {
        let mut config = FeedConfig::default();
        config.redis.url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        config.redis.prefix = format!("cf_test_{}", uuid::Uuid::new_v4().simple());
        let store = RedisStore::connect(&config).await.expect("connect to redis");
        Self { store }
    }

    async fn cleanup(self) {
        let mut conn = self.store.connection();
        let pattern = format!("{}:*", self.store.prefix());
        cleanup_pattern(&mut conn, &pattern).await.expect("cleanup keys");
    }
}

fn post(likes: &[&str]) -> PostRecord {
    PostRecord {
        id: String::new(),
        author: "Ole Gus".to_string(),
        category: Category::Events,
        date_created: "2024-03-05T14:30:00".to_string(),
        image: Some("https://gustavus.edu/images/nobel.jpg".to_string()),
        location: "Christ Chapel".to_string(),
        text: "Nobel Conference starts today".to_string(),
        tags: vec!["nobel".to_string()],
        likes: likes.iter().map(|s| s.to_string()).collect(),
        comments: 0,
    }
}

#[tokio::test]
#[ignore = "requires a running Redis Stack server"]
async fn like_set_mutations_are_set_semantics() {
    let ctx = TestStore::connect().await;
    let store = &ctx.store;
    let id = store.put_post(post(&["u1"])).await.unwrap();

    store.add_like(&id, "u1").await.unwrap();
    store.add_like(&id, "u2").await.unwrap();
    store.remove_like(&id, "u1").await.unwrap();

    let mut subscription = store.subscribe().await.unwrap();
    let snapshot = subscription.next().await.unwrap().unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].id, id);
    assert_eq!(snapshot.records[0].likes, ["u2"]);
    subscription.unsubscribe();

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Redis Stack server"]
async fn mutations_on_missing_post_report_not_found() {
    let ctx = TestStore::connect().await;
    let err = ctx.store.increment_comment_count("ghost", 1).await.unwrap_err();
    assert!(matches!(err, FeedError::NotFound { .. }));
    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Redis Stack server"]
async fn comment_append_creates_bundle_and_is_pairwise_union() {
    let ctx = TestStore::connect().await;
    let store = &ctx.store;
    let id = store.put_post(post(&[])).await.unwrap();
    assert_eq!(store.comment_bundle(&id).await.unwrap(), None);

    store.append_comment(&id, "Anonymous", "first").await.unwrap();
    store.append_comment(&id, "Anonymous", "first").await.unwrap();
    store.append_comment(&id, "Ann", "second").await.unwrap();

    let bundle = store.comment_bundle(&id).await.unwrap().unwrap();
    assert_eq!(
        bundle,
        CommentBundle {
            authors: vec!["Anonymous".to_string(), "Ann".to_string()],
            comments: vec!["first".to_string(), "second".to_string()],
        }
    );
    ctx.cleanup().await;
}

async fn next_applied<A: campusfeed::AlertSink>(session: &mut FeedSession<RedisStore, A>) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), session.next_event())
            .await
            .expect("event within timeout");
        match event {
            Some(FeedEvent::Applied(_)) => return,
            Some(FeedEvent::SubscriptionFailed) | None => panic!("feed ended before a snapshot was applied"),
            Some(_) => {}
        }
    }
}

#[tokio::test]
#[ignore = "requires a running Redis Stack server"]
async fn session_sees_counter_increment() {
    let ctx = TestStore::connect().await;
    let id = ctx.store.put_post(post(&[])).await.unwrap();
    let mut session = FeedSession::open(ctx.store.clone(), LocalIdentity::new("u1", None), |_: Alert| {}).await;

    next_applied(&mut session).await;

    let outcome = session.add_comment(&id, "See you there").await.unwrap();
    assert!(outcome.is_complete());
    next_applied(&mut session).await;

    let rendered = session.state().rendered();
    assert_eq!(rendered[0].post.comments, 1);
    assert_eq!(rendered[0].comments.comments, ["See you there"]);

    session.close();
    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Redis Stack server"]
async fn links_document_round_trip() {
    let ctx = TestStore::connect().await;
    assert!(load_links(&ctx.store).await.unwrap().is_empty());

    let document = json!({
        "Moodle": "https://moodle.gustavus.edu/",
        "Front desk": "x1234",
    });
    ctx.store
        .set_links_document(document.as_object().unwrap())
        .await
        .unwrap();
    let links = load_links(&ctx.store).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].label, "Moodle");
    ctx.cleanup().await;
}
