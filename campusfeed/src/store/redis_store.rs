use std::fmt;

use futures::StreamExt;
use redis::{aio::ConnectionManager, cmd};
use serde::de::Error as _;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::{COMMENT_COUNT_FIELD, DocumentStore, FeedSubscription, LIKES_FIELD, SUBSCRIPTION_BUFFER};
use crate::{
    config::{FeedConfig, FeedSettings, LinkSettings},
    errors::FeedError,
    id::generate_document_id,
    keys::KeyContext,
    runtime::{DocumentMutation, execute_mutation},
    types::{CommentBundle, FeedSnapshot, PostRecord},
};

/// Document store on Redis Stack: RedisJSON documents, a set index per
/// collection, Lua scripts for atomic field mutations and a Pub/Sub channel
/// announcing post changes.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
    feed: FeedSettings,
    links: LinkSettings,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("collection", &self.feed.collection)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    pub async fn connect(config: &FeedConfig) -> Result<Self, FeedError> {
        let url = config.redis_url()?;
        let client = redis::Client::open(url.as_str())?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            prefix: config.redis.prefix.clone(),
            feed: config.feed.clone(),
            links: config.links.clone(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A clone of the connection manager for advanced operations.
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    fn posts(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, &self.feed.collection)
    }

    fn bundle_key(&self, post_id: &str) -> String {
        self.posts()
            .sub_document(post_id, &self.feed.comment_collection, &self.feed.comment_bundle)
    }

    fn links_key(&self) -> String {
        KeyContext::new(&self.prefix, &self.links.collection).document(&self.links.document)
    }

    /// Writes a post document and announces it. Posts are normally created by
    /// other clients; this exists for seeding and operators.
    pub async fn put_post(&self, mut record: PostRecord) -> Result<String, FeedError> {
        if record.id.is_empty() {
            record.id = generate_document_id();
        }
        let keys = self.posts();
        let payload = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("JSON.SET")
            .arg(keys.document(&record.id))
            .arg("$")
            .arg(payload)
            .ignore()
            .cmd("SADD")
            .arg(keys.index())
            .arg(&record.id)
            .ignore()
            .cmd("PUBLISH")
            .arg(keys.changes_channel())
            .arg(&record.id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        log::debug!("stored post {}", record.id);
        Ok(record.id)
    }

    pub async fn put_comment_bundle(&self, post_id: &str, bundle: &CommentBundle) -> Result<(), FeedError> {
        let payload = serde_json::to_string(bundle)?;
        let mut conn = self.conn.clone();
        let _: () = cmd("JSON.SET")
            .arg(self.bundle_key(post_id))
            .arg("$")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn set_links_document(&self, document: &Map<String, Value>) -> Result<(), FeedError> {
        let payload = serde_json::to_string(document)?;
        let mut conn = self.conn.clone();
        let _: () = cmd("JSON.SET")
            .arg(self.links_key())
            .arg("$")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn mutate(&self, mutation: DocumentMutation) -> Result<(), FeedError> {
        let mut conn = self.conn.clone();
        let reply = execute_mutation(&mut conn, &mutation).await?;
        log::debug!("mutation on {} -> {reply}", mutation.key());
        Ok(())
    }
}

async fn load_snapshot(conn: &mut ConnectionManager, prefix: &str, collection: &str) -> Result<FeedSnapshot, FeedError> {
    let keys = KeyContext::new(prefix, collection);
    let ids: Vec<String> = cmd("SMEMBERS").arg(keys.index()).query_async(conn).await?;
    if ids.is_empty() {
        return Ok(FeedSnapshot::default());
    }

    let document_keys: Vec<String> = ids.iter().map(|id| keys.document(id)).collect();
    let raw: Vec<Option<String>> = cmd("JSON.MGET")
        .arg(&document_keys)
        .arg("$")
        .query_async(conn)
        .await?;

    let mut records = Vec::with_capacity(ids.len());
    for (id, raw) in ids.into_iter().zip(raw) {
        let Some(raw) = raw else {
            log::debug!("post {id} is indexed but has no document");
            continue;
        };
        match decode_post(&id, &raw) {
            Ok(record) => records.push(record),
            Err(err) => log::warn!("skipping undecodable post {id}: {err}"),
        }
    }
    Ok(FeedSnapshot::from_unordered(records))
}

fn decode_post(id: &str, raw: &str) -> Result<PostRecord, serde_json::Error> {
    // JSON.MGET with a `$` path wraps each document in an array.
    let mut wrapped: Vec<PostRecord> = serde_json::from_str(raw)?;
    let mut record = wrapped
        .pop()
        .ok_or_else(|| serde_json::Error::custom("empty JSON.MGET entry"))?;
    record.id = id.to_string();
    Ok(record)
}

impl DocumentStore for RedisStore {
    async fn subscribe(&self) -> Result<FeedSubscription, FeedError> {
        let channel = self.posts().changes_channel();
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&channel).await?;
        log::debug!("subscribed to {channel}");

        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut conn = self.conn.clone();
        let prefix = self.prefix.clone();
        let collection = self.feed.collection.clone();
        let pump = tokio::spawn(async move {
            let mut changes = pubsub.into_on_message();
            loop {
                let delivery = load_snapshot(&mut conn, &prefix, &collection).await;
                let failed = delivery.is_err();
                if sender.send(delivery).await.is_err() || failed {
                    break;
                }
                if changes.next().await.is_none() {
                    let _ = sender
                        .send(Err(FeedError::subscription("change stream closed")))
                        .await;
                    break;
                }
            }
        });
        Ok(FeedSubscription::new(receiver, pump))
    }

    async fn comment_bundle(&self, post_id: &str) -> Result<Option<CommentBundle>, FeedError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = cmd("JSON.GET")
            .arg(self.bundle_key(post_id))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn add_like(&self, post_id: &str, user_id: &str) -> Result<(), FeedError> {
        let keys = self.posts();
        self.mutate(DocumentMutation::ArrayUnion {
            key: keys.document(post_id),
            channel: keys.changes_channel(),
            field: LIKES_FIELD.to_string(),
            values: vec![user_id.to_string()],
        })
        .await
    }

    async fn remove_like(&self, post_id: &str, user_id: &str) -> Result<(), FeedError> {
        let keys = self.posts();
        self.mutate(DocumentMutation::ArrayRemove {
            key: keys.document(post_id),
            channel: keys.changes_channel(),
            field: LIKES_FIELD.to_string(),
            values: vec![user_id.to_string()],
        })
        .await
    }

    async fn append_comment(&self, post_id: &str, author: &str, text: &str) -> Result<(), FeedError> {
        self.mutate(DocumentMutation::AppendComment {
            key: self.bundle_key(post_id),
            author: author.to_string(),
            text: text.to_string(),
        })
        .await
    }

    async fn increment_comment_count(&self, post_id: &str, by: i64) -> Result<(), FeedError> {
        let keys = self.posts();
        self.mutate(DocumentMutation::Increment {
            key: keys.document(post_id),
            channel: keys.changes_channel(),
            field: COMMENT_COUNT_FIELD.to_string(),
            by,
        })
        .await
    }

    async fn links_document(&self) -> Result<Option<Map<String, Value>>, FeedError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = cmd("JSON.GET").arg(self.links_key()).query_async(&mut conn).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_mget_entry() {
        let raw = r#"[{"author":"Gus","category":"Events","dateCreated":"2024-03-05T14:30:00","likes":["u1"]}]"#;
        let record = decode_post("p1", raw).unwrap();
        assert_eq!(record.id, "p1");
        assert_eq!(record.likes, ["u1"]);
    }

    #[test]
    fn rejects_empty_mget_entry() {
        assert!(decode_post("p1", "[]").is_err());
    }
}
