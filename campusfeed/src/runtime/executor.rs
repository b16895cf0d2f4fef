use std::borrow::Cow;

use redis::{Script, aio::ConnectionLike};
use serde_json::Value;

use crate::{
    errors::FeedError,
    runtime::scripts::{ARRAY_REMOVE_SCRIPT, ARRAY_UNION_SCRIPT, COMMENT_APPEND_SCRIPT, NUMERIC_INCREMENT_SCRIPT},
};

/// One remote mutation of a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentMutation {
    /// Set-add of `values` to the array field; announces the change on `channel`.
    ArrayUnion {
        key: String,
        channel: String,
        field: String,
        values: Vec<String>,
    },
    /// Set-remove of `values` from the array field.
    ArrayRemove {
        key: String,
        channel: String,
        field: String,
        values: Vec<String>,
    },
    /// Numeric add on a counter field.
    Increment {
        key: String,
        channel: String,
        field: String,
        by: i64,
    },
    /// Pairwise union-append to a comment bundle. Not announced.
    AppendComment { key: String, author: String, text: String },
}

impl DocumentMutation {
    fn script(&self) -> &'static Script {
        match self {
            DocumentMutation::ArrayUnion { .. } => &*ARRAY_UNION_SCRIPT,
            DocumentMutation::ArrayRemove { .. } => &*ARRAY_REMOVE_SCRIPT,
            DocumentMutation::Increment { .. } => &*NUMERIC_INCREMENT_SCRIPT,
            DocumentMutation::AppendComment { .. } => &*COMMENT_APPEND_SCRIPT,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            DocumentMutation::ArrayUnion { key, .. }
            | DocumentMutation::ArrayRemove { key, .. }
            | DocumentMutation::Increment { key, .. }
            | DocumentMutation::AppendComment { key, .. } => key,
        }
    }

    fn keys_and_args(&self) -> (Vec<&str>, Vec<String>) {
        match self {
            DocumentMutation::ArrayUnion {
                key,
                channel,
                field,
                values,
            }
            | DocumentMutation::ArrayRemove {
                key,
                channel,
                field,
                values,
            } => {
                let mut args = Vec::with_capacity(values.len() + 1);
                args.push(field.clone());
                args.extend(values.iter().cloned());
                (vec![key.as_str(), channel.as_str()], args)
            }
            DocumentMutation::Increment {
                key,
                channel,
                field,
                by,
            } => (vec![key.as_str(), channel.as_str()], vec![field.clone(), by.to_string()]),
            DocumentMutation::AppendComment { key, author, text } => {
                (vec![key.as_str()], vec![author.clone(), text.clone()])
            }
        }
    }
}

/// Runs `mutation` and returns the script's JSON reply.
pub async fn execute_mutation<C>(conn: &mut C, mutation: &DocumentMutation) -> Result<Value, FeedError>
where
    C: ConnectionLike + Send,
{
    let (keys, args) = mutation.keys_and_args();
    let mut invocation = mutation.script().prepare_invoke();
    for key in &keys {
        invocation.key(*key);
    }
    for arg in &args {
        invocation.arg(arg.as_str());
    }

    let raw: String = invocation.invoke_async(conn).await?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| FeedError::Other {
        message: Cow::Owned(format!("failed to parse lua response: {err}")),
    })?;
    check_reply(mutation.key(), value)
}

fn check_reply(key: &str, value: Value) -> Result<Value, FeedError> {
    match value.get("error") {
        None => Ok(value),
        Some(Value::String(code)) if code == "document_not_found" => Err(FeedError::not_found(key)),
        Some(Value::String(code)) => Err(FeedError::Other {
            message: Cow::Owned(code.clone()),
        }),
        Some(_) => Err(FeedError::Other {
            message: Cow::Borrowed("lua_error"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn union_args_lead_with_field() {
        let mutation = DocumentMutation::ArrayUnion {
            key: "campus:social:p1".to_string(),
            channel: "campus:social:_changes".to_string(),
            field: "likes".to_string(),
            values: vec!["u1".to_string()],
        };
        let (keys, args) = mutation.keys_and_args();
        assert_eq!(keys, ["campus:social:p1", "campus:social:_changes"]);
        assert_eq!(args, ["likes", "u1"]);
    }

    #[test]
    fn increment_args_carry_amount() {
        let mutation = DocumentMutation::Increment {
            key: "k".to_string(),
            channel: "c".to_string(),
            field: "comments".to_string(),
            by: 1,
        };
        assert_eq!(mutation.keys_and_args().1, ["comments", "1"]);
    }

    #[test]
    fn reply_errors_map_to_feed_errors() {
        let ok = check_reply("k", json!({ "ok": true, "added": 1 })).unwrap();
        assert_eq!(ok["added"], 1);

        let missing = check_reply("campus:social:p9", json!({ "error": "document_not_found" })).unwrap_err();
        assert!(matches!(missing, FeedError::NotFound { path } if path == "campus:social:p9"));

        let other = check_reply("k", json!({ "error": "boom" })).unwrap_err();
        assert_eq!(other.to_string(), "boom");
    }
}
