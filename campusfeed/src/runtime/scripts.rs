use redis::Script;
use std::sync::LazyLock;

pub const ARRAY_UNION_SCRIPT_BODY: &str = include_str!("../../lua/array_union.lua");
pub const ARRAY_REMOVE_SCRIPT_BODY: &str = include_str!("../../lua/array_remove.lua");
pub const NUMERIC_INCREMENT_SCRIPT_BODY: &str = include_str!("../../lua/numeric_increment.lua");
pub const COMMENT_APPEND_SCRIPT_BODY: &str = include_str!("../../lua/comment_append.lua");

pub static ARRAY_UNION_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(ARRAY_UNION_SCRIPT_BODY));
pub static ARRAY_REMOVE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(ARRAY_REMOVE_SCRIPT_BODY));
pub static NUMERIC_INCREMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(NUMERIC_INCREMENT_SCRIPT_BODY));
pub static COMMENT_APPEND_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(COMMENT_APPEND_SCRIPT_BODY));
