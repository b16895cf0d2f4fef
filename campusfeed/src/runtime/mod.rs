//! Atomic document mutations executed as Lua scripts against RedisJSON.

mod executor;
pub mod scripts;

pub use executor::{DocumentMutation, execute_mutation};
