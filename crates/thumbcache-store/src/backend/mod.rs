//! Key/value backends for the metadata tier.
//!
//! [`HashStore`] is the capability the metadata cache needs: pipelined
//! hash reads and writes, each batch costing exactly one round trip. Records
//! are shaped into field maps by [`MetadataCache`](crate::MetadataCache), so
//! backends never see thumbnail types.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Field/value pairs of one stored hash.
pub type FieldMap = HashMap<String, String>;

/// Pipelined hash access to a key/value store.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Short, lowercase backend name for logs (e.g. `"redis"`).
    fn name(&self) -> &'static str;

    /// Fetch every hash in `keys` in a single round trip.
    ///
    /// Returns one map per key, in key order. Absent keys yield an empty
    /// map. An error means the whole pipeline failed.
    async fn get_hashes(&self, keys: &[String]) -> Result<Vec<FieldMap>>;

    /// Write every `(key, fields)` entry in a single round trip.
    ///
    /// Fields are set with hash-set semantics: listed fields are replaced,
    /// the key is created when missing.
    async fn set_hashes(&self, entries: &[(String, Vec<(String, String)>)]) -> Result<()>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
