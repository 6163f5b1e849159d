//! Thumbcache-Store: the two cache tiers behind thumbnail lookups.
//!
//! # Modules
//!
//! - `content` - Content-addressed image files under a media directory
//! - `backend` - The [`HashStore`] capability trait with Redis and in-memory
//!   implementations
//! - `metadata` - [`MetadataCache`], pipelined batch get/set of thumbnail
//!   metadata keyed by `video:<id>`
//! - `error` - Store error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thumbcache_common::VideoId;
//! use thumbcache_store::{ContentStore, MemoryStore, MetadataCache};
//!
//! # async fn demo() {
//! let cache = MetadataCache::new(
//!     Arc::new(MemoryStore::new()),
//!     ContentStore::new("/var/lib/thumbcache/media"),
//! );
//!
//! let ids = vec![VideoId::new("abc123").unwrap()];
//! let lookup = cache.get_batch(&ids).await;
//! println!("hits: {}, misses: {}", lookup.hits.len(), lookup.misses.len());
//! # }
//! ```

pub mod backend;
pub mod content;
pub mod error;
pub mod metadata;

pub use backend::{FieldMap, HashStore, MemoryStore, RedisStore};
pub use content::ContentStore;
pub use error::{Error, Result};
pub use metadata::{cache_key, CacheLookup, MetadataCache, KEY_PREFIX};
