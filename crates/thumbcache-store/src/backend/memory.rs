//! In-process backend.
//!
//! Used for local runs without Redis and as the test double for the metadata
//! tier. It counts pipeline round trips and can be switched offline to
//! simulate a backend outage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{FieldMap, HashStore};
use crate::error::{Error, Result};

/// [`HashStore`] backed by a concurrent in-memory map.
#[derive(Debug)]
pub struct MemoryStore {
    hashes: DashMap<String, FieldMap>,
    available: AtomicBool,
    round_trips: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            hashes: DashMap::new(),
            available: AtomicBool::new(true),
            round_trips: AtomicUsize::new(0),
        }
    }

    /// Take the store offline (`false`) or bring it back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of pipelines executed so far, failed ones included.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Snapshot of one stored hash.
    pub fn hash(&self, key: &str) -> Option<FieldMap> {
        self.hashes.get(key).map(|entry| entry.value().clone())
    }

    /// Replace a stored hash wholesale, bypassing round-trip accounting.
    pub fn put_hash(&self, key: impl Into<String>, fields: FieldMap) {
        self.hashes.insert(key.into(), fields);
    }

    /// Delete a stored hash.
    pub fn remove(&self, key: &str) {
        self.hashes.remove(key);
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    fn begin_round_trip(&self) -> Result<()> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::unavailable("memory store is offline"))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HashStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_hashes(&self, keys: &[String]) -> Result<Vec<FieldMap>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.begin_round_trip()?;

        Ok(keys
            .iter()
            .map(|key| self.hash(key).unwrap_or_default())
            .collect())
    }

    async fn set_hashes(&self, entries: &[(String, Vec<(String, String)>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.begin_round_trip()?;

        for (key, fields) in entries {
            let mut hash = self.hashes.entry(key.clone()).or_default();
            for (field, value) in fields {
                hash.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::unavailable("memory store is offline"))
        }
    }
}
