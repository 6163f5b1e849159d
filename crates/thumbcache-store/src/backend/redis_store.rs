//! Redis backend.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::{FieldMap, HashStore};
use crate::error::Result;

/// [`HashStore`] over a Redis connection.
///
/// Wraps a [`ConnectionManager`], which multiplexes one connection and
/// reconnects on failure; clones are cheap and share that connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl HashStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get_hashes(&self, keys: &[String]) -> Result<Vec<FieldMap>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.hgetall(key);
        }

        let mut conn = self.conn.clone();
        let rows: Vec<FieldMap> = pipe.query_async(&mut conn).await?;
        debug!(keys = keys.len(), "Redis HGETALL pipeline executed");
        Ok(rows)
    }

    async fn set_hashes(&self, entries: &[(String, Vec<(String, String)>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for (key, fields) in entries {
            pipe.hset_multiple(key, fields.as_slice()).ignore();
        }

        let mut conn = self.conn.clone();
        let () = pipe.query_async(&mut conn).await?;
        debug!(keys = entries.len(), "Redis HSET pipeline executed");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
