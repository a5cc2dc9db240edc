//! Thread store - checkpoint persistence
//!
//! A checkpoint is written whenever a turn suspends for a decision and
//! whenever a turn completes, so a restarted process can resume any
//! thread from its last stable state. Store failures are fatal to the
//! turn and surface as `Error::Persistence`.

use crate::error::{Error, Result};
use crate::thread::ThreadContext;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Persistence backend for thread checkpoints.
#[async_trait::async_trait]
pub trait ThreadStore: Send + Sync {
    /// Load a thread by ID.
    async fn get(&self, thread_id: &str) -> Result<Option<ThreadContext>>;

    /// Save a thread checkpoint.
    async fn save(&self, context: &ThreadContext) -> Result<()>;

    /// Delete a thread.
    async fn delete(&self, thread_id: &str) -> Result<bool>;

    /// Check whether a thread exists.
    async fn exists(&self, thread_id: &str) -> Result<bool>;

    /// List all thread IDs.
    async fn list_threads(&self) -> Result<Vec<String>>;

    /// Number of stored threads.
    async fn count(&self) -> Result<usize> {
        Ok(self.list_threads().await?.len())
    }
}

/// In-memory thread store for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryThreadStore {
    threads: RwLock<HashMap<String, ThreadContext>>,
}

impl MemoryThreadStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn get(&self, thread_id: &str) -> Result<Option<ThreadContext>> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, context: &ThreadContext) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(context.thread_id.clone(), context.clone());
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        Ok(self.threads.write().await.remove(thread_id).is_some())
    }

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        Ok(self.threads.read().await.contains_key(thread_id))
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Redis-backed thread store.
///
/// Checkpoints are stored as JSON under `midas:thread:{thread_id}` with a
/// sliding TTL refreshed on every save.
pub struct RedisThreadStore {
    client: redis::Client,
    prefix: String,
    ttl_seconds: u64,
}

impl RedisThreadStore {
    /// Default key prefix.
    pub const DEFAULT_PREFIX: &'static str = "midas:thread:";

    /// Default checkpoint TTL: 7 days.
    pub const DEFAULT_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

    /// Create a store from a Redis URL.
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Persistence(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            prefix: Self::DEFAULT_PREFIX.to_string(),
            ttl_seconds: Self::DEFAULT_TTL_SECONDS,
        })
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the checkpoint TTL in seconds.
    #[must_use]
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    fn key(&self, thread_id: &str) -> String {
        format!("{}{}", self.prefix, thread_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Persistence(format!("redis connection failed: {e}")))
    }
}

#[async_trait::async_trait]
impl ThreadStore for RedisThreadStore {
    async fn get(&self, thread_id: &str) -> Result<Option<ThreadContext>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(thread_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Persistence(format!("redis GET failed: {e}")))?;

        match raw {
            Some(json) => {
                let context = serde_json::from_str(&json)
                    .map_err(|e| Error::Persistence(format!("corrupt checkpoint: {e}")))?;
                Ok(Some(context))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, context: &ThreadContext) -> Result<()> {
        let json = serde_json::to_string(context)
            .map_err(|e| Error::Persistence(format!("checkpoint serialization failed: {e}")))?;

        let mut conn = self.connection().await?;
        redis::cmd("SETEX")
            .arg(self.key(&context.thread_id))
            .arg(self.ttl_seconds)
            .arg(json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Persistence(format!("redis SETEX failed: {e}")))?;

        debug!(thread_id = %context.thread_id, messages = context.message_count(), "Saved thread checkpoint");
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL")
            .arg(self.key(thread_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Persistence(format!("redis DEL failed: {e}")))?;
        Ok(removed > 0)
    }

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let found: bool = redis::cmd("EXISTS")
            .arg(self.key(thread_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Persistence(format!("redis EXISTS failed: {e}")))?;
        Ok(found)
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}*", self.prefix))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Persistence(format!("redis KEYS failed: {e}")))?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }
}
