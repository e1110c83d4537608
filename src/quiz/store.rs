use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::quiz::Result;

/// Hash of question text to answer text for the active corpus.
pub const QUESTIONS_KEY: &str = "questions";
/// Token rewritten every time the corpus is replaced.
pub const GENERATION_KEY: &str = "questions:generation";

pub fn session_key(user_id: &str) -> String {
    format!("user:{}:question", user_id)
}

pub fn used_key(user_id: &str) -> String {
    format!("user:{}:used", user_id)
}

pub fn used_generation_key(user_id: &str) -> String {
    format!("user:{}:used_generation", user_id)
}

/// Key-value operations the quiz needs. Every call is a single store command,
/// the store's own atomicity is all the synchronisation there is.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;
    /// Drops the hash, writes `entries` in its place and sets `stamp` as one atomic step.
    async fn replace_hash(
        &self,
        key: &str,
        entries: &[(String, String)],
        stamp: (&str, &str),
    ) -> Result<()>;

    async fn sadd(&self, key: &str, member: &str) -> Result<()>;
    async fn smembers(&self, key: &str) -> Result<HashSet<String>>;
}

#[derive(Debug, Default)]
struct MemoryData {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, HashSet<String>>,
}

/// Process-local store, used when no Redis server is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .write()
            .await
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut data = self.data.write().await;
        data.strings.remove(key);
        data.hashes.remove(key);
        data.sets.remove(key);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .read()
            .await
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .data
            .read()
            .await
            .hashes
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_hash(
        &self,
        key: &str,
        entries: &[(String, String)],
        stamp: (&str, &str),
    ) -> Result<()> {
        let (stamp_key, stamp_value) = stamp;
        let mut data = self.data.write().await;
        if entries.is_empty() {
            data.hashes.remove(key);
        } else {
            data.hashes
                .insert(key.to_string(), entries.iter().cloned().collect());
        }
        data.strings
            .insert(stamp_key.to_string(), stamp_value.to_string());
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        self.data
            .write()
            .await
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self
            .data
            .read()
            .await
            .sets
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Redis-backed store shared by every bot process pointing at the same server.
#[derive(Clone)]
pub struct RedisStore {
    connection: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(info: redis::ConnectionInfo) -> Result<Self> {
        let client = redis::Client::open(info)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl QuestionStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let () = conn.set(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let () = conn.del(key).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection.clone();
        let value: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(value)
    }

    async fn replace_hash(
        &self,
        key: &str,
        entries: &[(String, String)],
        stamp: (&str, &str),
    ) -> Result<()> {
        let (stamp_key, stamp_value) = stamp;
        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !entries.is_empty() {
            pipe.hset_multiple(key, entries).ignore();
        }
        pipe.set(stamp_key, stamp_value).ignore();
        let () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let () = conn.sadd(key, member).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        let mut conn = self.connection.clone();
        let members: HashSet<String> = conn.smembers(key).await?;
        Ok(members)
    }
}
