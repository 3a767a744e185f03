use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::session::{SessionData, SessionRecord},
};

/// connect-pg-simple compatible layout, minus the json column type.
const SESSIONS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_sessions (
    sid    UUID PRIMARY KEY,
    sess   TEXT NOT NULL,
    expire TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_user_sessions_expire ON user_sessions (expire);
"#;

/// Server-side session storage keyed by the cookie token.
///
/// `load` never returns a record whose expiry has passed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a live session.
    async fn load(&self, id: &Uuid) -> Result<Option<SessionRecord>>;

    /// Inserts or replaces a session.
    async fn save(&self, id: &Uuid, record: &SessionRecord) -> Result<()>;

    /// Removes a session.
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Removes every expired session and returns how many were dropped.
    async fn purge_expired(&self) -> Result<u64>;
}

fn encode(data: &SessionData) -> Result<String> {
    sonic_rs::to_string(data)
        .map_err(|e| AppError::Session(format!("Session serialization failed: {}", e)))
}

/// Corrupt payloads are treated as absent sessions.
fn decode(id: &Uuid, json: &str) -> Option<SessionData> {
    match sonic_rs::from_str(json) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!("❌ Invalid session JSON for {}: {}", id, e);
            None
        }
    }
}

/// Process-local session store for development.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionRecord>>>,
}

impl MemorySessionStore {
    /// Creates a new, empty `MemorySessionStore`.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &Uuid) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .filter(|record| !record.is_expired(Utc::now()))
            .cloned())
    }

    async fn save(&self, id: &Uuid, record: &SessionRecord) -> Result<()> {
        self.sessions.write().await.insert(*id, record.clone());
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

/// Session store backed by the `user_sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: Pool,
}

impl PgSessionStore {
    /// Creates a new `PgSessionStore`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the `user_sessions` table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.batch_execute(SESSIONS_SCHEMA).await?;
        tracing::info!("✅ user_sessions table ready");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: &Uuid) -> Result<Option<SessionRecord>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("SELECT sess, expire FROM user_sessions WHERE sid = $1 AND expire > NOW()")
            .await?;
        let Some(row) = client.query_opt(&statement, &[id]).await? else {
            return Ok(None);
        };

        let json: String = row
            .try_get("sess")
            .map_err(|_| AppError::MissingData("sess".to_string()))?;
        let expires_at: DateTime<Utc> = row
            .try_get("expire")
            .map_err(|_| AppError::MissingData("expire".to_string()))?;

        Ok(decode(id, &json).map(|data| SessionRecord { data, expires_at }))
    }

    async fn save(&self, id: &Uuid, record: &SessionRecord) -> Result<()> {
        let json = encode(&record.data)?;
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO user_sessions (sid, sess, expire)
                VALUES ($1, $2, $3)
                ON CONFLICT (sid) DO UPDATE SET sess = EXCLUDED.sess, expire = EXCLUDED.expire
                "#,
            )
            .await?;
        client
            .execute(&statement, &[id, &json, &record.expires_at])
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("DELETE FROM user_sessions WHERE sid = $1")
            .await?;
        client.execute(&statement, &[id]).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("DELETE FROM user_sessions WHERE expire <= NOW()")
            .await?;
        Ok(client.execute(&statement, &[]).await?)
    }
}

/// Session store backed by Redis keys with native expiry.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    /// Connects a new `RedisSessionStore`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    fn key(id: &Uuid) -> String {
        format!("session:{}", id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &Uuid) -> Result<Option<SessionRecord>> {
        let mut redis = self.redis.clone();
        let key = Self::key(id);
        let json: Option<String> = redis.get(&key).await?;
        let Some(json) = json else {
            return Ok(None);
        };

        let ttl: i64 = redis.ttl(&key).await?;
        if ttl <= 0 {
            return Ok(None);
        }

        let expires_at = Utc::now() + chrono::Duration::seconds(ttl);
        Ok(decode(id, &json).map(|data| SessionRecord { data, expires_at }))
    }

    async fn save(&self, id: &Uuid, record: &SessionRecord) -> Result<()> {
        let json = encode(&record.data)?;
        let remaining = (record.expires_at - Utc::now()).num_seconds().max(1) as u64;
        let mut redis = self.redis.clone();
        let _: () = redis.set_ex(Self::key(id), json, remaining).await?;
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(Self::key(id)).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        // Redis drops expired keys on its own.
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::FlashKind;
    use chrono::Duration;

    fn record_expiring_in(seconds: i64) -> SessionRecord {
        let mut data = SessionData::default();
        data.flash.set(FlashKind::Success, "saved".to_string());
        SessionRecord {
            data,
            expires_at: Utc::now() + Duration::seconds(seconds),
        }
    }

    #[tokio::test]
    async fn memory_store_round_trips_live_sessions() {
        let store = MemorySessionStore::new();
        let id = Uuid::new_v4();
        let record = record_expiring_in(60);

        store.save(&id, &record).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn memory_store_hides_expired_sessions() {
        let store = MemorySessionStore::new();
        let id = Uuid::new_v4();

        store.save(&id, &record_expiring_in(-1)).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_purges_only_expired_sessions() {
        let store = MemorySessionStore::new();
        let live = Uuid::new_v4();
        let stale = Uuid::new_v4();
        store.save(&live, &record_expiring_in(60)).await.unwrap();
        store.save(&stale, &record_expiring_in(-60)).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.load(&live).await.unwrap().is_some());
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn memory_store_delete_is_idempotent() {
        let store = MemorySessionStore::new();
        let id = Uuid::new_v4();
        store.save(&id, &record_expiring_in(60)).await.unwrap();

        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    #[test]
    fn corrupt_payloads_decode_to_nothing() {
        assert_eq!(decode(&Uuid::new_v4(), "{not json"), None);
    }
}
