//! In-process session store backed by Moka.
//!
//! Sessions only carry the CSRF secret, so they live in memory. The cache is
//! bounded and idle entries are evicted, so clients that never send the
//! cookie back cannot grow it without limit.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tower_sessions::SessionStore;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::Result;

/// Idle session lifetime (24 hours).
pub const SESSION_IDLE_SECS: u64 = 24 * 60 * 60;

/// Maximum number of sessions held at once.
pub const SESSION_MAX_CAPACITY: u64 = 100_000;

/// Bounded session store with idle expiry.
#[derive(Clone)]
pub struct MokaSessionStore {
    cache: Cache<Id, Record>,
}

impl MokaSessionStore {
    /// Create a store holding at most `max_capacity` sessions, each evicted
    /// after `idle` without access.
    pub fn new(max_capacity: u64, idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(idle)
            .build();

        Self { cache }
    }

    /// Approximate number of stored sessions.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MokaSessionStore {
    fn default() -> Self {
        Self::new(SESSION_MAX_CAPACITY, Duration::from_secs(SESSION_IDLE_SECS))
    }
}

impl std::fmt::Debug for MokaSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaSessionStore")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn create(&self, record: &mut Record) -> Result<()> {
        while self.cache.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> Result<()> {
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> Result<Option<Record>> {
        let Some(record) = self.cache.get(session_id).await else {
            return Ok(None);
        };

        if record.expiry_date <= OffsetDateTime::now_utc() {
            self.cache.invalidate(session_id).await;
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn delete(&self, session_id: &Id) -> Result<()> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tower_sessions::cookie::time::Duration as TimeDuration;

    fn record(expires_in: TimeDuration) -> Record {
        Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = MokaSessionStore::default();
        let mut rec = record(TimeDuration::hours(1));
        rec.data.insert("csrf_token".to_string(), serde_json::json!("abc"));

        store.create(&mut rec).await.unwrap();
        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.get("csrf_token"), Some(&serde_json::json!("abc")));

        store.delete(&rec.id).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_not_loaded() {
        let store = MokaSessionStore::default();
        let mut rec = record(TimeDuration::seconds(-1));
        store.create(&mut rec).await.unwrap();

        assert!(store.load(&rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_avoids_id_collision() {
        let store = MokaSessionStore::default();
        let mut first = record(TimeDuration::hours(1));
        store.create(&mut first).await.unwrap();

        let mut second = record(TimeDuration::hours(1));
        second.id = first.id;
        store.create(&mut second).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let store = MokaSessionStore::new(8, Duration::from_secs(60));
        for _ in 0..200 {
            store.create(&mut record(TimeDuration::hours(1))).await.unwrap();
        }
        store.run_pending_tasks().await;

        assert!(store.entry_count() <= 8, "{} sessions kept", store.entry_count());
    }

    #[tokio::test]
    async fn test_idle_sessions_evicted() {
        let store = MokaSessionStore::new(100, Duration::from_millis(50));
        let mut rec = record(TimeDuration::hours(1));
        store.create(&mut rec).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        store.run_pending_tasks().await;

        assert!(store.load(&rec.id).await.unwrap().is_none());
        assert_eq!(store.entry_count(), 0);
    }
}
