use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use super::SessionError;

/// What a store keeps for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub data: HashMap<String, String>,
    pub expiry: DateTime<Utc>,
}

/// Persistence for sessions, keyed by token.
///
/// Implementations must tolerate concurrent calls for distinct tokens and are
/// responsible for eventually destroying expired records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, SessionError>;

    async fn put(&self, token: &str, record: SessionRecord) -> Result<(), SessionError>;

    async fn delete(&self, token: &str) -> Result<(), SessionError>;
}

/// In-process [`SessionStore`] backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, SessionRecord>>,
    cleanup: Option<JoinHandle<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that sweeps expired records every `interval`.
    ///
    /// Must be called from within a tokio runtime. The sweeper stops when the
    /// store is dropped.
    pub fn with_cleanup_interval(interval: Duration) -> Self {
        let records = Arc::new(DashMap::new());
        let cleanup = tokio::spawn(sweep(Arc::clone(&records), interval));
        Self { records, cleanup: Some(cleanup) }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

async fn sweep(records: Arc<DashMap<String, SessionRecord>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let now = Utc::now();
        let before = records.len();
        records.retain(|_, record| record.expiry > now);
        debug!(removed = before.saturating_sub(records.len()), "swept expired sessions");
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.abort();
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        let now = Utc::now();
        let record = self.records.get(token).map(|entry| entry.value().clone());

        match record {
            Some(record) if record.expiry > now => Ok(Some(record)),
            Some(_) => {
                self.records.remove_if(token, |_, record| record.expiry <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, token: &str, record: SessionRecord) -> Result<(), SessionError> {
        self.records.insert(token.to_owned(), record);
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        self.records.remove(token);
        Ok(())
    }
}
