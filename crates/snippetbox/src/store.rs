//! Snippet records and the store they live in.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use http::StatusCode;
use parking_lot::RwLock;
use snippetbox_web::WebError;
use thiserror::Error;

const LATEST_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no matching record found")]
    NotFound,

    #[error("snippet must expire after a positive number of days, got {days}")]
    InvalidExpiry { days: i32 },

    #[error("snippet store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl From<StoreError> for WebError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => WebError::NotFound,
            StoreError::InvalidExpiry { .. } => WebError::client(StatusCode::BAD_REQUEST),
            StoreError::Unavailable { .. } => WebError::server(e),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// The most recently created snippets that have not expired, newest first.
    async fn latest(&self) -> Result<Vec<Snippet>, StoreError>;

    /// An expired snippet is reported as [`StoreError::NotFound`].
    async fn get(&self, id: i64) -> Result<Snippet, StoreError>;

    /// Stores a new snippet and returns its id.
    async fn insert(&self, title: String, content: String, expires_days: i32) -> Result<i64, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySnippetStore {
    inner: RwLock<Snippets>,
}

#[derive(Debug, Default)]
struct Snippets {
    last_id: i64,
    by_id: BTreeMap<i64, Snippet>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let now = Utc::now();
        let snippets = self.inner.read();

        // ids are handed out in creation order
        Ok(snippets.by_id.values().rev().filter(|snippet| snippet.expires > now).take(LATEST_LIMIT).cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let now = Utc::now();
        self.inner.read().by_id.get(&id).filter(|snippet| snippet.expires > now).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert(&self, title: String, content: String, expires_days: i32) -> Result<i64, StoreError> {
        if expires_days < 1 {
            return Err(StoreError::InvalidExpiry { days: expires_days });
        }

        let created = Utc::now();
        let expires = created + TimeDelta::days(i64::from(expires_days));

        let mut snippets = self.inner.write();
        snippets.last_id += 1;
        let id = snippets.last_id;
        snippets.by_id.insert(id, Snippet { id, title, content, created, expires });

        Ok(id)
    }
}
