//! Per-client session state.
//!
//! A [`Session`] is loaded by the [`SessionManager`] before an application
//! handler runs and saved after it returns. Handlers read and write it through
//! [`crate::RequestContext::session`]; any write marks it dirty, and only dirty
//! sessions are written back to the [`SessionStore`].

mod manager;
mod store;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

pub use manager::SessionConfig;
pub use manager::SessionManager;
pub use store::MemoryStore;
pub use store::SessionRecord;
pub use store::SessionStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {reason}")]
    Store { reason: String },
}

impl SessionError {
    pub fn store<S: ToString>(reason: S) -> Self {
        Self::Store { reason: reason.to_string() }
    }
}

#[derive(Debug)]
struct SessionState {
    token: String,
    data: HashMap<String, String>,
    expiry: DateTime<Utc>,
    dirty: bool,
    is_new: bool,
}

/// Handle to the session of the current request.
///
/// Clones share the same state, so the manager sees every write a handler
/// makes through its copy.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub(crate) fn fresh(token: String, expiry: DateTime<Utc>) -> Self {
        Self::with_state(SessionState { token, data: HashMap::new(), expiry, dirty: false, is_new: true })
    }

    pub(crate) fn loaded(token: String, record: SessionRecord) -> Self {
        Self::with_state(SessionState { token, data: record.data, expiry: record.expiry, dirty: false, is_new: false })
    }

    fn with_state(state: SessionState) -> Self {
        Self { state: Arc::new(Mutex::new(state)) }
    }

    pub fn token(&self) -> String {
        self.state.lock().token.clone()
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.state.lock().expiry
    }

    /// Whether the session was synthesized for this request rather than loaded.
    pub fn is_new(&self) -> bool {
        self.state.lock().is_new
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state.lock().data.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().data.contains_key(key)
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut state = self.state.lock();
        state.data.insert(key.into(), value.into());
        state.dirty = true;
    }

    /// Removes `key` and returns its value, as used for one-shot flash messages.
    pub fn pop(&self, key: &str) -> Option<String> {
        let mut state = self.state.lock();
        let value = state.data.remove(key);
        if value.is_some() {
            state.dirty = true;
        }
        value
    }

    pub fn remove(&self, key: &str) {
        let mut state = self.state.lock();
        if state.data.remove(key).is_some() {
            state.dirty = true;
        }
    }

    /// Copies out what must be persisted, if anything changed.
    fn dirty_record(&self) -> Option<(String, HashMap<String, String>)> {
        let state = self.state.lock();
        state.dirty.then(|| (state.token.clone(), state.data.clone()))
    }

    fn mark_saved(&self, expiry: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.expiry = expiry;
        state.dirty = false;
        state.is_new = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn session() -> Session {
        Session::fresh("token".into(), Utc::now() + TimeDelta::hours(1))
    }

    #[test]
    fn reads_do_not_dirty() {
        let session = session();
        assert_eq!(session.get("flash"), None);
        assert!(!session.contains("flash"));
        assert_eq!(session.pop("flash"), None);
        session.remove("flash");

        assert!(!session.is_dirty());
        assert!(session.is_new());
    }

    #[test]
    fn writes_dirty() {
        let session = session();
        session.put("flash", "Snippet successfully created!");
        assert!(session.is_dirty());

        let clone = session.clone();
        assert_eq!(clone.pop("flash").as_deref(), Some("Snippet successfully created!"));
        assert!(!session.contains("flash"));
    }
}
