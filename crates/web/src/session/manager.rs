use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use http::{HeaderMap, HeaderValue, header};
use rand::RngCore;
use tracing::debug;

use super::{Session, SessionError, SessionRecord, SessionStore};

/// Cookie and lifetime settings of a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime: Duration,
    /// Adds the `Secure` attribute; only disable for plain-HTTP development.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { cookie_name: "session".to_owned(), lifetime: Duration::from_secs(12 * 60 * 60), secure: true }
    }
}

/// Loads sessions from request cookies and saves them back to a store.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").field("config", &self.config).finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolves the session named by the request cookie.
    ///
    /// A missing, unknown or expired token yields a fresh session with a new
    /// token instead of an error.
    pub async fn load(&self, headers: &HeaderMap) -> Result<Session, SessionError> {
        let now = Utc::now();

        if let Some(token) = cookie_value(headers, &self.config.cookie_name) {
            match self.store.get(token).await? {
                Some(record) if record.expiry > now => return Ok(Session::loaded(token.to_owned(), record)),
                Some(_) => debug!("session expired, issuing a new one"),
                None => debug!("unknown session token, issuing a new one"),
            }
        }

        Ok(Session::fresh(generate_token(), now + self.lifetime()))
    }

    /// Persists `session` if it was modified and returns the `Set-Cookie`
    /// value to send, if any.
    ///
    /// New sessions always get a cookie, saved ones get a refreshed cookie, and
    /// unmodified loaded sessions need neither a write nor a cookie.
    pub async fn save(&self, session: &Session) -> Result<Option<HeaderValue>, SessionError> {
        if let Some((token, data)) = session.dirty_record() {
            let expiry = Utc::now() + self.lifetime();
            self.store.put(&token, SessionRecord { data, expiry }).await?;
            session.mark_saved(expiry);
            return self.cookie(&token, expiry).map(Some);
        }

        if session.is_new() {
            return self.cookie(&session.token(), session.expiry()).map(Some);
        }

        Ok(None)
    }

    fn lifetime(&self) -> TimeDelta {
        TimeDelta::from_std(self.config.lifetime).unwrap_or_else(|_| TimeDelta::weeks(52))
    }

    fn cookie(&self, token: &str, expiry: DateTime<Utc>) -> Result<HeaderValue, SessionError> {
        let max_age = (expiry - Utc::now()).num_seconds().max(0);
        let mut cookie = format!(
            "{}={token}; Path=/; Expires={}; Max-Age={max_age}; HttpOnly; SameSite=Lax",
            self.config.cookie_name,
            expiry.format("%a, %d %b %Y %H:%M:%S GMT"),
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie).map_err(SessionError::store)
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;

    fn manager(store: Arc<MemoryStore>) -> SessionManager {
        SessionManager::new(store, SessionConfig::default())
    }

    fn request_headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn token_of(cookie: &HeaderValue) -> String {
        let value = cookie.to_str().unwrap();
        value.split(';').next().unwrap().trim_start_matches("session=").to_owned()
    }

    #[tokio::test]
    async fn new_session_gets_cookie_without_store_write() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(Arc::clone(&store));

        let session = manager.load(&HeaderMap::new()).await.unwrap();
        assert!(session.is_new());
        assert_eq!(session.token().len(), 43);

        let cookie = manager.save(&session).await.unwrap().unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("session={}; Path=/; Expires=", session.token())));
        assert!(cookie.contains("; Max-Age=43"));
        assert!(cookie.contains("; HttpOnly; SameSite=Lax; Secure"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn dirty_session_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(Arc::clone(&store));

        let session = manager.load(&HeaderMap::new()).await.unwrap();
        session.put("flash", "Snippet successfully created!");
        let cookie = manager.save(&session).await.unwrap().unwrap();
        assert_eq!(store.len(), 1);

        let headers = request_headers(&format!("theme=dark; session={}", token_of(&cookie)));
        let reloaded = manager.load(&headers).await.unwrap();
        assert!(!reloaded.is_new());
        assert_eq!(reloaded.pop("flash").as_deref(), Some("Snippet successfully created!"));

        // popping dirtied the session, the store now holds the emptied data
        assert!(manager.save(&reloaded).await.unwrap().is_some());
        let record = store.get(&reloaded.token()).await.unwrap().unwrap();
        assert!(record.data.is_empty());
    }

    #[tokio::test]
    async fn saving_a_modified_loaded_session_extends_its_expiry() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(Arc::clone(&store));
        let lifetime = TimeDelta::hours(12);
        let soon = Utc::now() + TimeDelta::minutes(1);
        store.put("known", SessionRecord { data: Default::default(), expiry: soon }).await.unwrap();

        let session = manager.load(&request_headers("session=known")).await.unwrap();
        session.put("theme", "dark");
        let cookie = manager.save(&session).await.unwrap().unwrap();

        let expiry = store.get("known").await.unwrap().unwrap().expiry;
        let drift = (Utc::now() + lifetime - expiry).num_seconds();
        assert!((0..5).contains(&drift), "expiry off by {drift}s");

        let max_age = cookie
            .to_str()
            .unwrap()
            .split("; ")
            .find_map(|attr| attr.strip_prefix("Max-Age="))
            .unwrap()
            .parse::<i64>()
            .unwrap();
        assert!((lifetime.num_seconds() - 5..=lifetime.num_seconds()).contains(&max_age), "Max-Age={max_age}");
        assert_eq!(token_of(&cookie), "known");
    }

    #[tokio::test]
    async fn untouched_loaded_session_is_not_saved() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(Arc::clone(&store));
        let expiry = Utc::now() + TimeDelta::hours(1);
        store.put("known", SessionRecord { data: Default::default(), expiry }).await.unwrap();

        let session = manager.load(&request_headers("session=known")).await.unwrap();
        assert_eq!(session.token(), "known");
        assert!(manager.save(&session).await.unwrap().is_none());
        assert_eq!(store.get("known").await.unwrap().unwrap().expiry, expiry);
    }

    #[tokio::test]
    async fn expired_or_unknown_token_gets_fresh_session() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(Arc::clone(&store));
        let expired = SessionRecord { data: Default::default(), expiry: Utc::now() - TimeDelta::seconds(1) };
        store.put("stale", expired).await.unwrap();

        let session = manager.load(&request_headers("session=stale")).await.unwrap();
        assert!(session.is_new());
        assert_ne!(session.token(), "stale");

        let session = manager.load(&request_headers("session=forged")).await.unwrap();
        assert!(session.is_new());
        assert_ne!(session.token(), "forged");
    }

    #[tokio::test]
    async fn concurrent_clients_never_share_data() {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(manager(Arc::clone(&store)));

        let tasks = (0..16)
            .map(|client| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    let session = manager.load(&HeaderMap::new()).await.unwrap();
                    session.put("client", client.to_string());
                    let cookie = manager.save(&session).await.unwrap().unwrap();

                    let reloaded = manager.load(&request_headers(cookie.to_str().unwrap())).await.unwrap();
                    (client, reloaded.get("client"))
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let (client, seen) = task.await.unwrap();
            assert_eq!(seen, Some(client.to_string()));
        }
        assert_eq!(store.len(), 16);
    }

    #[test]
    fn insecure_cookie_drops_secure_attribute() {
        let config = SessionConfig { secure: false, ..SessionConfig::default() };
        let manager = SessionManager::new(Arc::new(MemoryStore::new()), config);

        let cookie = manager.cookie("abc", Utc::now() + TimeDelta::hours(1)).unwrap();
        assert!(!cookie.to_str().unwrap().contains("Secure"));
    }
}
