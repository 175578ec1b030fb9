//! Session context and session-scoped key-value storage
//!
//! The session is passed explicitly to every component that needs to know
//! who the user is. Nothing here is global: a `Session` wraps whatever
//! `KeyValueStore` the host application injects.

use crate::error::{DiscoveryError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "authToken";
/// Key holding the signed-in user's email
pub const EMAIL_KEY: &str = "email";

/// Session-scoped string storage
///
/// Implementations must be cheap to call; none of these methods are async.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// In-process store, the default for tests and the CLI
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// An authenticated user as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub email: String,
}

/// Explicit session context
///
/// Cloning shares the same underlying store.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Anonymous session over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Record a token issued by the external auth service
    pub fn login(&self, email: impl Into<String>, token: impl Into<String>) {
        let email = email.into();
        debug!(email = %email, "Session started");
        self.store.set(EMAIL_KEY, email);
        self.store.set(TOKEN_KEY, token.into());
    }

    /// Drop the session and everything cached under it
    pub fn logout(&self) {
        debug!("Session cleared");
        self.store.clear();
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// The current user, present only when both email and token are set
    pub fn user(&self) -> Option<User> {
        let email = self.store.get(EMAIL_KEY).filter(|e| !e.trim().is_empty())?;
        self.token()?;
        Some(User { email })
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Authorization predicate evaluated before every protected operation
    pub fn require_user(&self) -> Result<User> {
        self.user().ok_or(DiscoveryError::RequiresAuth)
    }

    /// Cache a JSON value for the lifetime of the session
    pub fn cache<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.store.set(key, json),
            Err(e) => warn!(key, error = %e, "Failed to cache session value"),
        }
    }

    /// Read back a value stored with [`Session::cache`]
    pub fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed session value");
                self.store.remove(key);
                None
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_session() {
        let session = Session::in_memory();
        assert!(session.user().is_none());
        assert!(matches!(
            session.require_user(),
            Err(DiscoveryError::RequiresAuth)
        ));
    }

    #[test]
    fn test_login_requires_email_and_token() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());

        store.set(EMAIL_KEY, "ana@example.com".into());
        assert!(!session.is_authenticated());

        session.login("ana@example.com", "tok");
        assert_eq!(
            session.require_user().unwrap(),
            User {
                email: "ana@example.com".into()
            }
        );
    }

    #[test]
    fn test_logout_clears_cached_values() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        session.login("ana@example.com", "tok");
        session.cache("recentSearches", &vec!["ml".to_string()]);
        assert_eq!(
            session.cached::<Vec<String>>("recentSearches"),
            Some(vec!["ml".to_string()])
        );

        session.logout();
        assert!(store.is_empty());
        assert!(session.cached::<Vec<String>>("recentSearches").is_none());
    }

    #[test]
    fn test_malformed_cache_entry_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        store.set("savedExperts", "{not json".into());
        assert!(session.cached::<Vec<String>>("savedExperts").is_none());
        assert!(store.get("savedExperts").is_none());
    }
}
