//! Recent search history
//!
//! The server owns the list. The client mirror is only ever replaced by the
//! list a server call returns; it is never merged or trimmed locally.

use crate::client::DirectoryService;
use crate::error::{DiscoveryError, Result};
use crate::lock::lock;
use crate::session::Session;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Session cache key for the mirrored list
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

/// Mirrors the user's last searches, most recent first
pub struct RecentSearchTracker {
    service: Arc<dyn DirectoryService>,
    session: Session,
    mirror: watch::Sender<Vec<String>>,
    /// Email of the user the mirror belongs to
    owner: Mutex<Option<String>>,
}

fn cached_list(session: &Session) -> Vec<String> {
    if session.is_authenticated() {
        session
            .cached::<Vec<String>>(RECENT_SEARCHES_KEY)
            .unwrap_or_default()
    } else {
        Vec::new()
    }
}

impl RecentSearchTracker {
    pub fn new(service: Arc<dyn DirectoryService>, session: Session) -> Self {
        let (mirror, _) = watch::channel(cached_list(&session));
        let owner = Mutex::new(session.user().map(|u| u.email));
        Self {
            service,
            session,
            mirror,
            owner,
        }
    }

    /// Current mirror
    pub fn list(&self) -> Vec<String> {
        self.follow_session();
        self.mirror.borrow().clone()
    }

    /// Most recent entry, the seed for recommendations
    pub fn latest(&self) -> Option<String> {
        self.follow_session();
        self.mirror.borrow().first().cloned()
    }

    /// Observe every replacement of the mirror
    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.follow_session();
        self.mirror.subscribe()
    }

    /// Drop the mirror when the signed-in user is no longer its owner
    fn follow_session(&self) {
        let current = self.session.user().map(|u| u.email);
        let mut owner = lock(&self.owner);
        if *owner != current {
            debug!("Signed-in user changed, recent searches reset");
            *owner = current;
            self.mirror.send_replace(cached_list(&self.session));
        }
    }

    /// Read the list from the server
    ///
    /// Signed-out sessions get an empty list without a request. On failure
    /// the previous mirror stays in place.
    pub async fn load(&self) -> Result<Vec<String>> {
        self.follow_session();
        let Some(user) = self.session.user() else {
            self.replace(Vec::new());
            return Ok(Vec::new());
        };

        match self.service.recent_searches(&user.email).await {
            Ok(list) => {
                debug!(count = list.len(), "Recent searches loaded");
                self.replace_for(&user.email, list.clone());
                Ok(list)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load recent searches");
                Err(e)
            }
        }
    }

    /// Record a search event
    ///
    /// Rejected without a request when signed out or when the query is
    /// blank. Otherwise the trimmed query is appended server-side and the
    /// returned list becomes the mirror verbatim.
    pub async fn submit(&self, query: &str) -> Result<Vec<String>> {
        self.follow_session();
        let user = self.session.require_user()?;
        let query = query.trim();
        if query.is_empty() {
            return Err(DiscoveryError::EmptyQuery);
        }

        match self.service.append_recent_search(&user.email, query).await {
            Ok(list) => {
                info!(query, count = list.len(), "Recent search recorded");
                self.replace_for(&user.email, list.clone());
                Ok(list)
            }
            Err(e) => {
                warn!(query, error = %e, "Failed to record recent search");
                Err(e)
            }
        }
    }

    /// Re-run a previously shown entry as a fresh search
    pub async fn select(&self, entry: &str) -> Result<Vec<String>> {
        self.submit(entry).await
    }

    fn replace(&self, list: Vec<String>) {
        if self.session.is_authenticated() {
            self.session.cache(RECENT_SEARCHES_KEY, &list);
        }
        self.mirror.send_replace(list);
    }

    /// Apply a server answer only if `email` is still the signed-in user
    fn replace_for(&self, email: &str, list: Vec<String>) {
        self.follow_session();
        let owner = lock(&self.owner);
        if owner.as_deref() == Some(email) {
            self.replace(list);
        } else {
            debug!("Signed-in user changed during request, answer dropped");
        }
    }
}
