//! Saved experts
//!
//! [`BookmarkSynchronizer`] mirrors the server's saved-id set and serializes
//! toggles per expert id: a toggle issued while the same id is in flight is
//! ignored. The mirror only changes once the server acknowledges.
//!
//! [`SavedExpertsView`] is the rendered saved list. A removed entry stays
//! visible, marked as removing, for a short grace interval before it leaves.

use crate::client::DirectoryService;
use crate::error::Result;
use crate::lock::lock;
use crate::notify::NotificationCenter;
use crate::session::Session;
use crate::types::{Expert, ExpertId};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session cache key for the mirrored saved-id set
pub const SAVED_EXPERTS_KEY: &str = "savedExperts";

pub const SAVED_MESSAGE: &str = "Expert saved successfully.";
pub const REMOVED_MESSAGE: &str = "Expert removed from saved.";

/// Per-id view of the bookmark state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavedExpertState {
    /// Never confirmed by the server in this session
    Idle,
    /// A save or remove request is in flight
    Pending,
    ConfirmedSaved,
    ConfirmedUnsaved,
}

/// Result of a [`BookmarkSynchronizer::toggle`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// No session; nothing was sent
    RequiresAuth,
    /// The id already had a request in flight
    Ignored,
    Saved,
    Removed,
    /// The request failed; the message was also published as a notification
    Failed { message: String },
}

#[derive(Default)]
struct Ledger {
    /// Email of the user this ledger mirrors
    owner: Option<String>,
    saved: HashSet<ExpertId>,
    pending: HashSet<ExpertId>,
    /// Ids with at least one acknowledged toggle
    confirmed: HashSet<ExpertId>,
    /// Whether the full set has been read from the server
    loaded: bool,
    /// Bumped on every acknowledged toggle
    version: u64,
}

impl Ledger {
    /// Fresh ledger for whoever is signed in, seeded from the session cache
    fn for_session(session: &Session) -> Self {
        let Some(user) = session.user() else {
            return Self::default();
        };
        let saved = session
            .cached::<Vec<ExpertId>>(SAVED_EXPERTS_KEY)
            .unwrap_or_default()
            .into_iter()
            .collect();
        Self {
            owner: Some(user.email),
            saved,
            ..Self::default()
        }
    }

    fn owned_by(&self, email: &str) -> bool {
        self.owner.as_deref() == Some(email)
    }
}

/// Clears the pending flag however the toggle ends, including cancellation
struct PendingGuard<'a> {
    ledger: &'a Mutex<Ledger>,
    id: ExpertId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.ledger).pending.remove(&self.id);
    }
}

pub struct BookmarkSynchronizer {
    service: Arc<dyn DirectoryService>,
    session: Session,
    notifications: NotificationCenter,
    ledger: Mutex<Ledger>,
}

impl BookmarkSynchronizer {
    pub fn new(
        service: Arc<dyn DirectoryService>,
        session: Session,
        notifications: NotificationCenter,
    ) -> Self {
        Self {
            ledger: Mutex::new(Ledger::for_session(&session)),
            service,
            session,
            notifications,
        }
    }

    /// Lock the ledger, starting over if the signed-in user changed
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        let current = self.session.user().map(|u| u.email);
        let mut ledger = lock(&self.ledger);
        if ledger.owner != current {
            debug!("Signed-in user changed, saved mirror reset");
            *ledger = Ledger::for_session(&self.session);
        }
        ledger
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Replace the mirror with the server's saved-id set
    ///
    /// A toggle acknowledged while the read was in flight wins over the
    /// read; the mirror is then left untouched.
    pub async fn load(&self) -> Result<Vec<ExpertId>> {
        let Some(user) = self.session.user() else {
            *self.ledger() = Ledger::default();
            return Ok(Vec::new());
        };

        let version = self.ledger().version;
        let ids = match self.service.saved_experts(&user.email).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to load saved experts");
                return Err(e);
            }
        };

        let applied = {
            let mut ledger = self.ledger();
            if ledger.owned_by(&user.email) && ledger.version == version {
                ledger.saved = ids.iter().cloned().collect();
                ledger.loaded = true;
                true
            } else {
                false
            }
        };
        if applied {
            debug!(count = ids.len(), "Saved experts loaded");
            self.persist();
            Ok(ids)
        } else {
            debug!("Saved experts changed during load, keeping local mirror");
            Ok(self.saved_ids())
        }
    }

    pub fn is_saved(&self, id: &ExpertId) -> bool {
        self.ledger().saved.contains(id)
    }

    pub fn is_pending(&self, id: &ExpertId) -> bool {
        self.ledger().pending.contains(id)
    }

    pub fn state(&self, id: &ExpertId) -> SavedExpertState {
        let ledger = self.ledger();
        if ledger.pending.contains(id) {
            SavedExpertState::Pending
        } else if ledger.saved.contains(id) {
            SavedExpertState::ConfirmedSaved
        } else if ledger.loaded || ledger.confirmed.contains(id) {
            SavedExpertState::ConfirmedUnsaved
        } else {
            SavedExpertState::Idle
        }
    }

    /// The mirrored saved-id set, sorted
    pub fn saved_ids(&self) -> Vec<ExpertId> {
        let mut ids: Vec<_> = self.ledger().saved.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Save the expert if unsaved, remove it if saved
    pub async fn toggle(&self, id: &ExpertId) -> ToggleOutcome {
        let Some(user) = self.session.user() else {
            debug!(expert_id = %id, "Toggle rejected, no session");
            return ToggleOutcome::RequiresAuth;
        };

        let was_saved = {
            let mut ledger = self.ledger();
            if !ledger.pending.insert(id.clone()) {
                debug!(expert_id = %id, "Toggle ignored, request in flight");
                return ToggleOutcome::Ignored;
            }
            ledger.saved.contains(id)
        };
        let _pending = PendingGuard {
            ledger: &self.ledger,
            id: id.clone(),
        };

        let result = if was_saved {
            self.service.remove_saved_expert(&user.email, id).await
        } else {
            self.service.save_expert(&user.email, id).await
        };

        match result {
            Ok(()) => {
                let applied = {
                    let mut ledger = self.ledger();
                    if ledger.owned_by(&user.email) {
                        if was_saved {
                            ledger.saved.remove(id);
                        } else {
                            ledger.saved.insert(id.clone());
                        }
                        ledger.confirmed.insert(id.clone());
                        ledger.version += 1;
                    }
                    ledger.owned_by(&user.email)
                };
                if applied {
                    self.persist();
                } else {
                    debug!(expert_id = %id, "Signed-in user changed during toggle, mirror untouched");
                }
                if was_saved {
                    info!(expert_id = %id, "Expert removed from saved");
                    self.notifications.success(REMOVED_MESSAGE);
                    ToggleOutcome::Removed
                } else {
                    info!(expert_id = %id, "Expert saved");
                    self.notifications.success(SAVED_MESSAGE);
                    ToggleOutcome::Saved
                }
            }
            Err(e) => {
                let message = e.user_message();
                warn!(expert_id = %id, error = %e, "Bookmark toggle failed");
                self.notifications.error(message.clone());
                ToggleOutcome::Failed { message }
            }
        }
    }

    fn persist(&self) {
        if self.session.is_authenticated() {
            self.session.cache(SAVED_EXPERTS_KEY, &self.saved_ids());
        }
    }
}

/// One row of the saved list
#[derive(Debug, Clone, PartialEq)]
pub struct SavedEntry {
    pub expert: Expert,
    /// Removal acknowledged, waiting out the grace interval
    pub removing: bool,
}

#[derive(Default)]
struct ViewState {
    experts: Vec<Expert>,
    removing: HashSet<ExpertId>,
}

/// The saved list, resolved to full expert records
pub struct SavedExpertsView {
    bookmarks: Arc<BookmarkSynchronizer>,
    service: Arc<dyn DirectoryService>,
    grace: Duration,
    state: Arc<Mutex<ViewState>>,
    removals: Mutex<Vec<JoinHandle<()>>>,
}

impl SavedExpertsView {
    pub fn new(
        bookmarks: Arc<BookmarkSynchronizer>,
        service: Arc<dyn DirectoryService>,
        grace: Duration,
    ) -> Self {
        Self {
            bookmarks,
            service,
            grace,
            state: Arc::new(Mutex::new(ViewState::default())),
            removals: Mutex::new(Vec::new()),
        }
    }

    /// Read the saved ids and resolve each to an expert
    ///
    /// Lookups run concurrently. Ids the directory no longer knows are
    /// dropped. Results are filtered by the saved set as it stands once the
    /// lookups finish, so an entry removed meanwhile does not come back.
    pub async fn load(&self) -> Result<Vec<Expert>> {
        let ids = self.bookmarks.load().await?;
        let lookups = join_all(ids.iter().map(|id| self.service.get_expert(id))).await;

        let mut resolved = Vec::with_capacity(ids.len());
        for (id, lookup) in ids.iter().zip(lookups) {
            match lookup {
                Ok(Some(expert)) => resolved.push(expert),
                Ok(None) => debug!(expert_id = %id, "Saved expert no longer listed"),
                Err(e) => warn!(expert_id = %id, error = %e, "Failed to resolve saved expert"),
            }
        }

        let experts = {
            let mut state = lock(&self.state);
            resolved.retain(|e| self.bookmarks.is_saved(&e.id));
            // an id saved again during its grace interval is no longer leaving
            state.removing.retain(|id| !self.bookmarks.is_saved(id));
            state.experts = resolved;
            state.experts.clone()
        };
        info!(count = experts.len(), "Saved list loaded");
        Ok(experts)
    }

    /// Reload from the server
    pub async fn refresh(&self) -> Result<Vec<Expert>> {
        self.load().await
    }

    pub fn entries(&self) -> Vec<SavedEntry> {
        let state = lock(&self.state);
        state
            .experts
            .iter()
            .map(|e| SavedEntry {
                expert: e.clone(),
                removing: state.removing.contains(&e.id),
            })
            .collect()
    }

    pub fn experts(&self) -> Vec<Expert> {
        lock(&self.state).experts.clone()
    }

    /// Unsave an expert shown in the list
    ///
    /// Ids that are not currently saved are ignored so this never saves.
    pub async fn remove(&self, id: &ExpertId) -> ToggleOutcome {
        if !self.bookmarks.is_saved(id) {
            return ToggleOutcome::Ignored;
        }
        let outcome = self.bookmarks.toggle(id).await;
        if outcome == ToggleOutcome::Removed {
            self.schedule_removal(id.clone());
        }
        outcome
    }

    fn schedule_removal(&self, id: ExpertId) {
        lock(&self.state).removing.insert(id.clone());

        let state = Arc::clone(&self.state);
        let bookmarks = Arc::clone(&self.bookmarks);
        let grace = self.grace;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let mut state = lock(&state);
            let still_leaving = state.removing.remove(&id) && !bookmarks.is_saved(&id);
            if still_leaving {
                state.experts.retain(|e| e.id != id);
            } else {
                debug!(expert_id = %id, "Expert saved again, kept in list");
            }
        });

        let mut removals = lock(&self.removals);
        removals.retain(|h| !h.is_finished());
        removals.push(handle);
    }
}

impl Drop for SavedExpertsView {
    fn drop(&mut self) {
        for handle in lock(&self.removals).drain(..) {
            handle.abort();
        }
    }
}
