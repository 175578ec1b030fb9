//! In-process directory service
//!
//! Follows the same canonical rules as the REST service:
//! - appending a recent search promotes an existing entry to the front
//!   and keeps at most three
//! - saving an already-saved expert, or removing one that is not saved,
//!   is a server error with a message
//!
//! Failures and latency can be injected per operation so callers can exercise
//! degraded paths without a network.

use super::DirectoryService;
use crate::error::{DiscoveryError, Result};
use crate::lock::lock;
use crate::types::{Expert, ExpertId, TrendingDomain};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Maximum recent searches the service keeps per user
pub const RECENT_SEARCH_CAPACITY: usize = 3;

/// Operations exposed by [`DirectoryService`], used to address injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListExperts,
    GetExpert,
    Recommendations,
    RecentSearches,
    AppendRecentSearch,
    SavedExperts,
    SaveExpert,
    RemoveSavedExpert,
    TrendingDomains,
}

#[derive(Default)]
struct State {
    experts: Vec<Expert>,
    scripted_recommendations: Option<Vec<Expert>>,
    recent: HashMap<String, Vec<String>>,
    saved: HashMap<String, Vec<ExpertId>>,
    trending_domains: Vec<TrendingDomain>,
    faults: HashMap<Operation, VecDeque<DiscoveryError>>,
    delays: HashMap<Operation, Duration>,
    calls: HashMap<Operation, usize>,
    last_seed: Option<Vec<String>>,
}

/// Directory service backed by process memory
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    pub fn new(experts: Vec<Expert>) -> Self {
        let directory = Self::default();
        directory.replace_catalog(experts);
        directory
    }

    /// Seed a directory from a JSON array of experts
    pub fn from_json(json: &str) -> Result<Self> {
        let experts: Vec<Expert> = serde_json::from_str(json)?;
        crate::types::validate_experts(&experts)?;
        Ok(Self::new(experts))
    }

    pub fn replace_catalog(&self, experts: Vec<Expert>) {
        self.with_state(|s| s.experts = experts);
    }

    pub fn set_trending_domains(&self, domains: Vec<TrendingDomain>) {
        self.with_state(|s| s.trending_domains = domains);
    }

    /// Answer every recommendation request with this list, regardless of seed
    pub fn script_recommendations(&self, experts: Vec<Expert>) {
        self.with_state(|s| s.scripted_recommendations = Some(experts));
    }

    /// Make the next call to `op` fail with `error`; repeated calls queue
    pub fn inject_failure(&self, op: Operation, error: DiscoveryError) {
        self.with_state(|s| s.faults.entry(op).or_default().push_back(error));
    }

    /// Delay every call to `op` before it is answered
    pub fn set_delay(&self, op: Operation, delay: Duration) {
        self.with_state(|s| {
            s.delays.insert(op, delay);
        });
    }

    /// Number of calls received for `op`, including failed ones
    pub fn calls(&self, op: Operation) -> usize {
        self.with_state(|s| s.calls.get(&op).copied().unwrap_or(0))
    }

    /// Seed sent with the most recent recommendation request
    pub fn last_seed(&self) -> Option<Vec<String>> {
        self.with_state(|s| s.last_seed.clone())
    }

    /// Server-side saved set for a user
    pub fn saved_ids(&self, email: &str) -> Vec<ExpertId> {
        self.with_state(|s| s.saved.get(email).cloned().unwrap_or_default())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Count the call, wait out any configured delay, then surface an injected fault
    async fn enter(&self, op: Operation) -> Result<()> {
        let delay = self.with_state(|s| {
            *s.calls.entry(op).or_insert(0) += 1;
            s.delays.get(&op).copied()
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.with_state(|s| s.faults.get_mut(&op).and_then(VecDeque::pop_front)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn matches_seed(expert: &Expert, seed: &str) -> bool {
    let needle = seed.to_lowercase();
    expert.name.to_lowercase().contains(&needle)
        || expert.domain.to_lowercase().contains(&needle)
        || expert.skills.iter().any(|s| s.to_lowercase().contains(&needle))
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn list_experts(&self) -> Result<Vec<Expert>> {
        self.enter(Operation::ListExperts).await?;
        Ok(self.with_state(|s| s.experts.clone()))
    }

    async fn get_expert(&self, id: &ExpertId) -> Result<Option<Expert>> {
        self.enter(Operation::GetExpert).await?;
        Ok(self.with_state(|s| s.experts.iter().find(|e| &e.id == id).cloned()))
    }

    async fn recommendations(&self, seed_searches: &[String]) -> Result<Vec<Expert>> {
        self.enter(Operation::Recommendations).await?;
        Ok(self.with_state(|s| {
            s.last_seed = Some(seed_searches.to_vec());
            if let Some(scripted) = &s.scripted_recommendations {
                return scripted.clone();
            }
            match seed_searches.first() {
                Some(seed) => s
                    .experts
                    .iter()
                    .filter(|e| matches_seed(e, seed))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        }))
    }

    async fn recent_searches(&self, email: &str) -> Result<Vec<String>> {
        self.enter(Operation::RecentSearches).await?;
        Ok(self.with_state(|s| s.recent.get(email).cloned().unwrap_or_default()))
    }

    async fn append_recent_search(&self, email: &str, query: &str) -> Result<Vec<String>> {
        self.enter(Operation::AppendRecentSearch).await?;
        let query = query.trim();
        if query.is_empty() {
            return Err(DiscoveryError::Server {
                status: 400,
                message: Some("Search query is required".into()),
            });
        }
        Ok(self.with_state(|s| {
            let list = s.recent.entry(email.to_string()).or_default();
            list.retain(|q| q != query);
            list.insert(0, query.to_string());
            list.truncate(RECENT_SEARCH_CAPACITY);
            list.clone()
        }))
    }

    async fn saved_experts(&self, email: &str) -> Result<Vec<ExpertId>> {
        self.enter(Operation::SavedExperts).await?;
        Ok(self.saved_ids(email))
    }

    async fn save_expert(&self, email: &str, id: &ExpertId) -> Result<()> {
        self.enter(Operation::SaveExpert).await?;
        self.with_state(|s| {
            let saved = s.saved.entry(email.to_string()).or_default();
            if saved.contains(id) {
                return Err(DiscoveryError::Server {
                    status: 400,
                    message: Some("Expert already saved".into()),
                });
            }
            saved.push(id.clone());
            Ok(())
        })
    }

    async fn remove_saved_expert(&self, email: &str, id: &ExpertId) -> Result<()> {
        self.enter(Operation::RemoveSavedExpert).await?;
        self.with_state(|s| {
            let saved = s.saved.entry(email.to_string()).or_default();
            let before = saved.len();
            saved.retain(|x| x != id);
            if saved.len() == before {
                return Err(DiscoveryError::Server {
                    status: 404,
                    message: Some("Expert not in saved list".into()),
                });
            }
            Ok(())
        })
    }

    async fn trending_domains(&self) -> Result<Vec<TrendingDomain>> {
        self.enter(Operation::TrendingDomains).await?;
        Ok(self.with_state(|s| s.trending_domains.clone()))
    }
}
