//! Recommendation feed
//!
//! Blends up to three personalized experts, seeded by the user's most recent
//! search, with up to two random catalog experts. The result never contains
//! the same id twice.
//!
//! The recent-search read and the personalized request run in sequence; the
//! catalog read for backfill runs concurrently with both and is joined before
//! the feed is assembled.

use crate::catalog::CatalogStore;
use crate::client::DirectoryService;
use crate::config::FailurePolicy;
use crate::error::{DiscoveryError, Result};
use crate::lock::lock;
use crate::session::Session;
use crate::types::{Expert, ExpertId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Personalized entries kept from the collaborator's response
pub const PERSONALIZED_LIMIT: usize = 3;
/// Random catalog entries appended after the personalized prefix
pub const BACKFILL_LIMIT: usize = 2;

/// What a refresh was computed for
#[derive(Debug, Clone, PartialEq, Eq)]
struct RefreshKey {
    email: Option<String>,
    latest_search: Option<String>,
}

pub struct RecommendationAggregator {
    service: Arc<dyn DirectoryService>,
    session: Session,
    catalog: Arc<CatalogStore>,
    policy: FailurePolicy,
    rng: Mutex<StdRng>,
    result: watch::Sender<Arc<Vec<Expert>>>,
    last_key: Mutex<Option<RefreshKey>>,
}

impl RecommendationAggregator {
    pub fn new(
        service: Arc<dyn DirectoryService>,
        session: Session,
        catalog: Arc<CatalogStore>,
    ) -> Self {
        let (result, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            service,
            session,
            catalog,
            policy: FailurePolicy::default(),
            rng: Mutex::new(StdRng::from_entropy()),
            result,
            last_key: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fix the shuffle seed, for reproducible backfill
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Current feed
    pub fn current(&self) -> Arc<Vec<Expert>> {
        Arc::clone(&self.result.borrow())
    }

    /// First entry of the current feed
    pub fn featured(&self) -> Option<Expert> {
        self.result.borrow().first().cloned()
    }

    /// Observe every new feed
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Expert>>> {
        self.result.subscribe()
    }

    /// Recompute only when the signed-in user or the latest search changed
    pub async fn refresh_if_changed(&self, latest_search: Option<&str>) -> Arc<Vec<Expert>> {
        let key = RefreshKey {
            email: self.session.user().map(|u| u.email),
            latest_search: latest_search.map(str::to_string),
        };
        let unchanged = lock(&self.last_key).as_ref() == Some(&key);
        if unchanged {
            debug!("Recommendation inputs unchanged");
            return self.current();
        }
        let feed = self.refresh().await;
        *lock(&self.last_key) = Some(key);
        feed
    }

    /// Rebuild the feed
    ///
    /// Never fails: a signed-out session or a failed request yields an empty
    /// feed (or the personalized prefix alone under
    /// [`FailurePolicy::KeepPersonalized`] when only the backfill failed).
    pub async fn refresh(&self) -> Arc<Vec<Expert>> {
        let Some(user) = self.session.user() else {
            debug!("No signed-in user, recommendations cleared");
            return self.publish(Vec::new());
        };

        let personalized = async {
            let recent = self.service.recent_searches(&user.email).await?;
            let seed: Vec<String> = recent.into_iter().take(1).collect();
            let experts = self.service.recommendations(&seed).await?;
            Ok::<_, DiscoveryError>(experts)
        };
        let pool = self.catalog.ensure_loaded(self.service.as_ref());

        let (personalized, pool) = tokio::join!(personalized, pool);
        let feed = match self.assemble(personalized, pool) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(error = %e, "Recommendation refresh failed, feed cleared");
                Vec::new()
            }
        };

        info!(count = feed.len(), "Recommendations refreshed");
        self.publish(feed)
    }

    fn assemble(
        &self,
        personalized: Result<Vec<Expert>>,
        pool: Result<Arc<Vec<Expert>>>,
    ) -> Result<Vec<Expert>> {
        let mut seen: HashSet<ExpertId> = HashSet::new();
        let mut feed: Vec<Expert> = personalized?
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .take(PERSONALIZED_LIMIT)
            .collect();
        // `seen` may hold ids past the limit; rebuild it from what was kept
        seen = feed.iter().map(|e| e.id.clone()).collect();

        let pool = match (pool, self.policy) {
            (Ok(pool), _) => pool,
            (Err(e), FailurePolicy::KeepPersonalized) => {
                warn!(error = %e, "Backfill unavailable, keeping personalized entries");
                return Ok(feed);
            }
            (Err(e), FailurePolicy::AllOrNothing) => return Err(e),
        };

        let mut candidates: Vec<&Expert> = pool.iter().filter(|e| !seen.contains(&e.id)).collect();
        candidates.shuffle(&mut *lock(&self.rng));

        let backfill: Vec<Expert> = candidates
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .take(BACKFILL_LIMIT)
            .cloned()
            .collect();
        debug!(
            personalized = feed.len(),
            backfill = backfill.len(),
            "Recommendation feed assembled"
        );
        feed.extend(backfill);
        Ok(feed)
    }

    fn publish(&self, feed: Vec<Expert>) -> Arc<Vec<Expert>> {
        let feed = Arc::new(feed);
        self.result.send_replace(Arc::clone(&feed));
        feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryDirectory, Operation};

    fn expert(id: &str) -> Expert {
        Expert::new(id, format!("Expert {}", id), "AI", "Pune")
    }

    fn signed_in() -> Session {
        let session = Session::in_memory();
        session.login("ana@example.com", "token");
        session
    }

    fn aggregator(directory: Arc<InMemoryDirectory>, session: Session) -> RecommendationAggregator {
        RecommendationAggregator::new(directory, session, Arc::new(CatalogStore::new())).with_seed(7)
    }

    fn assert_invariants(feed: &[Expert]) {
        let ids: HashSet<_> = feed.iter().map(|e| &e.id).collect();
        assert_eq!(ids.len(), feed.len(), "duplicate ids in {feed:?}");
        assert!(feed.len() <= PERSONALIZED_LIMIT + BACKFILL_LIMIT);
    }

    #[tokio::test]
    async fn test_signed_out_issues_no_requests() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a")]));
        let agg = aggregator(directory.clone(), Session::in_memory());

        assert!(agg.refresh().await.is_empty());
        assert!(agg.featured().is_none());
        assert_eq!(directory.calls(Operation::RecentSearches), 0);
        assert_eq!(directory.calls(Operation::Recommendations), 0);
        assert_eq!(directory.calls(Operation::ListExperts), 0);
    }

    #[tokio::test]
    async fn test_two_personalized_plus_two_backfill() {
        let mut catalog: Vec<Expert> = (0..8).map(|i| expert(&format!("c{}", i))).collect();
        catalog.push(expert("X"));
        catalog.push(expert("Y"));
        let directory = Arc::new(InMemoryDirectory::new(catalog));
        directory.script_recommendations(vec![expert("X"), expert("Y")]);

        let agg = aggregator(directory.clone(), signed_in());
        let feed = agg.refresh().await;

        assert_eq!(feed.len(), 4);
        assert_eq!(feed[0].id.as_str(), "X");
        assert_eq!(feed[1].id.as_str(), "Y");
        assert!(feed[2..].iter().all(|e| e.id.as_str().starts_with('c')));
        assert_invariants(&feed);
        assert_eq!(agg.featured().unwrap().id.as_str(), "X");
    }

    #[tokio::test]
    async fn test_personalized_prefix_is_capped_and_deduplicated() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a"), expert("b")]));
        directory.script_recommendations(vec![
            expert("p1"),
            expert("p1"),
            expert("p2"),
            expert("p3"),
            expert("p4"),
        ]);

        let feed = aggregator(directory, signed_in()).refresh().await;
        let ids: Vec<_> = feed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(&ids[..3], &["p1", "p2", "p3"]);
        assert_eq!(feed.len(), 5);
        assert_invariants(&feed);
    }

    #[tokio::test]
    async fn test_seed_is_latest_search_only() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a")]));
        for q in ["ai", "ux"] {
            directory.append_recent_search("ana@example.com", q).await.unwrap();
        }
        let agg = aggregator(directory.clone(), signed_in());
        agg.refresh().await;
        assert_eq!(directory.last_seed(), Some(vec!["ux".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_history_sends_empty_seed() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a"), expert("b"), expert("c")]));
        let agg = aggregator(directory.clone(), signed_in());
        let feed = agg.refresh().await;
        assert_eq!(directory.last_seed(), Some(Vec::new()));
        assert_eq!(feed.len(), 2);
    }

    #[tokio::test]
    async fn test_any_failure_clears_feed() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a"), expert("b")]));
        directory.script_recommendations(vec![expert("p")]);
        let agg = aggregator(directory.clone(), signed_in());
        assert_eq!(agg.refresh().await.len(), 3);

        directory.inject_failure(Operation::RecentSearches, DiscoveryError::Network("down".into()));
        assert!(agg.refresh().await.is_empty());
        assert!(agg.featured().is_none());
    }

    #[tokio::test]
    async fn test_backfill_failure_clears_feed_by_default() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a")]));
        directory.script_recommendations(vec![expert("p")]);
        directory.inject_failure(Operation::ListExperts, DiscoveryError::Network("down".into()));

        let feed = aggregator(directory, signed_in()).refresh().await;
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_keep_personalized_policy() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a")]));
        directory.script_recommendations(vec![expert("p")]);
        directory.inject_failure(Operation::ListExperts, DiscoveryError::Network("down".into()));

        let agg = aggregator(directory, signed_in()).with_policy(FailurePolicy::KeepPersonalized);
        let feed = agg.refresh().await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id.as_str(), "p");
    }

    #[tokio::test]
    async fn test_refresh_if_changed_skips_same_inputs() {
        let directory = Arc::new(InMemoryDirectory::new(vec![expert("a"), expert("b")]));
        let session = signed_in();
        let agg = aggregator(directory.clone(), session.clone());

        agg.refresh_if_changed(Some("ai")).await;
        agg.refresh_if_changed(Some("ai")).await;
        assert_eq!(directory.calls(Operation::Recommendations), 1);

        agg.refresh_if_changed(Some("ux")).await;
        assert_eq!(directory.calls(Operation::Recommendations), 2);

        session.logout();
        assert!(agg.refresh_if_changed(Some("ux")).await.is_empty());
        assert_eq!(directory.calls(Operation::Recommendations), 2);
    }

    #[tokio::test]
    async fn test_backfill_is_a_permutation_sample() {
        let catalog: Vec<Expert> = (0..6).map(|i| expert(&format!("c{}", i))).collect();
        let directory = Arc::new(InMemoryDirectory::new(catalog));
        let agg = aggregator(directory, signed_in());

        let mut seen_first = HashSet::new();
        for _ in 0..20 {
            let feed = agg.refresh().await;
            assert_eq!(feed.len(), 2);
            assert_invariants(&feed);
            seen_first.insert(feed[0].id.clone());
        }
        assert!(seen_first.len() > 1);
    }

    fn slow_directory(slow: &[(Operation, u64)]) -> Arc<InMemoryDirectory> {
        let catalog: Vec<Expert> = (0..6).map(|i| expert(&format!("c{}", i))).collect();
        let directory = Arc::new(InMemoryDirectory::new(catalog));
        directory.script_recommendations(vec![expert("X"), expert("Y")]);
        for (op, ms) in slow {
            directory.set_delay(*op, std::time::Duration::from_millis(*ms));
        }
        directory
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_is_independent_of_completion_order() {
        let catalog_last = slow_directory(&[(Operation::ListExperts, 300)]);
        let personalized_last = slow_directory(&[
            (Operation::RecentSearches, 200),
            (Operation::Recommendations, 200),
        ]);

        let a = aggregator(catalog_last, signed_in()).refresh().await;
        let b = aggregator(personalized_last, signed_in()).refresh().await;

        let ids = |feed: &[Expert]| feed.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(a.len(), 4);
        assert_eq!(ids(&a), ids(&b));
        assert_invariants(&a);
    }

    #[tokio::test(start_paused = true)]
    async fn test_catalog_read_overlaps_personalized_chain() {
        let directory = slow_directory(&[
            (Operation::ListExperts, 300),
            (Operation::RecentSearches, 200),
            (Operation::Recommendations, 200),
        ]);
        let agg = Arc::new(aggregator(directory.clone(), signed_in()));

        let started = tokio::time::Instant::now();
        let refresh = tokio::spawn({
            let agg = Arc::clone(&agg);
            async move { agg.refresh().await }
        });

        // recent read done, recommendations still in flight
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        assert_eq!(directory.calls(Operation::ListExperts), 1);
        assert_eq!(directory.calls(Operation::Recommendations), 1);
        assert!(!refresh.is_finished());

        let feed = refresh.await.unwrap();
        assert_eq!(feed.len(), 4);
        assert!(started.elapsed() < std::time::Duration::from_millis(700));
    }
}
