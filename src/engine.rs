//! Component wiring
//!
//! Builds every component over one directory service and one session.

use crate::bookmark::{BookmarkSynchronizer, SavedExpertsView};
use crate::catalog::CatalogStore;
use crate::client::DirectoryService;
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::notify::NotificationCenter;
use crate::recent::RecentSearchTracker;
use crate::recommend::RecommendationAggregator;
use crate::search::SearchFilterEngine;
use crate::session::Session;
use crate::trending::TrendingRotator;
use crate::types::Expert;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct DiscoveryEngine {
    service: Arc<dyn DirectoryService>,
    session: Session,
    pub catalog: Arc<CatalogStore>,
    pub recent: RecentSearchTracker,
    pub recommendations: RecommendationAggregator,
    pub trending: TrendingRotator<Expert>,
    pub bookmarks: Arc<BookmarkSynchronizer>,
    pub saved: SavedExpertsView,
    pub notifications: NotificationCenter,
}

impl DiscoveryEngine {
    pub fn new(service: Arc<dyn DirectoryService>, session: Session, config: &DiscoveryConfig) -> Self {
        let catalog = Arc::new(CatalogStore::new());
        let notifications = NotificationCenter::new(config.bookmarks.notification_ttl());
        let bookmarks = Arc::new(BookmarkSynchronizer::new(
            Arc::clone(&service),
            session.clone(),
            notifications.clone(),
        ));

        Self {
            recent: RecentSearchTracker::new(Arc::clone(&service), session.clone()),
            recommendations: RecommendationAggregator::new(
                Arc::clone(&service),
                session.clone(),
                Arc::clone(&catalog),
            )
            .with_policy(config.recommendations.failure_policy),
            trending: TrendingRotator::new(&config.trending),
            saved: SavedExpertsView::new(
                Arc::clone(&bookmarks),
                Arc::clone(&service),
                config.bookmarks.grace(),
            ),
            bookmarks,
            catalog,
            notifications,
            service,
            session,
        }
    }

    pub fn service(&self) -> &dyn DirectoryService {
        self.service.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a search the way the search page does
    ///
    /// Records the query in the user's history when signed in, then filters
    /// the catalog and refreshes the feed if its seed changed. A failed
    /// history append still returns results.
    pub async fn search(&self, engine: &SearchFilterEngine) -> Result<Vec<Expert>> {
        let catalog = self.catalog.ensure_loaded(self.service()).await?;

        if !engine.query().trim().is_empty() {
            match self.recent.submit(engine.query()).await {
                Ok(_) => {}
                Err(DiscoveryError::RequiresAuth) => debug!("Search not recorded, no session"),
                Err(e) => warn!(error = %e, "Search not recorded"),
            }
        }
        self.recommendations
            .refresh_if_changed(self.recent.latest().as_deref())
            .await;

        Ok(engine.compute(&catalog))
    }
}
