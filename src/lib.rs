//! Expert Discovery Engine
//!
//! Client-side core of an expert directory: search and domain filtering over
//! a session catalog, server-owned recent-search history, a blended
//! recommendation feed, a rotating trending carousel and per-user bookmarks.
//!
//! # Architecture
//!
//! Every component talks to the directory through the [`DirectoryService`]
//! trait and learns who the user is from an explicitly passed [`Session`]:
//! - **Catalog**: [`CatalogStore`] fetches the expert list once per session
//! - **Search**: [`SearchFilterEngine`] derives filtered views, no I/O
//! - **History**: [`RecentSearchTracker`] mirrors the server's list verbatim
//! - **Feed**: [`RecommendationAggregator`] blends personalized and random picks
//! - **Trending**: [`TrendingRotator`] owns the only background timer
//! - **Bookmarks**: [`BookmarkSynchronizer`] and [`SavedExpertsView`]
//!
//! # Example
//!
//! ```rust,ignore
//! use expert_discovery::{DiscoveryEngine, DiscoveryConfig, InMemoryDirectory, Session};
//! use std::sync::Arc;
//!
//! let session = Session::in_memory();
//! session.login("ana@example.com", token);
//!
//! let directory = Arc::new(InMemoryDirectory::from_json(&catalog_json)?);
//! let engine = DiscoveryEngine::new(directory, session, &DiscoveryConfig::default());
//!
//! engine.catalog.ensure_loaded(engine.service()).await?;
//! engine.recent.submit("machine learning").await?;
//! let feed = engine.recommendations.refresh().await;
//! ```

// Directory service contracts and backends
pub mod client;

// Session context and key-value storage
pub mod session;

// Wire schemas
pub mod types;

// Configuration
pub mod config;

// Error types
pub mod error;

// Components
pub mod bookmark;
pub mod catalog;
pub mod notify;
pub mod recent;
pub mod recommend;
pub mod search;
pub mod trending;

mod engine;
mod lock;

pub use client::{DirectoryService, HttpDirectoryClient, InMemoryDirectory, Operation};
pub use session::{KeyValueStore, MemoryStore, Session, User};
pub use types::{CatalogStats, Expert, ExpertId, ExternalLinks, TrendingDomain};
pub use config::{
    BookmarkConfig, DiscoveryConfig, FailurePolicy, RecommendationConfig, ServiceConfig,
    TrendingConfig,
};
pub use error::{DiscoveryError, Result, GENERIC_NETWORK_MESSAGE};

pub use bookmark::{
    BookmarkSynchronizer, SavedEntry, SavedExpertState, SavedExpertsView, ToggleOutcome,
};
pub use catalog::CatalogStore;
pub use notify::{Notification, NotificationCenter, NotificationKind};
pub use recent::RecentSearchTracker;
pub use recommend::RecommendationAggregator;
pub use search::{filter_experts, DomainFilterSet, SearchFilterEngine};
pub use trending::{load_trending_domains, TrendingRotator, WindowSlot};

pub use engine::DiscoveryEngine;
