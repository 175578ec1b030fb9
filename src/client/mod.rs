//! Directory service contracts
//!
//! Every read and write the engine performs goes through [`DirectoryService`].
//! Two backends are provided:
//! - [`HttpDirectoryClient`]: the REST service
//! - [`InMemoryDirectory`]: an in-process service with the same canonical rules,
//!   used offline and in tests

mod http;
mod memory;

pub use http::HttpDirectoryClient;
pub use memory::{InMemoryDirectory, Operation};

use crate::error::Result;
use crate::types::{Expert, ExpertId, TrendingDomain};
use async_trait::async_trait;

/// Request/response contracts consumed by the engine
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Full expert catalog
    async fn list_experts(&self) -> Result<Vec<Expert>>;

    /// One expert, `None` when the id is unknown
    async fn get_expert(&self, id: &ExpertId) -> Result<Option<Expert>>;

    /// Personalized recommendations seeded by zero or one search terms
    async fn recommendations(&self, seed_searches: &[String]) -> Result<Vec<Expert>>;

    /// The user's recent searches, most recent first
    async fn recent_searches(&self, email: &str) -> Result<Vec<String>>;

    /// Append a search and return the canonical list
    async fn append_recent_search(&self, email: &str, query: &str) -> Result<Vec<String>>;

    /// Ids the user has bookmarked
    async fn saved_experts(&self, email: &str) -> Result<Vec<ExpertId>>;

    async fn save_expert(&self, email: &str, id: &ExpertId) -> Result<()>;

    async fn remove_saved_expert(&self, email: &str, id: &ExpertId) -> Result<()>;

    async fn trending_domains(&self) -> Result<Vec<TrendingDomain>>;
}
