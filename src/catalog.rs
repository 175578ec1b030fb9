//! Session catalog of experts
//!
//! Fetched once, then read-only. A refresh replaces the whole catalog;
//! entries are never patched in place.

use crate::client::DirectoryService;
use crate::error::Result;
use crate::types::{CatalogStats, Expert, ExpertId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct Snapshot {
    experts: Arc<Vec<Expert>>,
    loaded: bool,
    generation: u64,
}

/// Holds the expert catalog for the current session
#[derive(Default)]
pub struct CatalogStore {
    inner: RwLock<Snapshot>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the catalog and replace the current one wholesale
    pub async fn load(&self, service: &dyn DirectoryService) -> Result<Arc<Vec<Expert>>> {
        let experts = Arc::new(service.list_experts().await?);
        let mut inner = self.inner.write().await;
        inner.experts = Arc::clone(&experts);
        inner.loaded = true;
        inner.generation += 1;
        info!(
            count = experts.len(),
            generation = inner.generation,
            "Catalog loaded"
        );
        Ok(experts)
    }

    /// Manual refresh; same as [`CatalogStore::load`]
    pub async fn refresh(&self, service: &dyn DirectoryService) -> Result<Arc<Vec<Expert>>> {
        self.load(service).await
    }

    /// Return the warm catalog, loading it first if this session has none yet
    pub async fn ensure_loaded(&self, service: &dyn DirectoryService) -> Result<Arc<Vec<Expert>>> {
        {
            let inner = self.inner.read().await;
            if inner.loaded {
                debug!("Catalog warm, skipping fetch");
                return Ok(Arc::clone(&inner.experts));
            }
        }
        self.load(service).await
    }

    pub async fn is_warm(&self) -> bool {
        self.inner.read().await.loaded
    }

    /// Bumped on every successful load
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    pub async fn snapshot(&self) -> Arc<Vec<Expert>> {
        Arc::clone(&self.inner.read().await.experts)
    }

    pub async fn get(&self, id: &ExpertId) -> Option<Expert> {
        self.inner
            .read()
            .await
            .experts
            .iter()
            .find(|e| &e.id == id)
            .cloned()
    }

    /// Selectable domain labels: distinct, capitalized, sorted
    pub async fn domains(&self) -> Vec<String> {
        domain_labels(&self.snapshot().await)
    }

    pub async fn stats(&self) -> CatalogStats {
        catalog_stats(&self.snapshot().await)
    }
}

/// Distinct non-empty domains, each word capitalized, sorted
///
/// Labels differing only by case collapse to the first one seen.
pub fn domain_labels(experts: &[Expert]) -> Vec<String> {
    let mut by_key: HashMap<String, String> = HashMap::new();
    for domain in experts.iter().map(|e| e.domain.trim()).filter(|d| !d.is_empty()) {
        by_key
            .entry(domain.to_lowercase())
            .or_insert_with(|| capitalize_words(domain));
    }
    by_key.into_values().collect::<BTreeSet<_>>().into_iter().collect()
}

pub fn catalog_stats(experts: &[Expert]) -> CatalogStats {
    let domains: HashSet<String> = experts
        .iter()
        .map(|e| e.domain.trim())
        .filter(|d| !d.is_empty())
        .map(str::to_lowercase)
        .collect();
    CatalogStats {
        total_experts: experts.len(),
        domains_covered: domains.len(),
    }
}

/// Upper-case the first character of every word
pub fn capitalize_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !is_word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryDirectory, Operation};

    fn sample() -> Vec<Expert> {
        vec![
            Expert::new("a", "Ana", "ai engineer", "Pune"),
            Expert::new("b", "Ben", "UI/UX designer", "Delhi"),
            Expert::new("c", "Cy", "AI Engineer", "Mumbai"),
            Expert::new("d", "Di", "", "Goa"),
        ]
    }

    #[test]
    fn test_capitalize_words() {
        assert_eq!(capitalize_words("ui/ux designer"), "Ui/Ux Designer");
        assert_eq!(capitalize_words("data science"), "Data Science");
        assert_eq!(capitalize_words(""), "");
    }

    #[test]
    fn test_domain_labels_dedupe_and_sort() {
        assert_eq!(
            domain_labels(&sample()),
            vec!["Ai Engineer".to_string(), "UI/UX Designer".to_string()]
        );
    }

    #[test]
    fn test_stats_count_domains_case_insensitively() {
        let stats = catalog_stats(&sample());
        assert_eq!(stats.total_experts, 4);
        assert_eq!(stats.domains_covered, 2);
    }

    #[tokio::test]
    async fn test_ensure_loaded_fetches_once() {
        let directory = InMemoryDirectory::new(sample());
        let store = CatalogStore::new();
        assert!(!store.is_warm().await);

        store.ensure_loaded(&directory).await.unwrap();
        store.ensure_loaded(&directory).await.unwrap();
        assert_eq!(directory.calls(Operation::ListExperts), 1);
        assert_eq!(store.generation().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let directory = InMemoryDirectory::new(sample());
        let store = CatalogStore::new();
        store.load(&directory).await.unwrap();

        directory.replace_catalog(vec![Expert::new("z", "Zed", "ML", "Goa")]);
        store.refresh(&directory).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert!(store.get(&ExpertId::new("a")).await.is_none());
        assert_eq!(store.generation().await, 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_catalog() {
        let directory = InMemoryDirectory::new(sample());
        let store = CatalogStore::new();
        store.load(&directory).await.unwrap();

        directory.inject_failure(
            Operation::ListExperts,
            crate::error::DiscoveryError::Network("offline".into()),
        );
        assert!(store.refresh(&directory).await.is_err());
        assert_eq!(store.snapshot().await.len(), 4);
    }
}
