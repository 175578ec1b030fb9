//! Search and domain filtering over the catalog
//!
//! Pure derivation: nothing here touches the network or mutates the catalog.
//! Survivors keep their catalog order.

use crate::types::Expert;
use std::collections::HashSet;

/// Case-normalized set of domain labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFilterSet {
    domains: HashSet<String>,
}

fn normalize(domain: &str) -> String {
    domain.trim().to_lowercase()
}

impl DomainFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: &str) -> bool {
        self.domains.insert(normalize(domain))
    }

    pub fn remove(&mut self, domain: &str) -> bool {
        self.domains.remove(&normalize(domain))
    }

    /// Add the domain if absent, remove it if present; returns whether it is now selected
    pub fn toggle(&mut self, domain: &str) -> bool {
        let key = normalize(domain);
        if self.domains.remove(&key) {
            false
        } else {
            self.domains.insert(key);
            true
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&normalize(domain))
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for DomainFilterSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for domain in iter {
            set.insert(domain.as_ref());
        }
        set
    }
}

/// Filter `catalog` by domain membership, then by free-text query
///
/// The query matches, case-insensitively, as a substring of name, domain
/// or location. A blank query applies no text restriction.
pub fn filter_experts(catalog: &[Expert], query: &str, domains: &DomainFilterSet) -> Vec<Expert> {
    let needle = query.trim().to_lowercase();
    catalog
        .iter()
        .filter(|e| domains.is_empty() || domains.contains(&e.domain))
        .filter(|e| needle.is_empty() || matches_text(e, &needle))
        .cloned()
        .collect()
}

fn matches_text(expert: &Expert, needle: &str) -> bool {
    expert.name.to_lowercase().contains(needle)
        || expert.domain.to_lowercase().contains(needle)
        || expert.location.to_lowercase().contains(needle)
}

/// Interactive search state: the current query plus selected domains
#[derive(Debug, Clone, Default)]
pub struct SearchFilterEngine {
    query: String,
    domains: DomainFilterSet,
}

impl SearchFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            domains: DomainFilterSet::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    pub fn domains(&self) -> &DomainFilterSet {
        &self.domains
    }

    pub fn toggle_domain(&mut self, domain: &str) -> bool {
        self.domains.toggle(domain)
    }

    pub fn clear_domains(&mut self) {
        self.domains.clear();
    }

    /// The filtered view of `catalog` under the current state
    pub fn compute(&self, catalog: &[Expert]) -> Vec<Expert> {
        filter_experts(catalog, &self.query, &self.domains)
    }
}
