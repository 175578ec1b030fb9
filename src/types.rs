//! Wire schemas for the directory service

use crate::error::{DiscoveryError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Expert identifier
///
/// The service emits ids as `_id` or `id`, sometimes as integers.
/// Both normalize to a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ExpertId(String);

impl ExpertId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ExpertId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ExpertId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ExpertId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => ExpertId(s),
            RawId::Signed(n) => ExpertId(n.to_string()),
            RawId::Unsigned(n) => ExpertId(n.to_string()),
        })
    }
}

/// Optional external profile links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "wikipedia_url")]
    pub wikipedia: Option<String>,
}

impl ExternalLinks {
    pub fn is_empty(&self) -> bool {
        self.linkedin.is_none()
            && self.github.is_none()
            && self.twitter.is_none()
            && self.website.is_none()
            && self.wikipedia.is_none()
    }
}

/// A directory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expert {
    #[serde(alias = "_id")]
    pub id: ExpertId,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "about")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, flatten)]
    pub links: ExternalLinks,
}

impl Expert {
    /// Minimal constructor; optional profile fields start empty
    pub fn new(
        id: impl Into<ExpertId>,
        name: impl Into<String>,
        domain: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            domain: domain.into(),
            location: location.into(),
            avatar: String::new(),
            bio: None,
            skills: Vec::new(),
            rating: None,
            links: ExternalLinks::default(),
        }
    }

    /// Reject records the engine cannot key or display
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(DiscoveryError::InvalidPayload("expert without id".into()));
        }
        if self.name.trim().is_empty() {
            return Err(DiscoveryError::InvalidPayload(format!(
                "expert {} has no name",
                self.id
            )));
        }
        Ok(())
    }
}

/// Validate every record of a response, failing on the first bad one
pub fn validate_experts(experts: &[Expert]) -> Result<()> {
    experts.iter().try_for_each(Expert::validate)
}

/// Trending domain chip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingDomain {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

/// Request body for personalized recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    /// Zero or one seed terms
    pub seed_searches: Vec<String>,
}

/// Response from the recommendations endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(default)]
    pub experts: Vec<Expert>,
}

/// Request body for appending a recent search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendSearchRequest {
    pub email: String,
    pub search_query: String,
}

/// Canonical recent-search list as returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSearchesResponse {
    pub recent_searches: Vec<String>,
}

/// Saved expert ids for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedExpertsResponse {
    pub saved_experts: Vec<ExpertId>,
}

/// Request body for save/remove bookmark calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    pub email: String,
    pub expert_id: ExpertId,
}

/// Error body carried by non-success responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: Option<String>,
}

/// Aggregate numbers over the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CatalogStats {
    pub total_experts: usize,
    /// Distinct domains, compared case-insensitively
    pub domains_covered: usize,
}
