//! HTTP client for the directory REST API

use super::DirectoryService;
use crate::config::ServiceConfig;
use crate::error::{DiscoveryError, Result};
use crate::types::*;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the directory service
///
/// # Example
///
/// ```rust,no_run
/// use expert_discovery::{DirectoryService, HttpDirectoryClient, ServiceConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpDirectoryClient::new(ServiceConfig {
///     base_url: "http://localhost:5000".into(),
///     ..Default::default()
/// })?;
///
/// let experts = client.list_experts().await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpDirectoryClient {
    config: ServiceConfig,
    client: Client,
}

impl HttpDirectoryClient {
    /// Create a new client
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = config.api_token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| DiscoveryError::Config(format!("invalid api token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DiscoveryError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.client.get(&url).send().await?;
        handle_response(response).await
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        handle_response(response).await
    }

    /// POST where only the status matters
    async fn post_ack<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(server_error(response).await)
    }
}

#[async_trait]
impl DirectoryService for HttpDirectoryClient {
    async fn list_experts(&self) -> Result<Vec<Expert>> {
        let experts: Vec<Expert> = self.get_json("/api/experts").await?;
        validate_experts(&experts)?;
        Ok(experts)
    }

    async fn get_expert(&self, id: &ExpertId) -> Result<Option<Expert>> {
        let path = format!("/api/experts/{}", urlencoding::encode(id.as_str()));
        match self.get_json::<Expert>(&path).await {
            Ok(expert) => {
                expert.validate()?;
                Ok(Some(expert))
            }
            Err(DiscoveryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn recommendations(&self, seed_searches: &[String]) -> Result<Vec<Expert>> {
        let body = RecommendationRequest {
            seed_searches: seed_searches.to_vec(),
        };
        let response: RecommendationResponse = self
            .post_json("/api/experts/recommendations", &body)
            .await?;
        validate_experts(&response.experts)?;
        Ok(response.experts)
    }

    async fn recent_searches(&self, email: &str) -> Result<Vec<String>> {
        let path = format!(
            "/api/auth/recent-searches?email={}",
            urlencoding::encode(email)
        );
        let response: RecentSearchesResponse = self.get_json(&path).await?;
        Ok(response.recent_searches)
    }

    async fn append_recent_search(&self, email: &str, query: &str) -> Result<Vec<String>> {
        let body = AppendSearchRequest {
            email: email.to_string(),
            search_query: query.to_string(),
        };
        let response: RecentSearchesResponse = self
            .post_json("/api/auth/save-recent-search", &body)
            .await?;
        Ok(response.recent_searches)
    }

    async fn saved_experts(&self, email: &str) -> Result<Vec<ExpertId>> {
        let path = format!(
            "/api/auth/get-saved-experts?email={}",
            urlencoding::encode(email)
        );
        let response: SavedExpertsResponse = self.get_json(&path).await?;
        Ok(response.saved_experts)
    }

    async fn save_expert(&self, email: &str, id: &ExpertId) -> Result<()> {
        let body = BookmarkRequest {
            email: email.to_string(),
            expert_id: id.clone(),
        };
        self.post_ack("/api/auth/save-expert", &body).await
    }

    async fn remove_saved_expert(&self, email: &str, id: &ExpertId) -> Result<()> {
        let body = BookmarkRequest {
            email: email.to_string(),
            expert_id: id.clone(),
        };
        self.post_ack("/api/auth/remove-saved-expert", &body).await
    }

    async fn trending_domains(&self) -> Result<Vec<TrendingDomain>> {
        self.get_json("/api/domains/trending").await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(DiscoveryError::NotFound(response.url().path().to_string()));
    }

    if !response.status().is_success() {
        return Err(server_error(response).await);
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Build a server error, keeping the `{ message }` body when there is one
async fn server_error(response: reqwest::Response) -> DiscoveryError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DiscoveryError::Server {
        status,
        message: parse_server_message(&body),
    }
}

fn parse_server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ServerMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .filter(|m| !m.trim().is_empty())
}
