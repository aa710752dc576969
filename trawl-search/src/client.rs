//! OpenSearch client implementation.

use crate::{
    body::SearchBody,
    config::SearchConfig,
    error::{Result, SearchError},
    response::{ClearScrollResponse, SearchResponse, decode_clear_scroll, decode_search},
    scroll::{ScrollOptions, ScrollStream},
    search::SearchBuilder,
    transport::SearchTransport,
};
use async_trait::async_trait;
use opensearch::{
    ClearScrollParts, OpenSearch, ScrollParts, SearchParts,
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use trawl_log::{debug, info};

/// OpenSearch client for searches and scrolls.
#[derive(Clone)]
pub struct OpenSearchClient {
    client: Arc<OpenSearch>,
    config: Arc<SearchConfig>,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client.
    pub fn new(config: SearchConfig) -> Result<Self> {
        info!("Initializing OpenSearch client for: {:?}", config.urls);

        let url = config
            .urls
            .first()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SearchError::Configuration("No URLs provided".to_string()))?;

        let url = opensearch::http::Url::parse(url)
            .map_err(|e| SearchError::Configuration(format!("Invalid URL: {}", e)))?;

        let conn_pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(config.request_timeout)
            .disable_proxy();

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.auth(opensearch::auth::Credentials::Basic(
                user.clone(),
                pass.clone(),
            ));
        }

        let transport = builder
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let client = OpenSearch::new(transport);

        debug!("OpenSearch client initialized");

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
        })
    }

    /// Get the underlying OpenSearch client.
    pub fn inner(&self) -> &OpenSearch {
        &self.client
    }

    /// Get the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Start building a search.
    pub fn search(&self) -> SearchBuilder<'_, Self> {
        SearchBuilder::new(self)
    }

    /// Stream every document matching `body` through a scroll cursor.
    pub async fn scan(&self, body: SearchBody, options: ScrollOptions) -> Result<ScrollStream> {
        ScrollStream::start(self.clone(), body, options).await
    }

    /// Check that the cluster answers.
    pub async fn ping(&self) -> Result<bool> {
        let response = self.client.ping().send().await?;
        Ok(response.status_code().is_success())
    }
}

impl fmt::Debug for OpenSearchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSearchClient")
            .field("urls", &self.config.urls)
            .finish()
    }
}

async fn read(response: Response) -> Result<(u16, String)> {
    let status = response.status_code().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

#[async_trait]
impl SearchTransport for OpenSearchClient {
    async fn search(&self, indices: &[String], body: Value, scroll: Option<&str>) -> Result<SearchResponse> {
        debug!("Searching indices: {:?}", indices);

        let index_refs: Vec<&str> = indices.iter().map(String::as_str).collect();
        let parts = if index_refs.is_empty() {
            SearchParts::None
        } else {
            SearchParts::Index(&index_refs)
        };

        let mut request = self.client.search(parts).body(body);
        if let Some(ttl) = scroll {
            request = request.scroll(ttl);
        }

        let (status, text) = read(request.send().await?).await?;
        decode_search(status, &text)
    }

    async fn scroll(&self, ttl: &str, scroll_id: &str) -> Result<SearchResponse> {
        debug!("Fetching next scroll page");

        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({ "scroll": ttl, "scroll_id": scroll_id }))
            .send()
            .await?;

        let (status, text) = read(response).await?;
        decode_search(status, &text)
    }

    async fn clear_scroll(&self, scroll_ids: &[String]) -> Result<ClearScrollResponse> {
        debug!("Releasing {} scroll cursor(s)", scroll_ids.len());

        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": scroll_ids }))
            .send()
            .await?;

        let (status, text) = read(response).await?;
        decode_clear_scroll(status, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_url() {
        let err = OpenSearchClient::new(SearchConfig::cluster(Vec::new())).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));

        let err = OpenSearchClient::new(SearchConfig::new("")).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
    }

    #[test]
    fn test_client_rejects_bad_url() {
        let err = OpenSearchClient::new(SearchConfig::new("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_client_debug_hides_credentials() {
        let client = OpenSearchClient::new(
            SearchConfig::new("http://localhost:9200").with_basic_auth("admin", "hunter2"),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("localhost"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    #[ignore = "requires OpenSearch"]
    async fn test_ping_live_cluster() {
        let client = OpenSearchClient::new(SearchConfig::new("http://localhost:9200")).unwrap();
        assert!(client.ping().await.unwrap());
    }
}
