//! The transport seam between request building and the network.

use crate::error::Result;
use crate::response::{ClearScrollResponse, SearchResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Executes search and scroll requests.
///
/// [`OpenSearchClient`](crate::OpenSearchClient) implements this over HTTP.
/// Tests substitute a scripted implementation.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Run a search against `indices` (all indices when empty).
    ///
    /// With `scroll` set, the response opens a scroll cursor kept alive for
    /// that duration.
    async fn search(&self, indices: &[String], body: Value, scroll: Option<&str>) -> Result<SearchResponse>;

    /// Fetch the next scroll page.
    async fn scroll(&self, ttl: &str, scroll_id: &str) -> Result<SearchResponse>;

    /// Release scroll cursors.
    async fn clear_scroll(&self, scroll_ids: &[String]) -> Result<ClearScrollResponse>;
}

#[async_trait]
impl<T: SearchTransport + ?Sized> SearchTransport for Arc<T> {
    async fn search(&self, indices: &[String], body: Value, scroll: Option<&str>) -> Result<SearchResponse> {
        (**self).search(indices, body, scroll).await
    }

    async fn scroll(&self, ttl: &str, scroll_id: &str) -> Result<SearchResponse> {
        (**self).scroll(ttl, scroll_id).await
    }

    async fn clear_scroll(&self, scroll_ids: &[String]) -> Result<ClearScrollResponse> {
        (**self).clear_scroll(scroll_ids).await
    }
}
