//! Integration tests for common trawl workflows.
//!
//! These tests go through the umbrella crate's re-exports only.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use trawl::prelude::*;
use trawl::{ClearScrollResponse, ClientSettings, decode_search};

// =============================================================================
// Request Building
// =============================================================================

#[test]
fn test_build_filtered_search() {
    let body = SearchBody::new()
        .query(
            BoolQuery::new()
                .filter(TermQuery::new("status", "active"))
                .filter(RangeQuery::new("age").gte(18)),
        )
        .aggregation(
            TermsAggregation::new("country")
                .named("by_country")
                .sub_aggregation(MetricAggregation::avg("age").named("avg_age")),
        )
        .size(0);

    let doc = body.build().unwrap();
    assert_eq!(doc["size"], json!(0));
    assert_eq!(
        doc["aggs"]["by_country"]["aggs"]["avg_age"],
        json!({"avg": {"field": "age"}})
    );
}

#[test]
fn test_invalid_node_is_rejected_before_sending() {
    let err = SearchBody::new()
        .aggregation(TermsAggregation::new("").named("broken"))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("field"));
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
struct User {
    name: String,
}

#[test]
fn test_decode_documents() {
    let response = decode_search(
        200,
        r#"{"hits": {"hits": [{"_id": "1", "_index": "users", "_source": {"name": "ada"}}]}}"#,
    )
    .unwrap();

    let users: Vec<User> = response.documents().unwrap();
    assert_eq!(users[0].name, "ada");
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_settings_to_configs() {
    let settings =
        ClientSettings::from_json(r#"{"host": "127.0.0.1", "port": 9200, "max_count": 4}"#).unwrap();

    let config = settings.search_config();
    assert_eq!(config.urls, vec!["http://127.0.0.1:9200"]);
    assert_eq!(settings.pool_config().max_size, 4);
}

// =============================================================================
// Scrolling
// =============================================================================

/// Serves one page of hits, then an empty page.
#[derive(Clone, Default)]
struct OnePage {
    released: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SearchTransport for OnePage {
    async fn search(&self, _indices: &[String], _body: Value, _scroll: Option<&str>) -> Result<SearchResponse> {
        decode_search(
            200,
            r#"{"_scroll_id": "S1", "hits": {"hits": [
                {"_id": "1", "_source": {"name": "ada"}},
                {"_id": "2", "_source": {"name": "grace"}}
            ]}}"#,
        )
    }

    async fn scroll(&self, _ttl: &str, _scroll_id: &str) -> Result<SearchResponse> {
        decode_search(200, r#"{"_scroll_id": "S1", "hits": {"hits": []}}"#)
    }

    async fn clear_scroll(&self, scroll_ids: &[String]) -> Result<ClearScrollResponse> {
        self.released.lock().unwrap().extend_from_slice(scroll_ids);
        Ok(ClearScrollResponse::default())
    }
}

#[tokio::test]
async fn test_scroll_workflow() {
    let transport = OnePage::default();

    let hits = ScrollStream::start(transport.clone(), SearchBody::new(), ScrollOptions::new().index("users"))
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let names: Vec<String> = hits
        .iter()
        .map(|h| h.source_as::<User>().unwrap().name)
        .collect();
    assert_eq!(names, vec!["ada", "grace"]);
    assert_eq!(*transport.released.lock().unwrap(), vec!["S1".to_string()]);
}

#[test]
fn test_log_capture_is_reexported() {
    let (_, entries) = trawl::trawl_log::capture(|| trawl::trawl_log::warn!("checked"));
    assert_eq!(entries.len(), 1);
}
