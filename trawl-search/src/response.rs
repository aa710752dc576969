//! Response models.

use crate::error::{Result, SearchError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Decoded search or scroll response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Time taken in milliseconds.
    #[serde(default)]
    pub took: u64,
    /// Whether the search timed out.
    #[serde(default)]
    pub timed_out: bool,
    /// Shard statistics.
    #[serde(rename = "_shards", default)]
    pub shards: Option<Shards>,
    /// Matching documents.
    #[serde(default)]
    pub hits: Hits,
    /// Aggregation results, decoded lazily.
    #[serde(default)]
    pub aggregations: Option<AggregationResults>,
    /// Suggestions by suggester name.
    #[serde(default)]
    pub suggest: HashMap<String, Vec<SuggestEntry>>,
    /// Scroll cursor, when the request opened or continued a scroll.
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,
    /// Error document, if the cluster returned one.
    #[serde(default)]
    pub error: Option<RemoteError>,
    /// Status echoed by the cluster alongside an error.
    #[serde(default)]
    pub status: Option<u16>,
}

impl SearchResponse {
    /// Decode every hit's `_source` into `T`.
    pub fn documents<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.hits.hits.iter().map(Hit::source_as).collect()
    }

    /// Total hit count, if reported.
    pub fn total(&self) -> Option<u64> {
        self.hits.total.as_ref().map(TotalHits::value)
    }
}

/// Shard statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shards {
    /// Shards queried.
    #[serde(default)]
    pub total: u32,
    /// Shards that answered.
    #[serde(default)]
    pub successful: u32,
    /// Shards skipped.
    #[serde(default)]
    pub skipped: u32,
    /// Shards that failed.
    #[serde(default)]
    pub failed: u32,
}

/// The `hits` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hits {
    /// Total matches.
    #[serde(default)]
    pub total: Option<TotalHits>,
    /// Best score.
    #[serde(default)]
    pub max_score: Option<f64>,
    /// This page of hits.
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Total hit count, in either wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    /// Plain count.
    Count(u64),
    /// Count with relation (`eq` or `gte`).
    Detailed {
        /// Count.
        value: u64,
        /// Relation to the real total.
        relation: String,
    },
}

impl TotalHits {
    /// The count, regardless of shape.
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(v) => *v,
            TotalHits::Detailed { value, .. } => *value,
        }
    }
}

/// A single search hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hit {
    /// Index the document lives in.
    #[serde(rename = "_index", default)]
    pub index: String,
    /// Mapping type, on clusters that still report one.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    /// Document ID.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Relevance score.
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    /// Document source.
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
    /// Highlighted fragments by field.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub highlight: HashMap<String, Vec<String>>,
    /// Sort values, usable with `search_after`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
}

impl Hit {
    /// Decode `_source` into `T`.
    pub fn source_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.source.clone()))?)
    }
}

/// One entry of a suggester's output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestEntry {
    /// Input text fragment.
    #[serde(default)]
    pub text: String,
    /// Offset in the input.
    #[serde(default)]
    pub offset: u32,
    /// Length in the input.
    #[serde(default)]
    pub length: u32,
    /// Suggestions.
    #[serde(default)]
    pub options: Vec<SuggestOption>,
}

/// A single suggestion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestOption {
    /// Suggested text.
    #[serde(default)]
    pub text: String,
    /// Index of the source document (completion suggester).
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    /// ID of the source document (completion suggester).
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Score.
    #[serde(alias = "_score", default)]
    pub score: Option<f64>,
    /// Document frequency (term suggester).
    #[serde(default)]
    pub freq: Option<u64>,
    /// Source of the suggested document.
    #[serde(rename = "_source", default)]
    pub source: Option<Map<String, Value>>,
}

/// Aggregation results keyed by top-level aggregation name.
///
/// Each value stays undecoded until it is read, so a large result only pays
/// for the subtrees that are actually used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AggregationResults(pub(crate) HashMap<String, Box<RawValue>>);

/// Error document returned by the cluster.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RemoteError {
    /// Structured error.
    Detailed(RemoteErrorDetail),
    /// Bare message.
    Message(String),
}

impl RemoteError {
    /// Error type, or `"unknown"` for bare messages.
    pub fn error_type(&self) -> &str {
        match self {
            RemoteError::Detailed(d) if !d.error_type.is_empty() => &d.error_type,
            _ => "unknown",
        }
    }

    /// Most specific reason available.
    pub fn reason(&self) -> &str {
        match self {
            RemoteError::Detailed(d) => d
                .reason
                .as_deref()
                .or_else(|| d.root_cause.first().and_then(|c| c.reason.as_deref()))
                .unwrap_or("Unknown error"),
            RemoteError::Message(m) => m,
        }
    }
}

/// Structured error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteErrorDetail {
    /// Error type.
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Root causes.
    #[serde(default)]
    pub root_cause: Vec<RemoteCause>,
    /// Underlying cause.
    #[serde(default)]
    pub caused_by: Option<RemoteCause>,
}

/// A cause entry inside an error document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteCause {
    /// Error type.
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Result of releasing scroll cursors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearScrollResponse {
    /// Whether every cursor was released.
    #[serde(default)]
    pub succeeded: bool,
    /// Number of search contexts freed.
    #[serde(default)]
    pub num_freed: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<RemoteError>,
}

fn remote(status: u16, error: Option<&RemoteError>, body: &str) -> SearchError {
    match error {
        Some(e) => SearchError::Remote {
            status,
            error_type: e.error_type().to_string(),
            reason: e.reason().to_string(),
        },
        None => SearchError::Remote {
            status,
            error_type: "unknown".to_string(),
            reason: if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body.to_string()
            },
        },
    }
}

/// Decode a search or scroll response body.
///
/// A non-success status or an `error` member is a [`SearchError::Remote`];
/// an undecodable success body is a [`SearchError::Protocol`].
pub fn decode_search(status: u16, body: &str) -> Result<SearchResponse> {
    if !(200..300).contains(&status) {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
        return Err(remote(status, envelope.as_ref().and_then(|e| e.error.as_ref()), body));
    }
    let response: SearchResponse = serde_json::from_str(body)?;
    if let Some(error) = &response.error {
        return Err(remote(response.status.unwrap_or(status), Some(error), body));
    }
    Ok(response)
}

/// Decode a clear-scroll response body.
///
/// A 404 means the cursors were already gone and counts as nothing freed.
pub fn decode_clear_scroll(status: u16, body: &str) -> Result<ClearScrollResponse> {
    if status == 404 {
        return Ok(serde_json::from_str(body).unwrap_or_default());
    }
    if !(200..300).contains(&status) {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
        return Err(remote(status, envelope.as_ref().and_then(|e| e.error.as_ref()), body));
    }
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const PAGE: &str = r#"{
        "took": 3,
        "timed_out": false,
        "_shards": {"total": 1, "successful": 1, "skipped": 0, "failed": 0},
        "_scroll_id": "C1",
        "hits": {
            "total": {"value": 2, "relation": "eq"},
            "max_score": 1.0,
            "hits": [
                {"_index": "articles", "_id": "1", "_score": 1.0, "_source": {"title": "a"},
                 "highlight": {"title": ["<em>a</em>"]}},
                {"_index": "articles", "_type": "_doc", "_id": "2", "_score": null, "_source": {"title": "b"}}
            ]
        },
        "aggregations": {"tags": {"buckets": []}}
    }"#;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Article {
        title: String,
    }

    #[test]
    fn test_decode_page() {
        let resp = decode_search(200, PAGE).unwrap();
        assert_eq!(resp.took, 3);
        assert_eq!(resp.total(), Some(2));
        assert_eq!(resp.scroll_id.as_deref(), Some("C1"));
        assert_eq!(resp.hits.hits.len(), 2);
        assert_eq!(resp.hits.hits[0].highlight["title"], vec!["<em>a</em>"]);
        assert_eq!(resp.hits.hits[1].doc_type.as_deref(), Some("_doc"));
        assert!(resp.hits.hits[1].score.is_none());
        assert!(resp.aggregations.is_some());

        let docs: Vec<Article> = resp.documents().unwrap();
        assert_eq!(docs[1], Article { title: "b".into() });
    }

    #[test]
    fn test_total_as_plain_number() {
        let resp = decode_search(200, r#"{"hits": {"total": 7, "hits": []}}"#).unwrap();
        assert_eq!(resp.hits.total, Some(TotalHits::Count(7)));
    }

    #[test]
    fn test_error_status() {
        let body = r#"{"error": {"root_cause": [{"type": "index_not_found_exception", "reason": "no such index [x]"}],
                       "type": "index_not_found_exception", "reason": "no such index [x]"}, "status": 404}"#;
        match decode_search(404, body) {
            Err(SearchError::Remote { status, error_type, reason }) => {
                assert_eq!(status, 404);
                assert_eq!(error_type, "index_not_found_exception");
                assert_eq!(reason, "no such index [x]");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_error_document_with_success_status() {
        let body = r#"{"error": {"type": "search_phase_execution_exception"}, "status": 500}"#;
        let err = decode_search(200, body).unwrap_err();
        assert_eq!(err.remote_type(), Some("search_phase_execution_exception"));
    }

    #[test]
    fn test_non_json_failure_body() {
        let err = decode_search(502, "Bad Gateway").unwrap_err();
        assert!(matches!(err, SearchError::Remote { status: 502, ref reason, .. } if reason == "Bad Gateway"));
    }

    #[test]
    fn test_malformed_success_body() {
        assert!(matches!(decode_search(200, "{not json"), Err(SearchError::Protocol(_))));
    }

    #[test]
    fn test_clear_scroll() {
        let resp = decode_clear_scroll(200, r#"{"succeeded": true, "num_freed": 1}"#).unwrap();
        assert!(resp.succeeded);
        assert_eq!(resp.num_freed, 1);

        let resp = decode_clear_scroll(404, r#"{"succeeded": true, "num_freed": 0}"#).unwrap();
        assert_eq!(resp.num_freed, 0);

        assert!(decode_clear_scroll(500, "{}").is_err());
    }
}
