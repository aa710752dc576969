//! Typed search requests and scroll streaming for OpenSearch/Elasticsearch.
//!
//! This crate provides:
//! - A query DSL whose nodes validate themselves and serialize to request
//!   documents (queries, aggregations, scripts, function scores, highlight,
//!   suggesters)
//! - A search envelope ([`SearchBody`]) that assembles a complete request
//! - Response models and dotted-path access into aggregation results
//! - A scroll stream that walks every match with a background worker
//! - An `opensearch`-backed client and an explicit client pool
//!
//! # Example
//!
//! ```rust,no_run
//! use trawl_search::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenSearchClient::new(SearchConfig::new("http://localhost:9200"))?;
//!
//!     let query = BoolQuery::new()
//!         .filter(TermQuery::new("status", "active"))
//!         .filter(RangeQuery::new("age").gte(18));
//!
//!     let users: Vec<User> = client
//!         .search()
//!         .index("users")
//!         .query(query)
//!         .size(20)
//!         .execute()
//!         .await?;
//!
//!     println!("Found {} users", users.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod accessor;
mod aggregation;
mod body;
mod client;
mod config;
mod document;
mod error;
mod highlight;
mod pool;
mod query;
mod response;
mod score;
mod script;
mod scroll;
mod search;
mod suggest;
mod transport;

pub use aggregation::{
    Aggregation, AggregationExt, AggregationKind, CardinalityAggregation,
    DateHistogramAggregation, FilterAggregation, FiltersAggregation, HistogramAggregation,
    Interval, Metric, MetricAggregation, MissingAggregation, NestedAggregation,
    PipelineAggregation, PipelineKind, RangeAggregation, RangeBucket, TermsAggregation,
    TopHitsAggregation,
};
pub use body::{DEFAULT_SIZE, SearchBody, SortOrder, SourceFilter};
pub use client::OpenSearchClient;
pub use config::{ClientSettings, ENV_PREFIX, PoolConfig, SearchConfig};
pub use document::{Document, NamedNode, Node, compose};
pub use error::{Result, SearchError, ValidationError};
pub use highlight::{Highlight, HighlightField};
pub use pool::{ClientManager, ClientPool, PooledClient};
pub use query::{
    BoolQuery, Bound, ConstantScoreQuery, ExistsQuery, MatchPhraseQuery, MatchQuery,
    MultiMatchQuery, NestedQuery, PrefixQuery, Query, QueryStringQuery, RangeQuery, TermQuery,
    TermsQuery, WildcardQuery,
};
pub use response::{
    AggregationResults, ClearScrollResponse, Hit, Hits, RemoteCause, RemoteError,
    RemoteErrorDetail, SearchResponse, Shards, SuggestEntry, SuggestOption, TotalHits,
    decode_clear_scroll, decode_search,
};
pub use score::{FieldValueFactor, FunctionScoreQuery, RandomScore, ScoreFunction};
pub use script::Script;
pub use scroll::{DEFAULT_PAGE_SIZE, DEFAULT_TTL, ScrollOptions, ScrollState, ScrollStream};
pub use search::SearchBuilder;
pub use suggest::{CompletionSuggester, Suggest, Suggester, TermSuggester};
pub use transport::SearchTransport;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Aggregation, AggregationExt, BoolQuery, ClientPool, Hit, MatchQuery, MetricAggregation,
        Node, OpenSearchClient, PoolConfig, Query, RangeQuery, Result, ScrollOptions,
        ScrollStream, SearchBody, SearchConfig, SearchError, SearchResponse, SearchTransport,
        SortOrder, TermQuery, TermsAggregation,
    };
}
