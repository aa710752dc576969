//! Fluent search execution.

use crate::{
    aggregation::Aggregation,
    body::{SearchBody, SortOrder},
    error::Result,
    query::Query,
    response::SearchResponse,
    scroll::{ScrollOptions, ScrollStream},
    transport::SearchTransport,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use trawl_log::debug;

/// Search builder for constructing and executing searches.
///
/// Wraps a [`SearchBody`] together with the target indices and the transport
/// that will run it.
pub struct SearchBuilder<'a, T: SearchTransport + ?Sized> {
    transport: &'a T,
    indices: Vec<String>,
    body: SearchBody,
}

impl<'a, T: SearchTransport + ?Sized> SearchBuilder<'a, T> {
    /// Create a search builder over `transport`.
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            indices: Vec::new(),
            body: SearchBody::new(),
        }
    }

    /// Add an index to search.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    /// Set the indices to search.
    pub fn indices(mut self, indices: Vec<String>) -> Self {
        self.indices = indices;
        self
    }

    /// Replace the whole request body.
    pub fn body(mut self, body: SearchBody) -> Self {
        self.body = body;
        self
    }

    /// Set the query.
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.body = self.body.query(query);
        self
    }

    /// Add an aggregation.
    pub fn aggregation(mut self, agg: Aggregation) -> Self {
        self.body = self.body.aggregation(agg);
        self
    }

    /// Set pagination offset.
    pub fn from(mut self, from: u64) -> Self {
        self.body = self.body.from(from);
        self
    }

    /// Set result size limit.
    pub fn size(mut self, size: u64) -> Self {
        self.body = self.body.size(size);
        self
    }

    /// Add sort field.
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.body = self.body.sort(field, order);
        self
    }

    /// The body as built so far.
    pub fn as_body(&self) -> &SearchBody {
        &self.body
    }

    /// Execute the search.
    pub async fn send(self) -> Result<SearchResponse> {
        let document = self.body.build()?;
        debug!("Executing search on {:?}", self.indices);
        self.transport
            .search(&self.indices, Value::Object(document), None)
            .await
    }

    /// Execute the search and decode each hit's source.
    pub async fn execute<D: DeserializeOwned>(self) -> Result<Vec<D>> {
        self.send().await?.documents()
    }
}

impl<'a, T: SearchTransport + Clone + 'static> SearchBuilder<'a, T> {
    /// Stream every match through a scroll cursor instead of one page.
    ///
    /// Indices set on the builder are added to `options`.
    pub async fn scan(self, mut options: ScrollOptions) -> Result<ScrollStream> {
        options.indices.extend(self.indices);
        ScrollStream::start(self.transport.clone(), self.body, options).await
    }
}
