//! Top-level search request body.

use crate::aggregation::Aggregation;
use crate::document::{Document, DocumentExt, Node, compose, single};
use crate::error::ValidationError;
use crate::highlight::Highlight;
use crate::query::Query;
use crate::suggest::Suggest;
use serde_json::Value;

/// Page size written when none is set.
pub const DEFAULT_SIZE: u64 = 10;

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Which `_source` fields to return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    /// Fields to include.
    pub includes: Vec<String>,
    /// Fields to exclude.
    pub excludes: Vec<String>,
}

impl SourceFilter {
    /// True when neither list has entries.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut doc = Document::new();
        doc.put_list("includes", self.includes.clone());
        doc.put_list("excludes", self.excludes.clone());
        Value::Object(doc)
    }
}

/// A complete search request body.
///
/// `from` is always written and `size` falls back to [`DEFAULT_SIZE`].
/// Other sections are written only when set, in this order: query, aggs,
/// from, size, sort, _source, highlight, suggest, search_after,
/// track_total_hits.
///
/// ```
/// use trawl_search::{SearchBody, SortOrder, TermQuery};
///
/// let body = SearchBody::new()
///     .query(TermQuery::new("status", "published"))
///     .size(20)
///     .sort("date", SortOrder::Desc);
///
/// assert_eq!(
///     body.to_compact_string().unwrap(),
///     r#"{"query":{"term":{"status":{"value":"published"}}},"from":0,"size":20,"sort":[{"date":"desc"}]}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchBody {
    query: Option<Query>,
    aggs: Vec<Aggregation>,
    from: u64,
    size: Option<u64>,
    sort: Vec<Value>,
    source: SourceFilter,
    highlight: Option<Highlight>,
    suggest: Option<Suggest>,
    search_after: Option<Vec<Value>>,
    track_total_hits: Option<bool>,
}

impl SearchBody {
    /// Create an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query.
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Add a top-level aggregation.
    pub fn aggregation(mut self, agg: Aggregation) -> Self {
        self.aggs.push(agg);
        self
    }

    /// Add several top-level aggregations.
    pub fn aggregations(mut self, aggs: impl IntoIterator<Item = Aggregation>) -> Self {
        self.aggs.extend(aggs);
        self
    }

    /// Set pagination offset.
    pub fn from(mut self, from: u64) -> Self {
        self.from = from;
        self
    }

    /// Set result size limit.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Append a `{field: order}` sort entry.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(Value::Object(single(field, order.as_str())));
        self
    }

    /// Append an arbitrary sort entry.
    pub fn sort_raw(mut self, sort: Value) -> Self {
        self.sort.push(sort);
        self
    }

    /// Replace the whole sort list.
    pub fn set_sort(mut self, sort: Vec<Value>) -> Self {
        self.sort = sort;
        self
    }

    /// Add `_source` fields.
    ///
    /// `key` is `"includes"` or `"excludes"`; any other key is treated as
    /// `"includes"`.
    pub fn source<S: Into<String>>(self, key: &str, fields: impl IntoIterator<Item = S>) -> Self {
        match key {
            "excludes" => self.source_excludes(fields),
            _ => self.source_includes(fields),
        }
    }

    /// Only return these source fields.
    pub fn source_includes<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.source.includes.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Leave these source fields out.
    pub fn source_excludes<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.source.excludes.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Set highlighting.
    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    /// Set the suggest block.
    pub fn suggest(mut self, suggest: Suggest) -> Self {
        self.suggest = Some(suggest);
        self
    }

    /// Continue after the sort values of a previous hit.
    pub fn search_after(mut self, values: Vec<Value>) -> Self {
        self.search_after = Some(values);
        self
    }

    /// Track total hits accurately (for counts > 10000).
    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = Some(track);
        self
    }

    /// The size that will be written.
    pub fn effective_size(&self) -> u64 {
        self.size.unwrap_or(DEFAULT_SIZE)
    }

    /// Current sort entries.
    pub fn sort_entries(&self) -> &[Value] {
        &self.sort
    }

    /// Build the request document.
    pub fn build(&self) -> Result<Document, ValidationError> {
        self.serialize()
    }

    /// Indented JSON.
    pub fn to_pretty_string(&self) -> Result<String, ValidationError> {
        let doc = Value::Object(self.build()?);
        // Rendering an in-memory Value cannot fail.
        Ok(serde_json::to_string_pretty(&doc).unwrap_or_default())
    }

    /// Single-line JSON.
    pub fn to_compact_string(&self) -> Result<String, ValidationError> {
        Ok(Value::Object(self.build()?).to_string())
    }
}

impl Node for SearchBody {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut body = Document::new();
        if let Some(query) = &self.query {
            body.put("query", query.serialize()?);
        }
        if !self.aggs.is_empty() {
            body.put("aggs", compose(&self.aggs)?);
        }
        body.put("from", self.from);
        body.put("size", self.effective_size());
        body.put_list("sort", self.sort.clone());
        if !self.source.is_empty() {
            body.put("_source", self.source.to_json());
        }
        if let Some(highlight) = &self.highlight {
            body.put("highlight", highlight.serialize()?);
        }
        if let Some(suggest) = &self.suggest {
            body.put("suggest", suggest.serialize()?);
        }
        body.put_opt("search_after", self.search_after.clone());
        body.put_opt("track_total_hits", self.track_total_hits);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{AggregationExt, MetricAggregation, TermsAggregation};
    use crate::query::{BoolQuery, RangeQuery, TermQuery};
    use serde_json::json;

    #[test]
    fn test_empty_body_defaults() {
        let body = SearchBody::new();
        assert_eq!(Value::Object(body.build().unwrap()), json!({"from": 0, "size": 10}));
        assert_eq!(body.to_compact_string().unwrap(), r#"{"from":0,"size":10}"#);
    }

    #[test]
    fn test_section_order() {
        let body = SearchBody::new()
            .track_total_hits(true)
            .search_after(vec![json!(1)])
            .source_includes(["title"])
            .sort("date", SortOrder::Asc)
            .size(5)
            .from(10)
            .aggregation(MetricAggregation::sum("n").named("total"))
            .query(Query::MatchAll);
        let doc = body.build().unwrap();
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(
            keys,
            vec!["query", "aggs", "from", "size", "sort", "_source", "search_after", "track_total_hits"]
        );
    }

    #[test]
    fn test_source_key_fallback() {
        let body = SearchBody::new()
            .source("excludes", ["secret"])
            .source("fields", ["title", "body"]);
        assert_eq!(
            body.build().unwrap()["_source"],
            json!({"includes": ["title", "body"], "excludes": ["secret"]})
        );
    }

    #[test]
    fn test_set_sort_replaces() {
        let body = SearchBody::new()
            .sort("a", SortOrder::Asc)
            .sort("b", SortOrder::Desc)
            .set_sort(vec![json!({"_doc": "asc"})]);
        assert_eq!(body.sort_entries(), &[json!({"_doc": "asc"})]);
    }

    #[test]
    fn test_first_error_aborts_build() {
        let body = SearchBody::new()
            .query(BoolQuery::new().must(RangeQuery::new("age")))
            .aggregation(TermsAggregation::new("tag").named("tags"));
        assert!(body.build().is_err());
        assert!(body.to_pretty_string().is_err());
        assert!(body.to_compact_string().is_err());
    }

    #[test]
    fn test_pretty_and_compact_agree() {
        let body = SearchBody::new()
            .query(TermQuery::new("user", "kim"))
            .aggregation(TermsAggregation::new("tag").named("tags"));
        let pretty: Value = serde_json::from_str(&body.to_pretty_string().unwrap()).unwrap();
        let compact: Value = serde_json::from_str(&body.to_compact_string().unwrap()).unwrap();
        assert_eq!(pretty, compact);
        assert!(body.to_pretty_string().unwrap().contains('\n'));
    }
}
