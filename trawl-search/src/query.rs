//! Query DSL for OpenSearch/Elasticsearch.
//!
//! Every query kind is a plain struct with consuming builder methods. They
//! convert into the [`Query`] enum, which is what compound queries and
//! [`SearchBody`](crate::SearchBody) accept.
//!
//! ```
//! use trawl_search::{BoolQuery, Node, Query, RangeQuery, TermQuery};
//!
//! let query: Query = BoolQuery::new()
//!     .filter(TermQuery::new("status", "published"))
//!     .should(RangeQuery::new("likes").gte(10))
//!     .into();
//!
//! let doc = query.serialize().unwrap();
//! assert_eq!(doc["bool"]["minimum_should_match"], 1);
//! ```

use crate::document::{Document, DocumentExt, Node, is_unset, single};
use crate::error::ValidationError;
use crate::score::FunctionScoreQuery;
use serde_json::Value;

/// Query types supported by the DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Match all documents.
    MatchAll,
    /// Boolean composition of other queries.
    Bool(BoolQuery),
    /// Exact value on a field.
    Term(TermQuery),
    /// Any of several exact values on a field.
    Terms(TermsQuery),
    /// Bounded range on a field.
    Range(RangeQuery),
    /// Field has a value.
    Exists(ExistsQuery),
    /// Analyzed full-text match.
    Match(MatchQuery),
    /// Phrase match.
    MatchPhrase(MatchPhraseQuery),
    /// Full-text match over several fields.
    MultiMatch(MultiMatchQuery),
    /// Query against nested objects.
    Nested(NestedQuery),
    /// Filter with a constant score.
    ConstantScore(ConstantScoreQuery),
    /// Rescoring wrapper.
    FunctionScore(FunctionScoreQuery),
    /// Wildcard pattern.
    Wildcard(WildcardQuery),
    /// Prefix match.
    Prefix(PrefixQuery),
    /// Lucene query string.
    QueryString(QueryStringQuery),
    /// Raw JSON query, passed through unchanged.
    Raw(Value),
}

impl Query {
    /// Match all documents.
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    /// Exact value on a field.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        TermQuery::new(field, value).into()
    }

    /// Analyzed match on a field.
    pub fn matches(field: impl Into<String>, query: impl Into<String>) -> Self {
        MatchQuery::new(field, query).into()
    }

    /// Raw JSON query. Must be an object.
    pub fn raw(value: Value) -> Self {
        Query::Raw(value)
    }
}

impl Node for Query {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Query::MatchAll => Ok(()),
            Query::Bool(q) => q.validate(),
            Query::Term(q) => q.validate(),
            Query::Terms(q) => q.validate(),
            Query::Range(q) => q.validate(),
            Query::Exists(q) => q.validate(),
            Query::Match(q) => q.validate(),
            Query::MatchPhrase(q) => q.validate(),
            Query::MultiMatch(q) => q.validate(),
            Query::Nested(q) => q.validate(),
            Query::ConstantScore(q) => q.validate(),
            Query::FunctionScore(q) => q.validate(),
            Query::Wildcard(q) => q.validate(),
            Query::Prefix(q) => q.validate(),
            Query::QueryString(q) => q.validate(),
            Query::Raw(v) if v.is_object() => Ok(()),
            Query::Raw(_) => Err(ValidationError::NotAnObject { kind: "raw query" }),
        }
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        match self {
            Query::MatchAll => Ok(single("match_all", Document::new())),
            Query::Bool(q) => q.serialize(),
            Query::Term(q) => q.serialize(),
            Query::Terms(q) => q.serialize(),
            Query::Range(q) => q.serialize(),
            Query::Exists(q) => q.serialize(),
            Query::Match(q) => q.serialize(),
            Query::MatchPhrase(q) => q.serialize(),
            Query::MultiMatch(q) => q.serialize(),
            Query::Nested(q) => q.serialize(),
            Query::ConstantScore(q) => q.serialize(),
            Query::FunctionScore(q) => q.serialize(),
            Query::Wildcard(q) => q.serialize(),
            Query::Prefix(q) => q.serialize(),
            Query::QueryString(q) => q.serialize(),
            Query::Raw(Value::Object(map)) => Ok(map.clone()),
            Query::Raw(_) => Err(ValidationError::NotAnObject { kind: "raw query" }),
        }
    }
}

macro_rules! into_query {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Query {
                fn from(q: $ty) -> Self {
                    Query::$variant(q)
                }
            }
        )*
    };
}

into_query! {
    BoolQuery => Bool,
    TermQuery => Term,
    TermsQuery => Terms,
    RangeQuery => Range,
    ExistsQuery => Exists,
    MatchQuery => Match,
    MatchPhraseQuery => MatchPhrase,
    MultiMatchQuery => MultiMatch,
    NestedQuery => Nested,
    ConstantScoreQuery => ConstantScore,
    FunctionScoreQuery => FunctionScore,
    WildcardQuery => Wildcard,
    PrefixQuery => Prefix,
    QueryStringQuery => QueryString,
}

fn require(kind: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField { kind, field });
    }
    Ok(())
}

/// `{kind: {field: inner}}`
fn field_keyed(kind: &str, field: &str, inner: Document) -> Document {
    single(kind, single(field, inner))
}

fn serialize_all(queries: &[Query]) -> Result<Vec<Value>, ValidationError> {
    queries
        .iter()
        .map(|q| q.serialize().map(Value::Object))
        .collect()
}

// =============================================================================
// Compound queries
// =============================================================================

/// Bool query for combining multiple queries.
///
/// When any `should` clause is present, `minimum_should_match` defaults to 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    filter: Vec<Query>,
    must: Vec<Query>,
    must_not: Vec<Query>,
    should: Vec<Query>,
    minimum_should_match: Option<i64>,
    boost: Option<f64>,
}

impl BoolQuery {
    /// Create an empty bool query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter clause (non-scoring).
    pub fn filter(mut self, query: impl Into<Query>) -> Self {
        self.filter.push(query.into());
        self
    }

    /// Add a must clause.
    pub fn must(mut self, query: impl Into<Query>) -> Self {
        self.must.push(query.into());
        self
    }

    /// Add a must_not clause.
    pub fn must_not(mut self, query: impl Into<Query>) -> Self {
        self.must_not.push(query.into());
        self
    }

    /// Add a should clause.
    pub fn should(mut self, query: impl Into<Query>) -> Self {
        self.should.push(query.into());
        self
    }

    /// Set minimum should match. Only written when should clauses exist.
    pub fn minimum_should_match(mut self, min: i64) -> Self {
        self.minimum_should_match = Some(min);
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    /// True when no clause has been added.
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
            && self.must.is_empty()
            && self.must_not.is_empty()
            && self.should.is_empty()
    }
}

impl Node for BoolQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut body = Document::new();
        body.put_list("filter", serialize_all(&self.filter)?);
        body.put_list("must", serialize_all(&self.must)?);
        body.put_list("must_not", serialize_all(&self.must_not)?);
        if !self.should.is_empty() {
            body.put("should", serialize_all(&self.should)?);
            body.put("minimum_should_match", self.minimum_should_match.unwrap_or(1));
        }
        body.put_opt("boost", self.boost);
        Ok(single("bool", body))
    }
}

/// Nested query.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedQuery {
    path: String,
    query: Box<Query>,
    score_mode: Option<String>,
    boost: Option<f64>,
}

impl NestedQuery {
    /// Run `query` against the nested objects under `path`.
    pub fn new(path: impl Into<String>, query: impl Into<Query>) -> Self {
        Self {
            path: path.into(),
            query: Box::new(query.into()),
            score_mode: None,
            boost: None,
        }
    }

    /// Set score mode (avg, max, min, sum, none).
    pub fn score_mode(mut self, mode: impl Into<String>) -> Self {
        self.score_mode = Some(mode.into());
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Node for NestedQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("nested", "path", &self.path)
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut body = Document::new();
        body.put("path", self.path.clone());
        body.put("query", self.query.serialize()?);
        body.put_opt("score_mode", self.score_mode.clone());
        body.put_opt("boost", self.boost);
        Ok(single("nested", body))
    }
}

/// Constant score query.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantScoreQuery {
    filter: Box<Query>,
    boost: Option<f64>,
}

impl ConstantScoreQuery {
    /// Wrap `filter`, scoring every match the same.
    pub fn new(filter: impl Into<Query>) -> Self {
        Self {
            filter: Box::new(filter.into()),
            boost: None,
        }
    }

    /// Set the constant score.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Node for ConstantScoreQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut body = Document::new();
        body.put("filter", self.filter.serialize()?);
        body.put_opt("boost", self.boost);
        Ok(single("constant_score", body))
    }
}

// =============================================================================
// Term-level queries
// =============================================================================

/// Term query for exact matching.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    field: String,
    value: Value,
    boost: Option<f64>,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            boost: None,
        }
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Node for TermQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("term", "field", &self.field)?;
        if self.value.is_null() {
            return Err(ValidationError::MissingField {
                kind: "term",
                field: "value",
            });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut inner = Document::new();
        inner.put("value", self.value.clone());
        inner.put_opt("boost", self.boost);
        Ok(field_keyed("term", &self.field, inner))
    }
}

/// Terms query for matching any of several values.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsQuery {
    field: String,
    values: Vec<Value>,
    boost: Option<f64>,
}

impl TermsQuery {
    /// Create a new terms query.
    pub fn new<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            boost: None,
        }
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Node for TermsQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("terms", "field", &self.field)?;
        if self.values.is_empty() {
            return Err(ValidationError::MissingField {
                kind: "terms",
                field: "values",
            });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut body = Document::new();
        body.put(&self.field, self.values.clone());
        body.put_opt("boost", self.boost);
        Ok(single("terms", body))
    }
}

/// One side of a range.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// `gte` / `lte`
    Inclusive(Value),
    /// `gt` / `lt`
    Exclusive(Value),
}

/// Range query for numeric/date ranges.
///
/// Each side holds at most one bound: setting `gt` replaces `gte` and the
/// other way round. `null` and empty-string bounds are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    field: String,
    lower: Option<Bound>,
    upper: Option<Bound>,
    format: Option<String>,
    boost: Option<f64>,
}

impl RangeQuery {
    /// Create a new range query.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            lower: None,
            upper: None,
            format: None,
            boost: None,
        }
    }

    /// Set greater than.
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !is_unset(&value) {
            self.lower = Some(Bound::Exclusive(value));
        }
        self
    }

    /// Set greater than or equal.
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !is_unset(&value) {
            self.lower = Some(Bound::Inclusive(value));
        }
        self
    }

    /// Set less than.
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !is_unset(&value) {
            self.upper = Some(Bound::Exclusive(value));
        }
        self
    }

    /// Set less than or equal.
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !is_unset(&value) {
            self.upper = Some(Bound::Inclusive(value));
        }
        self
    }

    /// Set date format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Lower bound, if any.
    pub fn lower(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }

    /// Upper bound, if any.
    pub fn upper(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }
}

impl Node for RangeQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("range", "field", &self.field)?;
        if self.lower.is_none() && self.upper.is_none() {
            return Err(ValidationError::MissingBound {
                field: self.field.clone(),
            });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut inner = Document::new();
        match &self.lower {
            Some(Bound::Inclusive(v)) => inner.put("gte", v.clone()),
            Some(Bound::Exclusive(v)) => inner.put("gt", v.clone()),
            None => {}
        }
        match &self.upper {
            Some(Bound::Inclusive(v)) => inner.put("lte", v.clone()),
            Some(Bound::Exclusive(v)) => inner.put("lt", v.clone()),
            None => {}
        }
        inner.put_opt("format", self.format.clone());
        inner.put_opt("boost", self.boost);
        Ok(field_keyed("range", &self.field, inner))
    }
}

/// Exists query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsQuery {
    field: String,
    boost: Option<f64>,
}

impl ExistsQuery {
    /// Create a new exists query.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            boost: None,
        }
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Node for ExistsQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("exists", "field", &self.field)
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut body = Document::new();
        body.put("field", self.field.clone());
        body.put_opt("boost", self.boost);
        Ok(single("exists", body))
    }
}

/// Wildcard query.
#[derive(Debug, Clone, PartialEq)]
pub struct WildcardQuery {
    field: String,
    value: String,
    boost: Option<f64>,
}

impl WildcardQuery {
    /// Create a new wildcard query.
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: pattern.into(),
            boost: None,
        }
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Node for WildcardQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("wildcard", "field", &self.field)
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut inner = Document::new();
        inner.put("value", self.value.clone());
        inner.put_opt("boost", self.boost);
        Ok(field_keyed("wildcard", &self.field, inner))
    }
}

/// Prefix query.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixQuery {
    field: String,
    value: String,
    boost: Option<f64>,
}

impl PrefixQuery {
    /// Create a new prefix query.
    pub fn new(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: prefix.into(),
            boost: None,
        }
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Node for PrefixQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("prefix", "field", &self.field)
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut inner = Document::new();
        inner.put("value", self.value.clone());
        inner.put_opt("boost", self.boost);
        Ok(field_keyed("prefix", &self.field, inner))
    }
}

// =============================================================================
// Full-text queries
// =============================================================================

/// Match query for full-text search.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    field: String,
    query: String,
    analyzer: Option<String>,
    boost: Option<f64>,
    operator: Option<String>,
    fuzziness: Option<String>,
    params: Document,
}

impl MatchQuery {
    /// Create a new match query.
    pub fn new(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            query: query.into(),
            analyzer: None,
            boost: None,
            operator: None,
            fuzziness: None,
            params: Document::new(),
        }
    }

    /// Set the analyzer.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Set the operator (and/or).
    pub fn operator(mut self, op: impl Into<String>) -> Self {
        self.operator = Some(op.into());
        self
    }

    /// Set fuzziness.
    pub fn fuzziness(mut self, fuzz: impl Into<String>) -> Self {
        self.fuzziness = Some(fuzz.into());
        self
    }

    /// Extra parameter merged into the field body (zero_terms_query, ...).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Node for MatchQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("match", "field", &self.field)
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut inner = Document::new();
        inner.put("query", self.query.clone());
        inner.put_opt("analyzer", self.analyzer.clone());
        inner.put_opt("boost", self.boost);
        inner.put_opt("operator", self.operator.clone());
        inner.put_opt("fuzziness", self.fuzziness.clone());
        inner.merge(&self.params);
        Ok(field_keyed("match", &self.field, inner))
    }
}

/// Phrase match query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPhraseQuery {
    field: String,
    query: String,
    analyzer: Option<String>,
    boost: Option<f64>,
    slop: Option<u32>,
}

impl MatchPhraseQuery {
    /// Create a new phrase query.
    pub fn new(field: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            query: phrase.into(),
            analyzer: None,
            boost: None,
            slop: None,
        }
    }

    /// Set the analyzer.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Allowed distance between phrase terms.
    pub fn slop(mut self, slop: u32) -> Self {
        self.slop = Some(slop);
        self
    }
}

impl Node for MatchPhraseQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("match_phrase", "field", &self.field)
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut inner = Document::new();
        inner.put("query", self.query.clone());
        inner.put_opt("analyzer", self.analyzer.clone());
        inner.put_opt("boost", self.boost);
        inner.put_opt("slop", self.slop);
        Ok(field_keyed("match_phrase", &self.field, inner))
    }
}

/// Match over several fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiMatchQuery {
    query: String,
    fields: Vec<String>,
    search_type: Option<String>,
    analyzer: Option<String>,
    tie_breaker: Option<f64>,
    params: Document,
}

impl MultiMatchQuery {
    /// Create a new multi-match query.
    pub fn new<F: Into<String>>(query: impl Into<String>, fields: impl IntoIterator<Item = F>) -> Self {
        Self {
            query: query.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            search_type: None,
            analyzer: None,
            tie_breaker: None,
            params: Document::new(),
        }
    }

    /// Set the match type (best_fields, cross_fields, ...).
    pub fn search_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    /// Set the analyzer.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Set tie breaker.
    pub fn tie_breaker(mut self, tie_breaker: f64) -> Self {
        self.tie_breaker = Some(tie_breaker);
        self
    }

    /// Extra parameter merged into the body (operator, fuzziness, ...).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Node for MultiMatchQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            return Err(ValidationError::MissingField {
                kind: "multi_match",
                field: "fields",
            });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut body = Document::new();
        body.put("query", self.query.clone());
        body.put("fields", self.fields.clone());
        body.put_opt("type", self.search_type.clone());
        body.put_opt("analyzer", self.analyzer.clone());
        body.put_opt("tie_breaker", self.tie_breaker);
        body.merge(&self.params);
        Ok(single("multi_match", body))
    }
}

/// Query string query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStringQuery {
    query: String,
    default_field: Option<String>,
    fields: Vec<String>,
}

impl QueryStringQuery {
    /// Create a new query string query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            default_field: None,
            fields: Vec::new(),
        }
    }

    /// Set the default field.
    pub fn default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = Some(field.into());
        self
    }

    /// Add a field to search.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }
}

impl Node for QueryStringQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        require("query_string", "query", &self.query)
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut body = Document::new();
        body.put("query", self.query.clone());
        body.put_opt("default_field", self.default_field.clone());
        body.put_list("fields", self.fields.clone());
        Ok(single("query_string", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(q: impl Into<Query>) -> Value {
        Value::Object(q.into().serialize().unwrap())
    }

    #[test]
    fn test_match_all() {
        assert_eq!(render(Query::match_all()), json!({"match_all": {}}));
    }

    #[test]
    fn test_term_query() {
        assert_eq!(
            render(TermQuery::new("status", "active").boost(2.0)),
            json!({"term": {"status": {"value": "active", "boost": 2.0}}})
        );
    }

    #[test]
    fn test_term_requires_field_and_value() {
        assert!(TermQuery::new("", 1).serialize().is_err());
        assert_eq!(
            TermQuery::new("status", Value::Null).serialize().unwrap_err(),
            ValidationError::MissingField {
                kind: "term",
                field: "value"
            }
        );
    }

    #[test]
    fn test_terms_query() {
        assert_eq!(
            render(TermsQuery::new("tag", ["rust", "search"])),
            json!({"terms": {"tag": ["rust", "search"]}})
        );
        assert!(TermsQuery::new("tag", Vec::<String>::new()).serialize().is_err());
    }

    #[test]
    fn test_range_bounds_replace_counterpart() {
        let q = RangeQuery::new("age").gt(10).gte(12).lt(50);
        assert_eq!(q.lower(), Some(&Bound::Inclusive(json!(12))));
        assert_eq!(render(q), json!({"range": {"age": {"gte": 12, "lt": 50}}}));
    }

    #[test]
    fn test_range_upper_bounds_replace_counterpart() {
        let q = RangeQuery::new("age").lte(10).lt(20);
        assert_eq!(render(q), json!({"range": {"age": {"lt": 20}}}));

        let q = RangeQuery::new("age").lt(20).lte(10);
        assert_eq!(render(q), json!({"range": {"age": {"lte": 10}}}));
    }

    #[test]
    fn test_range_ignores_empty_bounds() {
        let q = RangeQuery::new("date").gte("").lte(Value::Null);
        assert_eq!(
            q.serialize().unwrap_err(),
            ValidationError::MissingBound {
                field: "date".to_string()
            }
        );
    }

    #[test]
    fn test_bool_query_minimum_should_match_default() {
        let q = BoolQuery::new()
            .must(Query::matches("title", "rust"))
            .should(TermQuery::new("tag", "a"));
        let doc = render(q);
        assert_eq!(doc["bool"]["minimum_should_match"], 1);
        assert_eq!(doc["bool"]["must"][0]["match"]["title"]["query"], "rust");
    }

    #[test]
    fn test_bool_query_clause_order() {
        let q = BoolQuery::new()
            .should(TermQuery::new("a", 1))
            .must(TermQuery::new("b", 2))
            .filter(TermQuery::new("c", 3))
            .minimum_should_match(2);
        let doc = q.serialize().unwrap();
        let keys: Vec<&String> = doc["bool"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["filter", "must", "should", "minimum_should_match"]);
        assert_eq!(doc["bool"]["minimum_should_match"], 2);
    }

    #[test]
    fn test_bool_without_should_omits_minimum() {
        let q = BoolQuery::new().filter(ExistsQuery::new("user")).minimum_should_match(3);
        assert_eq!(render(q), json!({"bool": {"filter": [{"exists": {"field": "user"}}]}}));
    }

    #[test]
    fn test_bool_propagates_child_error() {
        let q = BoolQuery::new()
            .must(TermQuery::new("ok", 1))
            .must(RangeQuery::new("broken"));
        assert!(matches!(
            q.serialize(),
            Err(ValidationError::MissingBound { .. })
        ));
    }

    #[test]
    fn test_match_query_params() {
        let q = MatchQuery::new("body", "quick fox")
            .analyzer("standard")
            .param("zero_terms_query", "all");
        assert_eq!(
            render(q),
            json!({"match": {"body": {"query": "quick fox", "analyzer": "standard", "zero_terms_query": "all"}}})
        );
    }

    #[test]
    fn test_match_phrase() {
        assert_eq!(
            render(MatchPhraseQuery::new("body", "quick fox").slop(2)),
            json!({"match_phrase": {"body": {"query": "quick fox", "slop": 2}}})
        );
    }

    #[test]
    fn test_multi_match_requires_fields() {
        let q = MultiMatchQuery::new("Will Smith", Vec::<String>::new());
        assert!(q.serialize().is_err());

        let q = MultiMatchQuery::new("Will Smith", ["first_name", "last_name"])
            .search_type("cross_fields")
            .param("operator", "and");
        assert_eq!(
            render(q),
            json!({"multi_match": {
                "query": "Will Smith",
                "fields": ["first_name", "last_name"],
                "type": "cross_fields",
                "operator": "and"
            }})
        );
    }

    #[test]
    fn test_nested_and_constant_score() {
        let nested = NestedQuery::new("comments", TermQuery::new("comments.author", "kim"));
        assert_eq!(
            render(nested),
            json!({"nested": {"path": "comments", "query": {"term": {"comments.author": {"value": "kim"}}}}})
        );
        assert!(NestedQuery::new("", Query::MatchAll).serialize().is_err());

        let cs = ConstantScoreQuery::new(ExistsQuery::new("user")).boost(1.2);
        assert_eq!(
            render(cs),
            json!({"constant_score": {"filter": {"exists": {"field": "user"}}, "boost": 1.2}})
        );
    }

    #[test]
    fn test_wildcard_and_prefix() {
        assert_eq!(
            render(WildcardQuery::new("user", "ki*y").boost(2.0)),
            json!({"wildcard": {"user": {"value": "ki*y", "boost": 2.0}}})
        );
        assert_eq!(
            render(PrefixQuery::new("user", "ki")),
            json!({"prefix": {"user": {"value": "ki"}}})
        );
    }

    #[test]
    fn test_raw_query_must_be_object() {
        assert_eq!(render(Query::raw(json!({"ids": {"values": [1]}}))), json!({"ids": {"values": [1]}}));
        assert!(Query::raw(json!([1, 2])).serialize().is_err());
    }
}
