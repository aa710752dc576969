//! Aggregation DSL.
//!
//! An [`Aggregation`] is a named node: a kind (terms, range, avg, ...) plus
//! optional sub-aggregations. It serializes as
//! `{name: {kind: {...}, "aggs": {child: ...}}}`.
//!
//! ```
//! use trawl_search::{AggregationExt, MetricAggregation, Node, TermsAggregation};
//!
//! let by_tag = TermsAggregation::new("tag")
//!     .size(5)
//!     .named("by_tag")
//!     .sub_aggregation(MetricAggregation::avg("likes").named("avg_likes"));
//!
//! let doc = by_tag.serialize().unwrap();
//! assert_eq!(doc["by_tag"]["aggs"]["avg_likes"]["avg"]["field"], "likes");
//! ```

use crate::body::{SortOrder, SourceFilter};
use crate::document::{Document, DocumentExt, NamedNode, Node, compose, single, wrap_named};
use crate::error::ValidationError;
use crate::query::Query;
use crate::script::Script;
use serde_json::Value;

/// A named aggregation with optional children.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    name: String,
    kind: AggregationKind,
    children: Vec<Aggregation>,
}

impl Aggregation {
    /// Create an aggregation.
    pub fn new(name: impl Into<String>, kind: impl Into<AggregationKind>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            children: Vec::new(),
        }
    }

    /// Add a sub-aggregation.
    pub fn sub_aggregation(mut self, child: Aggregation) -> Self {
        self.children.push(child);
        self
    }

    /// Add several sub-aggregations.
    pub fn sub_aggregations(mut self, children: impl IntoIterator<Item = Aggregation>) -> Self {
        self.children.extend(children);
        self
    }

    /// The aggregation kind.
    pub fn kind(&self) -> &AggregationKind {
        &self.kind
    }

    /// Sub-aggregations, in insertion order.
    pub fn children(&self) -> &[Aggregation] {
        &self.children
    }
}

impl Node for Aggregation {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName {
                kind: self.kind.type_name(),
            });
        }
        self.kind.validate()
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        wrap_named(self)
    }
}

impl NamedNode for Aggregation {
    fn name(&self) -> &str {
        &self.name
    }

    fn body(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut body = single(self.kind.type_name(), self.kind.params()?);
        if !self.children.is_empty() {
            body.put("aggs", compose(&self.children)?);
        }
        Ok(body)
    }
}

/// Name any aggregation kind.
pub trait AggregationExt: Into<AggregationKind> + Sized {
    /// Wrap this kind into an [`Aggregation`] called `name`.
    fn named(self, name: impl Into<String>) -> Aggregation {
        Aggregation::new(name, self)
    }
}

impl<T: Into<AggregationKind>> AggregationExt for T {}

/// Supported aggregation kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    /// Bucket per distinct value.
    Terms(TermsAggregation),
    /// Buckets over value ranges.
    Range(RangeAggregation),
    /// Single bucket of matching documents.
    Filter(FilterAggregation),
    /// One bucket per named filter.
    Filters(FiltersAggregation),
    /// Step into nested documents.
    Nested(NestedAggregation),
    /// Time buckets.
    DateHistogram(DateHistogramAggregation),
    /// Numeric buckets.
    Histogram(HistogramAggregation),
    /// Documents lacking a field.
    Missing(MissingAggregation),
    /// max/min/sum/avg of a field.
    Metric(MetricAggregation),
    /// Approximate distinct count.
    Cardinality(CardinalityAggregation),
    /// Best matching documents per bucket.
    TopHits(TopHitsAggregation),
    /// Sibling pipeline over a bucket path.
    Pipeline(PipelineAggregation),
}

impl AggregationKind {
    /// Key the kind is written under.
    pub fn type_name(&self) -> &'static str {
        match self {
            AggregationKind::Terms(_) => "terms",
            AggregationKind::Range(_) => "range",
            AggregationKind::Filter(_) => "filter",
            AggregationKind::Filters(_) => "filters",
            AggregationKind::Nested(_) => "nested",
            AggregationKind::DateHistogram(_) => "date_histogram",
            AggregationKind::Histogram(_) => "histogram",
            AggregationKind::Missing(_) => "missing",
            AggregationKind::Metric(m) => m.metric.as_str(),
            AggregationKind::Cardinality(_) => "cardinality",
            AggregationKind::TopHits(_) => "top_hits",
            AggregationKind::Pipeline(p) => p.kind.as_str(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.type_name();
        match self {
            AggregationKind::Terms(a) => {
                if a.field.is_empty() && a.script.is_none() {
                    return Err(ValidationError::MissingEither {
                        kind,
                        first: "field",
                        second: "script",
                    });
                }
                Ok(())
            }
            AggregationKind::Range(a) => require(kind, "field", &a.field),
            AggregationKind::Filter(_) | AggregationKind::Filters(_) => Ok(()),
            AggregationKind::Nested(a) => require(kind, "path", &a.path),
            AggregationKind::DateHistogram(a) => {
                require(kind, "field", &a.field)?;
                match &a.interval {
                    Some(interval) if !interval.value().is_empty() => Ok(()),
                    _ => Err(ValidationError::MissingField {
                        kind,
                        field: "interval",
                    }),
                }
            }
            AggregationKind::Histogram(a) => {
                require(kind, "field", &a.field)?;
                // Bucket width must be a positive finite number.
                if !matches!(a.interval, Some(i) if i.is_finite() && i > 0.0) {
                    return Err(ValidationError::MissingField {
                        kind,
                        field: "interval",
                    });
                }
                Ok(())
            }
            AggregationKind::Missing(_) => Ok(()),
            AggregationKind::Metric(a) => require(kind, "field", &a.field),
            AggregationKind::Cardinality(a) => require(kind, "field", &a.field),
            AggregationKind::TopHits(_) => Ok(()),
            AggregationKind::Pipeline(a) => require(kind, "buckets_path", &a.buckets_path),
        }
    }

    fn params(&self) -> Result<Document, ValidationError> {
        let mut doc = Document::new();
        match self {
            AggregationKind::Terms(a) => {
                if !a.field.is_empty() {
                    doc.put("field", a.field.clone());
                }
                doc.put_opt("size", a.size);
                doc.put_list("order", order_list(&a.order));
                if let Some(script) = &a.script {
                    doc.put("script", script.serialize()?);
                }
                doc.merge(&a.params);
            }
            AggregationKind::Range(a) => {
                doc.put("field", a.field.clone());
                doc.put(
                    "ranges",
                    a.ranges.iter().map(RangeBucket::to_json).collect::<Vec<_>>(),
                );
                doc.put_opt("keyed", a.keyed);
            }
            AggregationKind::Filter(a) => return a.filter.serialize(),
            AggregationKind::Filters(a) => {
                doc.put_opt("other_bucket_key", a.other_bucket_key.clone());
                let mut filters = Document::new();
                for (name, query) in &a.filters {
                    filters.put(name, query.serialize()?);
                }
                doc.put("filters", filters);
            }
            AggregationKind::Nested(a) => doc.put("path", a.path.clone()),
            AggregationKind::DateHistogram(a) => {
                doc.put("field", a.field.clone());
                if let Some(interval) = &a.interval {
                    doc.put(interval.key(), interval.value().to_string());
                }
                doc.put_opt("format", a.format.clone());
                doc.put_opt("time_zone", a.time_zone.clone());
                doc.merge(&a.params);
            }
            AggregationKind::Histogram(a) => {
                doc.put("field", a.field.clone());
                doc.put_opt("interval", a.interval);
                doc.put_list("order", order_list(&a.order));
                doc.merge(&a.params);
            }
            AggregationKind::Missing(a) => {
                if !a.field.is_empty() {
                    doc.put("field", a.field.clone());
                }
            }
            AggregationKind::Metric(a) => {
                doc.put("field", a.field.clone());
                doc.put_opt("missing", a.missing.clone());
                doc.merge(&a.params);
            }
            AggregationKind::Cardinality(a) => {
                doc.put("field", a.field.clone());
                doc.put_opt("precision_threshold", a.precision_threshold);
                doc.merge(&a.params);
            }
            AggregationKind::TopHits(a) => {
                let sort: Vec<Value> = a
                    .sort
                    .iter()
                    .map(|(field, order)| {
                        Value::Object(single(field.clone(), single("order", order.as_str())))
                    })
                    .collect();
                doc.put_list("sort", sort);
                if !a.source.is_empty() {
                    doc.put("_source", a.source.to_json());
                }
                doc.put_opt("size", a.size);
            }
            AggregationKind::Pipeline(a) => {
                doc.put("buckets_path", a.buckets_path.clone());
                doc.put_opt("gap_policy", a.gap_policy.clone());
                doc.put_opt("format", a.format.clone());
            }
        }
        Ok(doc)
    }
}

fn require(kind: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField { kind, field });
    }
    Ok(())
}

/// `[{key: "asc"}, ...]`
fn order_list(order: &[(String, SortOrder)]) -> Vec<Value> {
    order
        .iter()
        .map(|(key, dir)| Value::Object(single(key.clone(), dir.as_str())))
        .collect()
}

macro_rules! into_kind {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for AggregationKind {
                fn from(a: $ty) -> Self {
                    AggregationKind::$variant(a)
                }
            }
        )*
    };
}

into_kind! {
    TermsAggregation => Terms,
    RangeAggregation => Range,
    FilterAggregation => Filter,
    FiltersAggregation => Filters,
    NestedAggregation => Nested,
    DateHistogramAggregation => DateHistogram,
    HistogramAggregation => Histogram,
    MissingAggregation => Missing,
    MetricAggregation => Metric,
    CardinalityAggregation => Cardinality,
    TopHitsAggregation => TopHits,
    PipelineAggregation => Pipeline,
}

// =============================================================================
// Bucket aggregations
// =============================================================================

/// Terms aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermsAggregation {
    field: String,
    size: Option<u64>,
    order: Vec<(String, SortOrder)>,
    script: Option<Script>,
    params: Document,
}

impl TermsAggregation {
    /// Bucket by the values of `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Bucket by the output of a script.
    pub fn script(script: Script) -> Self {
        Self {
            script: Some(script),
            ..Self::default()
        }
    }

    /// Maximum number of buckets.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Add an ordering key (`_count`, `_key` or a sub-aggregation name).
    pub fn order(mut self, key: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((key.into(), order));
        self
    }

    /// Extra parameter (min_doc_count, missing, ...).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Range bucket definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBucket {
    /// Optional key.
    pub key: Option<String>,
    /// From value (inclusive).
    pub from: Option<Value>,
    /// To value (exclusive).
    pub to: Option<Value>,
}

impl RangeBucket {
    /// Create an unbounded bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the lower bound.
    pub fn from(mut self, from: impl Into<Value>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Set the upper bound.
    pub fn to(mut self, to: impl Into<Value>) -> Self {
        self.to = Some(to.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut bucket = Document::new();
        bucket.put_opt("key", self.key.clone());
        bucket.put_opt("from", self.from.clone());
        bucket.put_opt("to", self.to.clone());
        Value::Object(bucket)
    }
}

/// Range aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeAggregation {
    field: String,
    ranges: Vec<RangeBucket>,
    keyed: Option<bool>,
}

impl RangeAggregation {
    /// Bucket `field` into ranges.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Add a range.
    pub fn range(mut self, bucket: RangeBucket) -> Self {
        self.ranges.push(bucket);
        self
    }

    /// Replace all ranges.
    pub fn ranges(mut self, buckets: Vec<RangeBucket>) -> Self {
        self.ranges = buckets;
        self
    }

    /// Return buckets as an object keyed by range key.
    pub fn keyed(mut self, keyed: bool) -> Self {
        self.keyed = Some(keyed);
        self
    }
}

/// Single-bucket filter aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterAggregation {
    filter: Query,
}

impl FilterAggregation {
    /// Bucket documents matching `filter`.
    pub fn new(filter: impl Into<Query>) -> Self {
        Self {
            filter: filter.into(),
        }
    }
}

/// Multi-bucket filters aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltersAggregation {
    other_bucket_key: Option<String>,
    filters: Vec<(String, Query)>,
}

impl FiltersAggregation {
    /// Create an empty filters aggregation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named filter bucket.
    pub fn filter(mut self, name: impl Into<String>, query: impl Into<Query>) -> Self {
        self.filters.push((name.into(), query.into()));
        self
    }

    /// Collect unmatched documents under this key.
    pub fn other_bucket_key(mut self, key: impl Into<String>) -> Self {
        self.other_bucket_key = Some(key.into());
        self
    }
}

/// Nested aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedAggregation {
    path: String,
}

impl NestedAggregation {
    /// Aggregate over the nested documents at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Date histogram bucket width.
#[derive(Debug, Clone, PartialEq)]
pub enum Interval {
    /// `interval`
    Legacy(String),
    /// `calendar_interval`
    Calendar(String),
    /// `fixed_interval`
    Fixed(String),
}

impl Interval {
    fn key(&self) -> &'static str {
        match self {
            Interval::Legacy(_) => "interval",
            Interval::Calendar(_) => "calendar_interval",
            Interval::Fixed(_) => "fixed_interval",
        }
    }

    fn value(&self) -> &str {
        match self {
            Interval::Legacy(v) | Interval::Calendar(v) | Interval::Fixed(v) => v,
        }
    }
}

/// Date histogram aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateHistogramAggregation {
    field: String,
    interval: Option<Interval>,
    format: Option<String>,
    time_zone: Option<String>,
    params: Document,
}

impl DateHistogramAggregation {
    /// Bucket `field` by time.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Bucket width, written as `interval`.
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(Interval::Legacy(interval.into()));
        self
    }

    /// Calendar-aware bucket width (day, week, month, ...).
    pub fn calendar_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(Interval::Calendar(interval.into()));
        self
    }

    /// Fixed bucket width (1d, 1h, ...).
    pub fn fixed_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(Interval::Fixed(interval.into()));
        self
    }

    /// Key format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Time zone for bucketing.
    pub fn time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = Some(tz.into());
        self
    }

    /// Extra parameter (min_doc_count, extended_bounds, ...).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Numeric histogram aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramAggregation {
    field: String,
    interval: Option<f64>,
    order: Vec<(String, SortOrder)>,
    params: Document,
}

impl HistogramAggregation {
    /// Bucket `field` numerically.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Bucket width.
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Add an ordering key.
    pub fn order(mut self, key: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((key.into(), order));
        self
    }

    /// Extra parameter (min_doc_count, offset, ...).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Missing-value aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingAggregation {
    field: String,
}

impl MissingAggregation {
    /// Bucket documents without a value for `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

// =============================================================================
// Metric aggregations
// =============================================================================

/// Single-value metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Maximum.
    Max,
    /// Minimum.
    Min,
    /// Sum.
    Sum,
    /// Average.
    Avg,
}

impl Metric {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Max => "max",
            Metric::Min => "min",
            Metric::Sum => "sum",
            Metric::Avg => "avg",
        }
    }
}

/// max/min/sum/avg aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricAggregation {
    metric: Metric,
    field: String,
    missing: Option<Value>,
    params: Document,
}

impl MetricAggregation {
    /// Create a metric aggregation.
    pub fn new(metric: Metric, field: impl Into<String>) -> Self {
        Self {
            metric,
            field: field.into(),
            missing: None,
            params: Document::new(),
        }
    }

    /// Maximum of `field`.
    pub fn max(field: impl Into<String>) -> Self {
        Self::new(Metric::Max, field)
    }

    /// Minimum of `field`.
    pub fn min(field: impl Into<String>) -> Self {
        Self::new(Metric::Min, field)
    }

    /// Sum of `field`.
    pub fn sum(field: impl Into<String>) -> Self {
        Self::new(Metric::Sum, field)
    }

    /// Average of `field`.
    pub fn avg(field: impl Into<String>) -> Self {
        Self::new(Metric::Avg, field)
    }

    /// Value used for documents without the field.
    pub fn missing(mut self, value: impl Into<Value>) -> Self {
        self.missing = Some(value.into());
        self
    }

    /// Extra parameter (script, format, ...).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Cardinality (approximate distinct count) aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardinalityAggregation {
    field: String,
    precision_threshold: Option<u64>,
    params: Document,
}

impl CardinalityAggregation {
    /// Count distinct values of `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Counts below this are expected to be close to exact.
    pub fn precision_threshold(mut self, threshold: u64) -> Self {
        self.precision_threshold = Some(threshold);
        self
    }

    /// Extra parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Top hits aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopHitsAggregation {
    sort: Vec<(String, SortOrder)>,
    source: SourceFilter,
    size: Option<u64>,
}

impl TopHitsAggregation {
    /// Create a top hits aggregation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sort key.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
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

    /// Number of hits per bucket.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

// =============================================================================
// Pipeline aggregations
// =============================================================================

/// Sibling pipeline kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// `avg_bucket`
    AvgBucket,
    /// `max_bucket`
    MaxBucket,
    /// `min_bucket`
    MinBucket,
    /// `sum_bucket`
    SumBucket,
}

impl PipelineKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::AvgBucket => "avg_bucket",
            PipelineKind::MaxBucket => "max_bucket",
            PipelineKind::MinBucket => "min_bucket",
            PipelineKind::SumBucket => "sum_bucket",
        }
    }
}

/// Sibling pipeline aggregation over a buckets path.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineAggregation {
    kind: PipelineKind,
    buckets_path: String,
    gap_policy: Option<String>,
    format: Option<String>,
}

impl PipelineAggregation {
    /// Create a pipeline aggregation reading `buckets_path`.
    pub fn new(kind: PipelineKind, buckets_path: impl Into<String>) -> Self {
        Self {
            kind,
            buckets_path: buckets_path.into(),
            gap_policy: None,
            format: None,
        }
    }

    /// Average of the referenced buckets.
    pub fn avg_bucket(buckets_path: impl Into<String>) -> Self {
        Self::new(PipelineKind::AvgBucket, buckets_path)
    }

    /// Maximum over the referenced buckets.
    pub fn max_bucket(buckets_path: impl Into<String>) -> Self {
        Self::new(PipelineKind::MaxBucket, buckets_path)
    }

    /// Minimum over the referenced buckets.
    pub fn min_bucket(buckets_path: impl Into<String>) -> Self {
        Self::new(PipelineKind::MinBucket, buckets_path)
    }

    /// Sum of the referenced buckets.
    pub fn sum_bucket(buckets_path: impl Into<String>) -> Self {
        Self::new(PipelineKind::SumBucket, buckets_path)
    }

    /// Gap policy (skip, insert_zeros).
    pub fn gap_policy(mut self, policy: impl Into<String>) -> Self {
        self.gap_policy = Some(policy.into());
        self
    }

    /// Output format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TermQuery;
    use serde_json::json;

    fn render(agg: &Aggregation) -> Value {
        Value::Object(agg.serialize().unwrap())
    }

    #[test]
    fn test_terms_with_children() {
        let agg = TermsAggregation::new("category")
            .size(10)
            .order("_count", SortOrder::Desc)
            .named("by_category")
            .sub_aggregation(MetricAggregation::max("price").named("max_price"))
            .sub_aggregation(MetricAggregation::min("price").named("min_price"));

        assert_eq!(
            render(&agg),
            json!({"by_category": {
                "terms": {"field": "category", "size": 10, "order": [{"_count": "desc"}]},
                "aggs": {
                    "max_price": {"max": {"field": "price"}},
                    "min_price": {"min": {"field": "price"}}
                }
            }})
        );
        let children: Vec<&str> = agg.children().iter().map(|c| c.name()).collect();
        assert_eq!(children, vec!["max_price", "min_price"]);
    }

    #[test]
    fn test_terms_requires_field_or_script() {
        let agg = TermsAggregation::new("").named("t");
        assert!(matches!(
            agg.serialize(),
            Err(ValidationError::MissingEither { kind: "terms", .. })
        ));

        let agg = TermsAggregation::script(Script::inline("doc['time'].value")).named("t");
        assert_eq!(
            render(&agg),
            json!({"t": {"terms": {"script": {"source": "doc['time'].value"}}}})
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let agg = MetricAggregation::avg("price").named("");
        assert_eq!(
            agg.serialize().unwrap_err(),
            ValidationError::MissingName { kind: "avg" }
        );
    }

    #[test]
    fn test_child_error_fails_parent() {
        let agg = TermsAggregation::new("tag")
            .named("tags")
            .sub_aggregation(HistogramAggregation::new("price").named("prices"));
        assert_eq!(
            agg.serialize().unwrap_err(),
            ValidationError::MissingField {
                kind: "histogram",
                field: "interval"
            }
        );
    }

    #[test]
    fn test_range_aggregation() {
        let agg = RangeAggregation::new("age")
            .range(RangeBucket::new().key("young").to(30))
            .range(RangeBucket::new().from(30))
            .named("ages");
        assert_eq!(
            render(&agg),
            json!({"ages": {"range": {"field": "age", "ranges": [{"key": "young", "to": 30}, {"from": 30}]}}})
        );
    }

    #[test]
    fn test_filter_and_nested() {
        let agg = NestedAggregation::new("comments")
            .named("comments")
            .sub_aggregation(
                FilterAggregation::new(TermQuery::new("comments.stars", 5)).named("five_stars"),
            );
        assert_eq!(
            render(&agg),
            json!({"comments": {
                "nested": {"path": "comments"},
                "aggs": {"five_stars": {"filter": {"term": {"comments.stars": {"value": 5}}}}}
            }})
        );
    }

    #[test]
    fn test_filters_aggregation() {
        let agg = FiltersAggregation::new()
            .other_bucket_key("other")
            .filter("errors", TermQuery::new("level", "error"))
            .filter("warnings", TermQuery::new("level", "warn"))
            .named("levels");
        let doc = render(&agg);
        assert_eq!(doc["levels"]["filters"]["other_bucket_key"], "other");
        assert_eq!(
            doc["levels"]["filters"]["filters"]["warnings"],
            json!({"term": {"level": {"value": "warn"}}})
        );
    }

    #[test]
    fn test_date_histogram_intervals() {
        let agg = DateHistogramAggregation::new("ts")
            .calendar_interval("month")
            .param("min_doc_count", 0)
            .named("monthly");
        assert_eq!(
            render(&agg),
            json!({"monthly": {"date_histogram": {"field": "ts", "calendar_interval": "month", "min_doc_count": 0}}})
        );

        let agg = DateHistogramAggregation::new("ts").named("no_interval");
        assert!(agg.serialize().is_err());

        let agg = DateHistogramAggregation::new("ts").interval("1d").named("daily");
        assert_eq!(render(&agg)["daily"]["date_histogram"]["interval"], "1d");
    }

    #[test]
    fn test_histogram_interval_must_be_positive() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let agg = HistogramAggregation::new("price").interval(bad).named("prices");
            assert_eq!(
                agg.serialize().unwrap_err(),
                ValidationError::MissingField {
                    kind: "histogram",
                    field: "interval"
                },
                "interval {bad}"
            );
        }

        let agg = HistogramAggregation::new("price").interval(2.5).named("prices");
        assert_eq!(
            render(&agg),
            json!({"prices": {"histogram": {"field": "price", "interval": 2.5}}})
        );
    }

    #[test]
    fn test_top_hits() {
        let agg = TopHitsAggregation::new()
            .sort("date", SortOrder::Desc)
            .source_includes(["title"])
            .size(1)
            .named("latest");
        assert_eq!(
            render(&agg),
            json!({"latest": {"top_hits": {
                "sort": [{"date": {"order": "desc"}}],
                "_source": {"includes": ["title"]},
                "size": 1
            }}})
        );
    }

    #[test]
    fn test_pipeline_and_cardinality() {
        let agg = PipelineAggregation::avg_bucket("sales_per_month>sales")
            .gap_policy("skip")
            .named("avg_monthly_sales");
        assert_eq!(
            render(&agg),
            json!({"avg_monthly_sales": {"avg_bucket": {"buckets_path": "sales_per_month>sales", "gap_policy": "skip"}}})
        );

        let agg = CardinalityAggregation::new("user").precision_threshold(100).named("users");
        assert_eq!(
            render(&agg),
            json!({"users": {"cardinality": {"field": "user", "precision_threshold": 100}}})
        );
    }

    #[test]
    fn test_missing_aggregation() {
        let agg = MissingAggregation::new("price").named("no_price");
        assert_eq!(render(&agg), json!({"no_price": {"missing": {"field": "price"}}}));
    }
}
