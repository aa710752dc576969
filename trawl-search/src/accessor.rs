//! Dotted-path access into aggregation results.

use crate::document::Document;
use crate::error::Result;
use crate::response::AggregationResults;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::value::RawValue;
use std::borrow::Cow;
use std::collections::HashMap;
use trawl_log::warn;

type Level = HashMap<String, Box<RawValue>>;

impl AggregationResults {
    /// Names of the top-level aggregations.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Raw JSON of one top-level aggregation.
    pub fn raw(&self, name: &str) -> Option<&RawValue> {
        self.0.get(name).map(Box::as_ref)
    }

    /// Decode one top-level aggregation into `T`.
    pub fn decode<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.0.get(name) {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Resolve dotted paths such as `"by_tag.buckets"`.
    ///
    /// The result is keyed by each path's first segment and holds the value
    /// the full path reached. Only the objects along a path are decoded.
    /// A missing segment, or a segment that is not an object and still has
    /// segments after it, yields `null` and a warning. Paths sharing a first
    /// segment overwrite each other, last one wins.
    pub fn resolve<S: AsRef<str>>(&self, paths: &[S]) -> Document {
        let mut out = Document::new();
        for path in paths {
            let path = path.as_ref();
            let head = path.split('.').next().unwrap_or(path);
            let value = self.resolve_one(path);
            if out.contains_key(head) {
                warn!("Aggregation path `{}` overwrites an earlier result for `{}`", path, head);
            }
            out.insert(head.to_string(), value);
        }
        out
    }

    fn resolve_one(&self, path: &str) -> Value {
        let mut level: Cow<'_, Level> = Cow::Borrowed(&self.0);
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let Some(raw) = level.get(segment) else {
                warn!("Aggregation path `{}`: segment `{}` not found", path, segment);
                return Value::Null;
            };

            if segments.peek().is_none() {
                return match serde_json::from_str(raw.get()) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Aggregation path `{}`: cannot decode `{}`: {}", path, segment, e);
                        Value::Null
                    }
                };
            }

            match serde_json::from_str::<Level>(raw.get()) {
                Ok(next) => level = Cow::Owned(next),
                Err(_) => {
                    warn!("Aggregation path `{}`: `{}` is not an object", path, segment);
                    return Value::Null;
                }
            }
        }

        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::decode_search;
    use serde_json::json;
    use trawl_log::{Level as LogLevel, capture};

    fn results() -> AggregationResults {
        let body = r#"{
            "hits": {"hits": []},
            "aggregations": {
                "emoji": {
                    "doc_count": 12,
                    "top_sticker": {"buckets": [{"key": "smile", "doc_count": 7}]},
                    "sum_sticker": {"value": 42.0}
                },
                "users": {"value": 3}
            }
        }"#;
        decode_search(200, body).unwrap().aggregations.unwrap()
    }

    #[test]
    fn test_resolve_nested_path() {
        let out = results().resolve(&["emoji.top_sticker.buckets", "users.value"]);
        assert_eq!(out["emoji"], json!([{"key": "smile", "doc_count": 7}]));
        assert_eq!(out["users"], json!(3));
    }

    #[test]
    fn test_resolve_object_terminal() {
        let out = results().resolve(&["emoji.sum_sticker"]);
        assert_eq!(out["emoji"], json!({"value": 42.0}));
    }

    #[test]
    fn test_missing_segment_logs_and_yields_null() {
        let (out, logs) = capture(|| results().resolve(&["emoji.missing.buckets"]));
        assert_eq!(out["emoji"], Value::Null);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Warn);
        assert!(logs[0].message.contains("`missing` not found"));
    }

    #[test]
    fn test_scalar_cannot_be_descended() {
        let (out, logs) = capture(|| results().resolve(&["emoji.doc_count.value"]));
        assert_eq!(out["emoji"], Value::Null);
        assert!(logs[0].message.contains("not an object"));
    }

    #[test]
    fn test_shared_head_last_wins() {
        let (out, logs) = capture(|| {
            results().resolve(&["emoji.top_sticker.buckets", "emoji.sum_sticker.value"])
        });
        assert_eq!(out.len(), 1);
        assert_eq!(out["emoji"], json!(42.0));
        assert!(logs[0].message.contains("overwrites"));
    }

    #[test]
    fn test_decode_and_raw() {
        #[derive(serde::Deserialize)]
        struct Metric {
            value: f64,
        }
        let aggs = results();
        let users: Metric = aggs.decode("users").unwrap().unwrap();
        assert_eq!(users.value, 3.0);
        assert!(aggs.decode::<Metric>("nope").unwrap().is_none());
        assert_eq!(aggs.raw("users").map(RawValue::get), Some(r#"{"value": 3}"#));
        let mut names: Vec<&str> = aggs.names().collect();
        names.sort();
        assert_eq!(names, vec!["emoji", "users"]);
    }
}
