//! Highlighting.

use crate::document::{Document, DocumentExt, Node, single};
use crate::error::ValidationError;
use crate::query::Query;
use serde_json::Value;

/// Highlight settings for a search.
///
/// Fields are written as a list of `{field: {...}}` objects so their order
/// is kept on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Highlight {
    pre_tags: Vec<String>,
    post_tags: Vec<String>,
    fragment_size: Option<u32>,
    number_of_fragments: Option<u32>,
    fields: Vec<HighlightField>,
    params: Document,
}

impl Highlight {
    /// Create empty highlight settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight a field.
    pub fn field(mut self, field: HighlightField) -> Self {
        self.fields.push(field);
        self
    }

    /// Highlight several fields with default settings.
    pub fn fields<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.fields.extend(names.into_iter().map(HighlightField::new));
        self
    }

    /// Add opening tags.
    pub fn pre_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.pre_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add closing tags.
    pub fn post_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.post_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Fragment size in characters.
    pub fn fragment_size(mut self, size: u32) -> Self {
        self.fragment_size = Some(size);
        self
    }

    /// Maximum fragments per field.
    pub fn number_of_fragments(mut self, count: u32) -> Self {
        self.number_of_fragments = Some(count);
        self
    }

    /// Extra parameter (type, order, require_field_match, ...).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Node for Highlight {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut doc = Document::new();
        doc.put_list("pre_tags", self.pre_tags.clone());
        doc.put_list("post_tags", self.post_tags.clone());
        doc.put_opt("fragment_size", self.fragment_size);
        doc.put_opt("number_of_fragments", self.number_of_fragments);
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|f| f.serialize().map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;
            doc.put("fields", fields);
        }
        doc.merge(&self.params);
        Ok(doc)
    }
}

/// Per-field highlight settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightField {
    field: String,
    pre_tags: Vec<String>,
    post_tags: Vec<String>,
    fragment_size: Option<u32>,
    number_of_fragments: Option<u32>,
    highlight_query: Option<Query>,
    params: Document,
}

impl HighlightField {
    /// Highlight `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pre_tags: Vec::new(),
            post_tags: Vec::new(),
            fragment_size: None,
            number_of_fragments: None,
            highlight_query: None,
            params: Document::new(),
        }
    }

    /// Add opening tags.
    pub fn pre_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.pre_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add closing tags.
    pub fn post_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.post_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Fragment size in characters.
    pub fn fragment_size(mut self, size: u32) -> Self {
        self.fragment_size = Some(size);
        self
    }

    /// Maximum fragments for this field.
    pub fn number_of_fragments(mut self, count: u32) -> Self {
        self.number_of_fragments = Some(count);
        self
    }

    /// Highlight matches of a different query than the search query.
    pub fn highlight_query(mut self, query: impl Into<Query>) -> Self {
        self.highlight_query = Some(query.into());
        self
    }

    /// Extra parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Node for HighlightField {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.field.is_empty() {
            return Err(ValidationError::MissingField {
                kind: "highlight",
                field: "field",
            });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut inner = Document::new();
        inner.put_list("pre_tags", self.pre_tags.clone());
        inner.put_list("post_tags", self.post_tags.clone());
        inner.put_opt("fragment_size", self.fragment_size);
        inner.put_opt("number_of_fragments", self.number_of_fragments);
        if let Some(query) = &self.highlight_query {
            inner.put("highlight_query", query.serialize()?);
        }
        inner.merge(&self.params);
        Ok(single(self.field.clone(), inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::MatchQuery;
    use serde_json::json;

    #[test]
    fn test_highlight_fields_as_list() {
        let h = Highlight::new()
            .pre_tags(["<em>"])
            .post_tags(["</em>"])
            .field(HighlightField::new("title").number_of_fragments(0))
            .field(
                HighlightField::new("body")
                    .fragment_size(150)
                    .highlight_query(MatchQuery::new("body", "fox")),
            )
            .param("require_field_match", false);

        assert_eq!(
            Value::Object(h.serialize().unwrap()),
            json!({
                "pre_tags": ["<em>"],
                "post_tags": ["</em>"],
                "fields": [
                    {"title": {"number_of_fragments": 0}},
                    {"body": {"fragment_size": 150, "highlight_query": {"match": {"body": {"query": "fox"}}}}}
                ],
                "require_field_match": false
            })
        );
    }

    #[test]
    fn test_highlight_field_requires_name() {
        let h = Highlight::new().fields(["title", ""]);
        assert_eq!(
            h.serialize().unwrap_err(),
            ValidationError::MissingField {
                kind: "highlight",
                field: "field"
            }
        );
    }
}
