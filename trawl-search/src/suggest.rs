//! Suggesters.

use crate::document::{Document, DocumentExt, NamedNode, Node, compose, wrap_named};
use crate::error::ValidationError;
use serde_json::Value;

/// The `suggest` section of a search body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggest {
    text: Option<String>,
    suggesters: Vec<Suggester>,
}

impl Suggest {
    /// Create an empty suggest block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Text shared by every suggester that sets none of its own.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add a suggester.
    pub fn suggester(mut self, suggester: impl Into<Suggester>) -> Self {
        self.suggesters.push(suggester.into());
        self
    }
}

impl Node for Suggest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut doc = Document::new();
        doc.put_opt("text", self.text.clone());
        doc.merge(&compose(&self.suggesters)?);
        Ok(doc)
    }
}

/// Supported suggesters.
#[derive(Debug, Clone, PartialEq)]
pub enum Suggester {
    /// Prefix completion.
    Completion(CompletionSuggester),
    /// Per-term spelling corrections.
    Term(TermSuggester),
}

impl From<CompletionSuggester> for Suggester {
    fn from(s: CompletionSuggester) -> Self {
        Suggester::Completion(s)
    }
}

impl From<TermSuggester> for Suggester {
    fn from(s: TermSuggester) -> Self {
        Suggester::Term(s)
    }
}

impl Suggester {
    fn kind(&self) -> &'static str {
        match self {
            Suggester::Completion(_) => "completion",
            Suggester::Term(_) => "term",
        }
    }

    fn field(&self) -> &str {
        match self {
            Suggester::Completion(s) => &s.field,
            Suggester::Term(s) => &s.field,
        }
    }
}

impl Node for Suggester {
    fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind();
        if self.name().is_empty() {
            return Err(ValidationError::MissingName { kind });
        }
        if self.field().is_empty() {
            return Err(ValidationError::MissingField { kind, field: "field" });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        wrap_named(self)
    }
}

impl NamedNode for Suggester {
    fn name(&self) -> &str {
        match self {
            Suggester::Completion(s) => &s.name,
            Suggester::Term(s) => &s.name,
        }
    }

    fn body(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        Ok(match self {
            Suggester::Completion(s) => s.body(),
            Suggester::Term(s) => s.body(),
        })
    }
}

/// Completion suggester.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSuggester {
    name: String,
    field: String,
    prefix: Option<String>,
    text: Option<String>,
    size: Option<u32>,
    skip_duplicates: bool,
    fuzzy: bool,
    fuzziness: Option<Value>,
    transpositions: Option<bool>,
    min_length: Option<u32>,
    prefix_length: Option<u32>,
    unicode_aware: bool,
    params: Document,
}

impl CompletionSuggester {
    /// Complete against the completion field `field`.
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            prefix: None,
            text: None,
            size: None,
            skip_duplicates: false,
            fuzzy: false,
            fuzziness: None,
            transpositions: None,
            min_length: None,
            prefix_length: None,
            unicode_aware: false,
            params: Document::new(),
        }
    }

    /// Prefix to complete.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Text to complete.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Number of suggestions.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Drop duplicate suggestions.
    pub fn skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }

    /// Plain fuzzy matching with server defaults.
    ///
    /// Takes precedence over the individual fuzzy options.
    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// Fuzzy edit distance (a number or `"AUTO"`).
    pub fn fuzziness(mut self, fuzziness: impl Into<Value>) -> Self {
        self.fuzziness = Some(fuzziness.into());
        self
    }

    /// Count transpositions as one edit.
    pub fn transpositions(mut self, transpositions: bool) -> Self {
        self.transpositions = Some(transpositions);
        self
    }

    /// Minimum input length before fuzzy suggestions are returned.
    pub fn min_length(mut self, min_length: u32) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// Leading characters that must match exactly.
    pub fn prefix_length(mut self, prefix_length: u32) -> Self {
        self.prefix_length = Some(prefix_length);
        self
    }

    /// Measure edits in unicode code points.
    pub fn unicode_aware(mut self, unicode_aware: bool) -> Self {
        self.unicode_aware = unicode_aware;
        self
    }

    /// Extra parameter merged into the suggester body.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn fuzzy_options(&self) -> Option<Value> {
        if self.fuzzy {
            return Some(Value::Bool(true));
        }
        let mut opts = Document::new();
        opts.put_opt("fuzziness", self.fuzziness.clone());
        opts.put_opt("transpositions", self.transpositions);
        opts.put_opt("min_length", self.min_length);
        opts.put_opt("prefix_length", self.prefix_length);
        if self.unicode_aware {
            opts.put("unicode_aware", true);
        }
        (!opts.is_empty()).then_some(Value::Object(opts))
    }

    fn body(&self) -> Document {
        let mut completion = Document::new();
        completion.put("field", self.field.clone());
        completion.put_opt("size", self.size);
        if self.skip_duplicates {
            completion.put("skip_duplicates", true);
        }
        completion.put_opt("fuzzy", self.fuzzy_options());

        let mut body = Document::new();
        body.put_opt("prefix", self.prefix.clone());
        body.put_opt("text", self.text.clone());
        body.put("completion", completion);
        body.merge(&self.params);
        body
    }
}

/// Term suggester.
#[derive(Debug, Clone, PartialEq)]
pub struct TermSuggester {
    name: String,
    field: String,
    text: Option<String>,
    size: Option<u32>,
    suggest_mode: Option<String>,
    params: Document,
}

impl TermSuggester {
    /// Suggest corrections from the terms of `field`.
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            text: None,
            size: None,
            suggest_mode: None,
            params: Document::new(),
        }
    }

    /// Text to correct.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Suggestions per term.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// missing, popular or always.
    pub fn suggest_mode(mut self, mode: impl Into<String>) -> Self {
        self.suggest_mode = Some(mode.into());
        self
    }

    /// Extra parameter merged into the `term` body.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn body(&self) -> Document {
        let mut term = Document::new();
        term.put("field", self.field.clone());
        term.put_opt("size", self.size);
        term.put_opt("suggest_mode", self.suggest_mode.clone());
        term.merge(&self.params);

        let mut body = Document::new();
        body.put_opt("text", self.text.clone());
        body.put("term", term);
        body
    }
}
