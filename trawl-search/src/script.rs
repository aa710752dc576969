//! Script references used by scoring functions and aggregations.

use crate::document::{Document, DocumentExt, Node};
use crate::error::ValidationError;
use serde_json::Value;

/// An inline or stored script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    id: Option<String>,
    source: Option<String>,
    lang: Option<String>,
    params: Document,
}

impl Script {
    /// Inline script.
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Stored script, referenced by id.
    pub fn stored(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Set the script language.
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Add a script parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Node for Script {
    fn validate(&self) -> Result<(), ValidationError> {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !has(&self.id) && !has(&self.source) {
            return Err(ValidationError::MissingEither {
                kind: "script",
                first: "id",
                second: "source",
            });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut doc = Document::new();
        doc.put_opt("id", self.id.clone());
        doc.put_opt("source", self.source.clone());
        doc.put_opt("lang", self.lang.clone());
        if !self.params.is_empty() {
            doc.put("params", self.params.clone());
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inline_script() {
        let script = Script::inline("doc['likes'].value * params.f")
            .lang("painless")
            .param("f", 1.5);
        assert_eq!(
            Value::Object(script.serialize().unwrap()),
            json!({
                "source": "doc['likes'].value * params.f",
                "lang": "painless",
                "params": {"f": 1.5}
            })
        );
    }

    #[test]
    fn test_stored_script() {
        let script = Script::stored("calc-score");
        assert_eq!(Value::Object(script.serialize().unwrap()), json!({"id": "calc-score"}));
    }

    #[test]
    fn test_script_requires_id_or_source() {
        assert!(matches!(
            Script::default().serialize(),
            Err(ValidationError::MissingEither { kind: "script", .. })
        ));
        assert!(Script::inline("").validate().is_err());
    }
}
