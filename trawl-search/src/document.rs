//! Request document type and the node traits every DSL element implements.

use crate::error::ValidationError;
use serde_json::{Map, Value};

/// An insertion-ordered JSON object.
///
/// Every serialized node is one of these; key order follows the order in
/// which a node writes its parameters.
pub type Document = Map<String, Value>;

/// A request fragment that can check itself and render to a [`Document`].
pub trait Node {
    /// Check this node's own required parameters.
    ///
    /// Children are checked when they are serialized, so a successful
    /// [`Node::serialize`] means the whole tree is valid.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Validate, then render this node and its children.
    fn serialize(&self) -> Result<Document, ValidationError>;
}

/// A node that is addressed by a user-chosen name inside its parent.
///
/// Aggregations and suggesters are named nodes: their parent writes
/// `{name: body}` for each of them.
pub trait NamedNode: Node {
    /// The name this node is stored under.
    fn name(&self) -> &str;

    /// The body written under [`NamedNode::name`].
    fn body(&self) -> Result<Document, ValidationError>;
}

/// Render named children into one object keyed by child name.
///
/// Children appear in iteration order. The first failing child aborts the
/// whole composition. A repeated name overwrites the earlier entry in place.
pub fn compose<'a, N, I>(children: I) -> Result<Document, ValidationError>
where
    N: NamedNode + 'a,
    I: IntoIterator<Item = &'a N>,
{
    let mut out = Document::new();
    for child in children {
        out.insert(child.name().to_string(), Value::Object(child.body()?));
    }
    Ok(out)
}

/// Wrap a named node's body under its name.
pub(crate) fn wrap_named<N: NamedNode + ?Sized>(node: &N) -> Result<Document, ValidationError> {
    let mut out = Document::new();
    out.insert(node.name().to_string(), Value::Object(node.body()?));
    Ok(out)
}

/// Insert-if-set helpers shared by the DSL nodes.
pub(crate) trait DocumentExt {
    fn put(&mut self, key: &str, value: impl Into<Value>);
    fn put_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>);
    fn put_list<V: Into<Value>>(&mut self, key: &str, values: Vec<V>);
    fn merge(&mut self, extra: &Document);
}

impl DocumentExt for Document {
    fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(key.to_string(), value.into());
    }

    fn put_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        if let Some(v) = value {
            self.put(key, v);
        }
    }

    fn put_list<V: Into<Value>>(&mut self, key: &str, values: Vec<V>) {
        if !values.is_empty() {
            self.put(key, Value::Array(values.into_iter().map(Into::into).collect()));
        }
    }

    fn merge(&mut self, extra: &Document) {
        for (k, v) in extra {
            self.insert(k.clone(), v.clone());
        }
    }
}

/// A single-key object `{key: value}`.
pub(crate) fn single(key: impl Into<String>, value: impl Into<Value>) -> Document {
    let mut doc = Document::new();
    doc.insert(key.into(), value.into());
    doc
}

/// Treat `null` and `""` as "not set".
pub(crate) fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
