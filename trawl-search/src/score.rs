//! Function score query and its scoring functions.

use crate::document::{Document, DocumentExt, Node, single};
use crate::error::ValidationError;
use crate::query::Query;
use crate::script::Script;
use serde_json::Value;

/// Rescoring wrapper around an optional inner query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionScoreQuery {
    query: Option<Box<Query>>,
    boost: Option<f64>,
    functions: Vec<ScoreFunction>,
    random_score: Option<RandomScore>,
    field_value_factor: Option<FieldValueFactor>,
    max_boost: Option<f64>,
    score_mode: Option<String>,
    boost_mode: Option<String>,
    min_score: Option<f64>,
}

impl FunctionScoreQuery {
    /// Create an empty function score query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inner query.
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(Box::new(query.into()));
        self
    }

    /// Set boost.
    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Add a scoring function.
    pub fn function(mut self, function: ScoreFunction) -> Self {
        self.functions.push(function);
        self
    }

    /// Set a top-level random score.
    pub fn random_score(mut self, random: RandomScore) -> Self {
        self.random_score = Some(random);
        self
    }

    /// Set a top-level field value factor.
    pub fn field_value_factor(mut self, factor: FieldValueFactor) -> Self {
        self.field_value_factor = Some(factor);
        self
    }

    /// Cap the function score.
    pub fn max_boost(mut self, max_boost: f64) -> Self {
        self.max_boost = Some(max_boost);
        self
    }

    /// How function scores combine (multiply, sum, avg, first, max, min).
    pub fn score_mode(mut self, mode: impl Into<String>) -> Self {
        self.score_mode = Some(mode.into());
        self
    }

    /// How the function score combines with the query score.
    pub fn boost_mode(mut self, mode: impl Into<String>) -> Self {
        self.boost_mode = Some(mode.into());
        self
    }

    /// Drop documents scoring below this.
    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

impl Node for FunctionScoreQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut body = Document::new();
        if let Some(query) = &self.query {
            body.put("query", query.serialize()?);
        }
        body.put_opt("boost", self.boost);
        if !self.functions.is_empty() {
            let functions = self
                .functions
                .iter()
                .map(|f| f.serialize().map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;
            body.put("functions", functions);
        }
        if let Some(random) = &self.random_score {
            body.put("random_score", random.serialize()?);
        }
        if let Some(factor) = &self.field_value_factor {
            body.put("field_value_factor", factor.serialize()?);
        }
        body.put_opt("max_boost", self.max_boost);
        body.put_opt("score_mode", self.score_mode.clone());
        body.put_opt("boost_mode", self.boost_mode.clone());
        body.put_opt("min_score", self.min_score);
        Ok(single("function_score", body))
    }
}

/// One entry of a function score's `functions` list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreFunction {
    filter: Option<Query>,
    random_score: Option<RandomScore>,
    script_score: Option<Script>,
    field_value_factor: Option<FieldValueFactor>,
    weight: Option<f64>,
}

impl ScoreFunction {
    /// Create an empty function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the function to documents matching `filter`.
    pub fn filter(mut self, filter: impl Into<Query>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Random scoring.
    pub fn random_score(mut self, random: RandomScore) -> Self {
        self.random_score = Some(random);
        self
    }

    /// Script scoring.
    pub fn script_score(mut self, script: Script) -> Self {
        self.script_score = Some(script);
        self
    }

    /// Field value factor scoring.
    pub fn field_value_factor(mut self, factor: FieldValueFactor) -> Self {
        self.field_value_factor = Some(factor);
        self
    }

    /// Weight multiplier.
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

impl Node for ScoreFunction {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut body = Document::new();
        if let Some(filter) = &self.filter {
            body.put("filter", filter.serialize()?);
        }
        if let Some(random) = &self.random_score {
            body.put("random_score", random.serialize()?);
        }
        if let Some(script) = &self.script_score {
            body.put("script_score", single("script", script.serialize()?));
        }
        if let Some(factor) = &self.field_value_factor {
            body.put("field_value_factor", factor.serialize()?);
        }
        body.put_opt("weight", self.weight);
        Ok(body)
    }
}

/// Random score function body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RandomScore {
    seed: Option<Value>,
    field: Option<String>,
}

impl RandomScore {
    /// Unseeded random score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed for reproducible ordering.
    pub fn seed(mut self, seed: impl Into<Value>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    /// Field the seed is combined with.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl Node for RandomScore {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        let mut body = Document::new();
        body.put_opt("seed", self.seed.clone());
        body.put_opt("field", self.field.clone().filter(|f| !f.is_empty()));
        Ok(body)
    }
}

/// Field value factor function body.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValueFactor {
    field: String,
    factor: Option<f64>,
    modifier: Option<String>,
    missing: Option<f64>,
}

impl FieldValueFactor {
    /// Score by the value of `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            factor: None,
            modifier: None,
            missing: None,
        }
    }

    /// Multiplier applied to the field value.
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = Some(factor);
        self
    }

    /// Modifier (none, log, log1p, sqrt, ...).
    pub fn modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    /// Value used when the field is missing.
    pub fn missing(mut self, missing: f64) -> Self {
        self.missing = Some(missing);
        self
    }
}

impl Node for FieldValueFactor {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.field.is_empty() {
            return Err(ValidationError::MissingField {
                kind: "field_value_factor",
                field: "field",
            });
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Document, ValidationError> {
        self.validate()?;
        let mut body = Document::new();
        body.put("field", self.field.clone());
        body.put_opt("factor", self.factor);
        body.put_opt("modifier", self.modifier.clone());
        body.put_opt("missing", self.missing);
        Ok(body)
    }
}
