//! Typed input records
//!
//! A record maps attribute names to tagged values. It is validated against
//! the schema once, at the boundary of `transform`, before any column is
//! produced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{CensusError, Result};
use crate::schema::{AttributeKind, Schema};

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Numeric(f64),
    Categorical(String),
    /// Explicit absence (JSON `null`)
    Missing,
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Numeric(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Numeric(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Categorical(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Categorical(value)
    }
}

/// Mapping from attribute name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Numeric value of `name`, or `MissingAttribute` when absent.
    pub fn numeric(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(Value::Numeric(value)) => Ok(*value),
            None | Some(Value::Missing) => Err(CensusError::MissingAttribute {
                attribute: name.to_string(),
            }),
            Some(Value::Categorical(value)) => Err(CensusError::schema(
                name,
                format!("expected a numeric value, found string '{value}'"),
            )),
        }
    }

    /// Categorical value of `name`, or `Schema` error when absent.
    pub fn categorical(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(Value::Categorical(value)) => Ok(value),
            None | Some(Value::Missing) => Err(CensusError::schema(
                name,
                "missing categorical attribute",
            )),
            Some(Value::Numeric(value)) => Err(CensusError::schema(
                name,
                format!("expected a string value, found number {value}"),
            )),
        }
    }

    /// Check that the record carries exactly the schema's attributes with
    /// the right value kinds.
    ///
    /// Schema attributes are checked first, in schema order, then any
    /// attribute the schema does not declare is rejected.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for attribute in schema.attributes() {
            match attribute.kind {
                AttributeKind::Numeric => {
                    let value = self.numeric(&attribute.name)?;
                    if !value.is_finite() {
                        return Err(CensusError::schema(
                            &attribute.name,
                            format!("numeric value {value} is not finite"),
                        ));
                    }
                }
                AttributeKind::Categorical => {
                    self.categorical(&attribute.name)?;
                }
            }
        }

        if let Some(extra) = self.values.keys().find(|name| schema.attribute(name).is_none()) {
            return Err(CensusError::schema(extra, "attribute is not part of the schema"));
        }

        Ok(())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
