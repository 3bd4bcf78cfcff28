//! Fixed attribute schema shared by training and serving
//!
//! The schema fixes the attribute order, which attributes are numeric and
//! which are categorical, and the two output labels. Everything downstream
//! (column order, slice order, artifact compatibility) is derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{CensusError, Result};
use crate::serde_canon::hash_canonical_hex;

/// Whether an attribute is passed through as a number or one-hot encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Numeric,
    Categorical,
}

/// A named schema attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Categorical,
        }
    }
}

/// Ordered attribute list plus the two-element label set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaFields")]
pub struct Schema {
    attributes: Vec<Attribute>,
    label_column: String,
    /// `[negative, positive]`
    labels: [String; 2],
}

/// Persisted form of [`Schema`], re-validated through [`Schema::new`]
#[derive(Deserialize)]
struct SchemaFields {
    attributes: Vec<Attribute>,
    label_column: String,
    labels: [String; 2],
}

impl TryFrom<SchemaFields> for Schema {
    type Error = CensusError;

    fn try_from(fields: SchemaFields) -> Result<Self> {
        let [negative, positive] = fields.labels;
        Schema::new(fields.attributes, fields.label_column, negative, positive)
    }
}

impl Schema {
    /// Build a schema, rejecting duplicate names and degenerate label sets.
    pub fn new(
        attributes: Vec<Attribute>,
        label_column: impl Into<String>,
        negative_label: impl Into<String>,
        positive_label: impl Into<String>,
    ) -> Result<Self> {
        let label_column = label_column.into();
        let labels = [negative_label.into(), positive_label.into()];

        if attributes.is_empty() {
            return Err(CensusError::schema("<schema>", "schema has no attributes"));
        }

        let mut seen = BTreeSet::new();
        for attribute in &attributes {
            if attribute.name.is_empty() {
                return Err(CensusError::schema("<schema>", "attribute name is empty"));
            }
            if !seen.insert(attribute.name.as_str()) {
                return Err(CensusError::schema(&attribute.name, "duplicate attribute"));
            }
        }

        if seen.contains(label_column.as_str()) {
            return Err(CensusError::schema(
                &label_column,
                "label column is also declared as an attribute",
            ));
        }

        if labels[0] == labels[1] {
            return Err(CensusError::LabelCardinality {
                found: vec![labels[0].clone()],
            });
        }

        Ok(Self {
            attributes,
            label_column,
            labels,
        })
    }

    /// Schema of the 1994 US census income extract.
    pub fn census() -> Self {
        let attributes = vec![
            Attribute::numeric("age"),
            Attribute::categorical("workclass"),
            Attribute::numeric("fnlgt"),
            Attribute::categorical("education"),
            Attribute::numeric("education-num"),
            Attribute::categorical("marital-status"),
            Attribute::categorical("occupation"),
            Attribute::categorical("relationship"),
            Attribute::categorical("race"),
            Attribute::categorical("sex"),
            Attribute::numeric("capital-gain"),
            Attribute::numeric("capital-loss"),
            Attribute::numeric("hours-per-week"),
            Attribute::categorical("native-country"),
        ];

        Self {
            attributes,
            label_column: "salary".to_string(),
            labels: ["<=50K".to_string(), ">50K".to_string()],
        }
    }

    /// All attributes in schema order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Numeric attribute names in schema order
    pub fn numeric(&self) -> impl Iterator<Item = &str> + '_ {
        self.names_of(AttributeKind::Numeric)
    }

    /// Categorical attribute names in schema order
    pub fn categorical(&self) -> impl Iterator<Item = &str> + '_ {
        self.names_of(AttributeKind::Categorical)
    }

    fn names_of(&self, kind: AttributeKind) -> impl Iterator<Item = &str> + '_ {
        self.attributes
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.name.as_str())
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// `[negative, positive]`
    pub fn labels(&self) -> [&str; 2] {
        [&self.labels[0], &self.labels[1]]
    }

    pub fn negative_label(&self) -> &str {
        &self.labels[0]
    }

    pub fn positive_label(&self) -> &str {
        &self.labels[1]
    }

    /// Blake3 hex digest of the canonical JSON form.
    ///
    /// Covers attribute names, kinds and order, the label column and labels,
    /// so any reordering changes the fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Describe the first difference between two schemas, if any.
    pub fn first_difference(&self, other: &Schema) -> Option<String> {
        let longest = self.attributes.len().max(other.attributes.len());
        for position in 0..longest {
            match (self.attributes.get(position), other.attributes.get(position)) {
                (Some(a), Some(b)) if a == b => continue,
                (Some(a), Some(b)) => {
                    return Some(format!(
                        "attribute {position}: expected '{}' ({:?}), found '{}' ({:?})",
                        a.name, a.kind, b.name, b.kind
                    ))
                }
                (Some(a), None) => {
                    return Some(format!("attribute {position}: expected '{}', found nothing", a.name))
                }
                (None, Some(b)) => {
                    return Some(format!("attribute {position}: unexpected extra '{}'", b.name))
                }
                (None, None) => break,
            }
        }

        if self.label_column != other.label_column {
            return Some(format!(
                "label column: expected '{}', found '{}'",
                self.label_column, other.label_column
            ));
        }
        if self.labels != other.labels {
            return Some(format!(
                "labels: expected {:?}, found {:?}",
                self.labels, other.labels
            ));
        }
        None
    }
}
