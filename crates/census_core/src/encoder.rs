//! One-hot encoding of categorical attributes
//!
//! The vocabulary is fitted once from the training split and is immutable
//! afterwards. Values are sorted lexicographically (byte order) so the
//! indicator column order is a pure function of the training data.
//! Unseen values encode to an all-zero block; they never raise.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{CensusError, Result};
use crate::record::Record;
use crate::schema::Schema;

/// Sorted distinct values of one categorical attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeVocabulary {
    pub attribute: String,
    pub values: Vec<String>,
}

impl AttributeVocabulary {
    /// Indicator position of `value`, if it was seen during fit.
    pub fn position(&self, value: &str) -> Option<usize> {
        self.values
            .binary_search_by(|candidate| candidate.as_str().cmp(value))
            .ok()
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }
}

/// Per-attribute vocabularies, in schema order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalVocabulary {
    entries: Vec<AttributeVocabulary>,
}

impl CategoricalVocabulary {
    pub fn entries(&self) -> &[AttributeVocabulary] {
        &self.entries
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeVocabulary> {
        self.entries.iter().find(|entry| entry.attribute == attribute)
    }

    /// Total number of indicator columns
    pub fn width(&self) -> usize {
        self.entries.iter().map(AttributeVocabulary::width).sum()
    }

    /// Indicator column names, `attribute=value`, in column order
    pub fn column_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .values
                    .iter()
                    .map(move |value| format!("{}={}", entry.attribute, value))
            })
            .collect()
    }

    /// Sorted, de-duplicated values are required for binary search and for
    /// a stable column order. Persisted vocabularies are checked with this.
    pub fn is_canonical(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.values.windows(2).all(|pair| pair[0] < pair[1]))
    }
}

/// Fits and applies the one-hot encoding. Knows nothing about numeric
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalEncoder {
    attributes: Vec<String>,
}

impl CategoricalEncoder {
    /// Encoder over the schema's categorical attributes
    pub fn new(schema: &Schema) -> Self {
        Self {
            attributes: schema.categorical().map(str::to_string).collect(),
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Collect distinct values per categorical attribute.
    ///
    /// Fails with `Schema` if any record lacks a categorical attribute.
    pub fn fit(&self, records: &[Record]) -> Result<CategoricalVocabulary> {
        let mut seen: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); self.attributes.len()];

        for (row, record) in records.iter().enumerate() {
            for (attribute, values) in self.attributes.iter().zip(seen.iter_mut()) {
                let value = record.categorical(attribute).map_err(|err| match err {
                    CensusError::Schema { attribute, reason } => CensusError::Schema {
                        attribute,
                        reason: format!("{reason} (training row {row})"),
                    },
                    other => other,
                })?;
                values.insert(value);
            }
        }

        let entries = self
            .attributes
            .iter()
            .zip(seen)
            .map(|(attribute, values)| AttributeVocabulary {
                attribute: attribute.clone(),
                values: values.into_iter().map(str::to_string).collect(),
            })
            .collect();

        Ok(CategoricalVocabulary { entries })
    }

    /// Indicator block for one record: one 0/1 column per vocabulary entry,
    /// attributes in schema order.
    pub fn transform(&self, record: &Record, vocabulary: &CategoricalVocabulary) -> Result<Vec<f64>> {
        let mut block = Vec::with_capacity(vocabulary.width());
        self.transform_into(record, vocabulary, &mut block)?;
        Ok(block)
    }

    /// Append the indicator block to `out`.
    pub(crate) fn transform_into(
        &self,
        record: &Record,
        vocabulary: &CategoricalVocabulary,
        out: &mut Vec<f64>,
    ) -> Result<()> {
        self.check_vocabulary(vocabulary)?;

        for entry in &vocabulary.entries {
            let value = record.categorical(&entry.attribute)?;
            let start = out.len();
            out.resize(start + entry.width(), 0.0);
            if let Some(position) = entry.position(value) {
                out[start + position] = 1.0;
            }
        }

        Ok(())
    }

    /// The vocabulary must list exactly this encoder's attributes, in order.
    pub(crate) fn check_vocabulary(&self, vocabulary: &CategoricalVocabulary) -> Result<()> {
        let matches = vocabulary.entries.len() == self.attributes.len()
            && vocabulary
                .entries
                .iter()
                .zip(&self.attributes)
                .all(|(entry, attribute)| &entry.attribute == attribute);

        if matches {
            Ok(())
        } else {
            let found: Vec<&str> = vocabulary
                .entries
                .iter()
                .map(|entry| entry.attribute.as_str())
                .collect();
            Err(CensusError::ArtifactMismatch(format!(
                "vocabulary attributes {found:?} do not match categorical attributes {:?}",
                self.attributes
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{small_record, small_schema};

    fn fitted() -> (CategoricalEncoder, CategoricalVocabulary) {
        let encoder = CategoricalEncoder::new(&small_schema());
        let records = vec![
            small_record(1.0, "red", 2.0, "square"),
            small_record(3.0, "blue", 4.0, "circle"),
            small_record(5.0, "red", 6.0, "circle"),
            small_record(7.0, "green", 8.0, "square"),
        ];
        let vocabulary = encoder.fit(&records).unwrap();
        (encoder, vocabulary)
    }

    #[test]
    fn fit_sorts_values_per_attribute() {
        let (_, vocabulary) = fitted();
        assert_eq!(
            vocabulary.get("color").unwrap().values,
            vec!["blue", "green", "red"]
        );
        assert_eq!(
            vocabulary.get("shape").unwrap().values,
            vec!["circle", "square"]
        );
        assert_eq!(vocabulary.width(), 5);
        assert!(vocabulary.is_canonical());
        assert_eq!(
            vocabulary.column_names(),
            vec![
                "color=blue",
                "color=green",
                "color=red",
                "shape=circle",
                "shape=square"
            ]
        );
    }

    #[test]
    fn transform_sets_single_indicator_per_attribute() {
        let (encoder, vocabulary) = fitted();
        let block = encoder
            .transform(&small_record(0.0, "green", 0.0, "circle"), &vocabulary)
            .unwrap();
        assert_eq!(block, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn unseen_value_encodes_to_zero_block() {
        let (encoder, vocabulary) = fitted();
        let block = encoder
            .transform(&small_record(0.0, "purple", 0.0, "square"), &vocabulary)
            .unwrap();
        assert_eq!(block, vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn fit_rejects_missing_categorical() {
        let encoder = CategoricalEncoder::new(&small_schema());
        let mut broken = small_record(1.0, "red", 2.0, "square");
        broken.remove("shape");
        let records = vec![small_record(1.0, "red", 2.0, "square"), broken];

        let err = encoder.fit(&records).unwrap_err();
        match err {
            CensusError::Schema { attribute, reason } => {
                assert_eq!(attribute, "shape");
                assert!(reason.contains("training row 1"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn foreign_vocabulary_is_rejected() {
        let (_, vocabulary) = fitted();
        let census = CategoricalEncoder::new(&Schema::census());
        let err = census
            .transform(&crate::test_support::census_record(), &vocabulary)
            .unwrap_err();
        assert!(matches!(err, CensusError::ArtifactMismatch(_)));
    }
}
