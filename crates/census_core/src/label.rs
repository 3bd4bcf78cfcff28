//! Two-class label binarization
//!
//! The mapping is fixed once from the training labels and persisted with
//! the artifacts. It is never re-derived from evaluation or serving data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{CensusError, Result};

/// Maps the negative label to 0 and the positive label to 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBinarizer {
    negative: String,
    positive: String,
}

impl LabelBinarizer {
    /// Fit from training labels; the lexicographically later label is
    /// positive.
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let (negative, positive) = Self::distinct(labels)?;
        Ok(Self {
            negative: negative.to_string(),
            positive: positive.to_string(),
        })
    }

    /// Fit from training labels with a domain-designated positive label.
    pub fn fit_with_positive<S: AsRef<str>>(labels: &[S], positive: &str) -> Result<Self> {
        let negative = match Self::distinct(labels)? {
            (first, second) if second == positive => first,
            (first, second) if first == positive => second,
            (first, second) => {
                return Err(CensusError::LabelCardinality {
                    found: vec![first.to_string(), second.to_string()],
                })
            }
        };
        Ok(Self {
            negative: negative.to_string(),
            positive: positive.to_string(),
        })
    }

    /// The two distinct labels in byte order
    fn distinct<S: AsRef<str>>(labels: &[S]) -> Result<(&str, &str)> {
        let distinct: BTreeSet<&str> = labels.iter().map(AsRef::as_ref).collect();
        let mut iter = distinct.iter().copied();
        match (iter.next(), iter.next(), iter.next()) {
            (Some(first), Some(second), None) => Ok((first, second)),
            _ => Err(CensusError::LabelCardinality {
                found: distinct.iter().map(|l| l.to_string()).collect(),
            }),
        }
    }

    pub fn encode(&self, label: &str) -> Result<u8> {
        if label == self.positive {
            Ok(1)
        } else if label == self.negative {
            Ok(0)
        } else {
            Err(CensusError::InvalidLabel(format!(
                "'{label}' is neither '{}' nor '{}'",
                self.negative, self.positive
            )))
        }
    }

    pub fn decode(&self, bit: u8) -> Result<&str> {
        match bit {
            0 => Ok(&self.negative),
            1 => Ok(&self.positive),
            other => Err(CensusError::InvalidLabel(format!("bit {other} is not 0 or 1"))),
        }
    }

    /// Encode a label column, preserving order
    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<u8>> {
        labels.iter().map(|label| self.encode(label.as_ref())).collect()
    }

    pub fn negative(&self) -> &str {
        &self.negative
    }

    pub fn positive(&self) -> &str {
        &self.positive
    }
}
