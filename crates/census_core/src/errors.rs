//! Error types for the census core

use thiserror::Error;

use crate::gbdt::ModelError;
use crate::serde_canon::CanonicalError;

/// Errors raised by the feature pipeline, evaluator and artifact store.
#[derive(Error, Debug)]
pub enum CensusError {
    /// Record attribute set or value type does not match the schema
    #[error("schema error for attribute '{attribute}': {reason}")]
    Schema { attribute: String, reason: String },

    /// Numeric attribute has no value
    #[error("missing value for numeric attribute '{attribute}'")]
    MissingAttribute { attribute: String },

    /// Training labels are not exactly two distinct classes
    #[error("expected exactly 2 distinct labels, found {}: {found:?}", found.len())]
    LabelCardinality { found: Vec<String> },

    /// Persisted artifacts disagree with the running schema
    #[error("artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// Label string or bit not known to the binarizer
    #[error("invalid label: {0}")]
    InvalidLabel(String),

    /// Position-aligned sequences have different lengths
    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Classifier validation failed
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Canonical serialization error
    #[error("canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CensusError {
    pub(crate) fn schema(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for census core operations
pub type Result<T> = std::result::Result<T, CensusError>;
