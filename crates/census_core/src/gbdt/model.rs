//! Binary GBDT classifier with deterministic integer inference
//!
//! Features arrive as `f64` columns from the feature pipeline and are
//! quantized to fixed point once per call. Tree traversal and score
//! accumulation are integer-only, so a given artifact scores a given
//! record identically on every platform. Only the final logistic link is
//! floating point.

use super::tree::Tree;
use crate::classifier::Classifier;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json, CanonicalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// GBDT model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("Canonical serialization error: {0}")]
    CanonicalError(#[from] CanonicalError),
}

/// Default scale factor for fixed-point arithmetic (1e6)
pub const SCALE: i64 = 1_000_000;

/// Current model format version
pub const MODEL_VERSION: i32 = 1;

/// Quantize a feature value to fixed point at `scale`, saturating at the
/// i64 range.
pub fn quantize(value: f64, scale: i64) -> i64 {
    let scaled = (value * scale as f64).round();
    if scaled.is_nan() {
        0
    } else {
        // `as` saturates for out-of-range floats
        scaled as i64
    }
}

/// Gradient boosted trees over log-odds of the positive class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GbdtClassifier {
    /// Model format version
    pub version: i32,

    /// Fixed-point scale for features, thresholds, leaves and weights
    pub scale: i64,

    /// Number of feature columns the trees were grown on
    pub feature_count: usize,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,

    /// Initial log-odds (fixed-point)
    pub bias: i64,
}

impl GbdtClassifier {
    pub fn new(trees: Vec<Tree>, bias: i64, feature_count: usize) -> Self {
        Self {
            version: MODEL_VERSION,
            scale: SCALE,
            feature_count,
            trees,
            bias,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.scale <= 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid scale: {}",
                self.scale
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Quantize a feature vector to the model scale
    pub fn quantize_features(&self, features: &[f64]) -> Vec<i64> {
        features.iter().map(|&value| quantize(value, self.scale)).collect()
    }

    /// Raw log-odds score at `scale` for already quantized features.
    ///
    /// Each tree contributes `leaf * weight / scale`.
    pub fn score_fixed(&self, features: &[i64]) -> i64 {
        self.trees.iter().fold(self.bias, |sum, tree| {
            sum.saturating_add(tree_contribution(tree, features, self.scale))
        })
    }

    /// Raw log-odds score at `scale`
    pub fn score(&self, features: &[f64]) -> i64 {
        self.score_fixed(&self.quantize_features(features))
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        Ok(to_canonical_json(self)?)
    }

    /// Blake3 hash of the canonical JSON as hex
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hash_canonical_hex(self)?)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Weighted output of one tree at `scale`: `leaf * weight / scale`,
/// saturating at the i64 range.
pub fn tree_contribution(tree: &Tree, features: &[i64], scale: i64) -> i64 {
    let contribution = (tree.evaluate(features) as i128 * tree.weight as i128) / scale as i128;
    contribution.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Logistic link from fixed-point log-odds to probability
pub fn probability(score: i64, scale: i64) -> f64 {
    let z = score as f64 / scale as f64;
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for GbdtClassifier {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict_proba(&self, features: &[f64]) -> f64 {
        probability(self.score(features), self.scale)
    }
}
