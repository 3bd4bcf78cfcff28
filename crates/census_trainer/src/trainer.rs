//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Binary log-loss boosting with fixed-point gradients and exact-greedy
//! CART trees. Scores are accumulated with the same integer formula the
//! classifier uses at inference, so the training-time score of a row is
//! exactly what the saved classifier reproduces.

use census_core::gbdt::{probability, quantize, tree_contribution};
use census_core::{Classifier, FeatureVector, GbdtClassifier, Tree, SCALE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cart::{CartBuilder, SortedColumns, TreeConfig};
use crate::errors::{Result, TrainerError};

/// Positive rates are clamped to `[1e-6, 1 - 1e-6]` before the bias
/// log-odds is taken.
const MIN_RATE: f64 = 1e-6;

/// GBDT training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtConfig {
    pub num_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Shrinkage per tree, e.g. 0.1
    pub learning_rate: f64,
    /// L2 penalty on leaf values, e.g. 1.0
    pub l2_regularization: f64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: 4,
            min_samples_leaf: 20,
            learning_rate: 0.1,
            l2_regularization: 1.0,
        }
    }
}

impl GbdtConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(TrainerError::Config("num_trees must be positive".to_string()));
        }
        if self.max_depth == 0 {
            return Err(TrainerError::Config("max_depth must be positive".to_string()));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::Config("min_samples_leaf must be positive".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(TrainerError::Config(format!(
                "learning_rate must lie in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.l2_regularization >= 0.0 && self.l2_regularization.is_finite()) {
            return Err(TrainerError::Config(format!(
                "l2_regularization must be a non-negative number, got {}",
                self.l2_regularization
            )));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            l2_regularization: quantize(self.l2_regularization, SCALE),
        }
    }
}

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GbdtConfig {
        &self.config
    }

    /// Train a classifier on position-aligned feature vectors and class
    /// bits (1 = positive).
    pub fn train(&self, features: &[FeatureVector], labels: &[u8]) -> Result<GbdtClassifier> {
        self.config.validate()?;
        let feature_count = check_inputs(features, labels)?;

        let quantized: Vec<Vec<i64>> = features
            .iter()
            .map(|row| row.iter().map(|&value| quantize(value, SCALE)).collect())
            .collect();
        let targets: Vec<i64> = labels.iter().map(|&bit| i64::from(bit) * SCALE).collect();

        let bias = initial_bias(labels);
        let learning_rate = quantize(self.config.learning_rate, SCALE);
        let tree_config = self.config.tree_config();
        let columns = SortedColumns::new(&quantized, feature_count);

        info!(
            rows = quantized.len(),
            features = feature_count,
            trees = self.config.num_trees,
            max_depth = self.config.max_depth,
            bias,
            "training classifier"
        );

        let mut scores = vec![bias; quantized.len()];
        let mut trees = Vec::with_capacity(self.config.num_trees);

        for tree_idx in 0..self.config.num_trees {
            let (gradients, hessians) = gradients_hessians(&targets, &scores);

            let nodes = CartBuilder::new(&quantized, &gradients, &hessians, tree_config.clone())
                .build(&columns);
            let tree = Tree::new(nodes, learning_rate);

            for (score, row) in scores.iter_mut().zip(&quantized) {
                *score = score.saturating_add(tree_contribution(&tree, row, SCALE));
            }

            debug!(
                tree = tree_idx + 1,
                nodes = tree.nodes.len(),
                log_loss = log_loss(labels, &scores),
                "trained tree"
            );
            trees.push(tree);
        }

        let classifier = GbdtClassifier::new(trees, bias, feature_count);
        classifier
            .validate()
            .map_err(|e| TrainerError::Training(e.to_string()))?;

        info!(
            trees = classifier.num_trees(),
            log_loss = log_loss(labels, &scores),
            "training complete"
        );

        Ok(classifier)
    }
}

/// Returns the shared feature width.
fn check_inputs(features: &[FeatureVector], labels: &[u8]) -> Result<usize> {
    if features.is_empty() {
        return Err(TrainerError::Training("no training rows".to_string()));
    }
    if features.len() != labels.len() {
        return Err(TrainerError::Training(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    if let Some(bad) = labels.iter().find(|&&bit| bit > 1) {
        return Err(TrainerError::Training(format!("label bit {bad} is not 0 or 1")));
    }

    let feature_count = features[0].len();
    if let Some(row) = features.iter().position(|row| row.len() != feature_count) {
        return Err(TrainerError::Training(format!(
            "row {row} has {} features, expected {feature_count}",
            features[row].len()
        )));
    }
    Ok(feature_count)
}

/// Log-odds of the positive rate at SCALE
fn initial_bias(labels: &[u8]) -> i64 {
    let positives = labels.iter().filter(|&&bit| bit == 1).count();
    let rate = (positives as f64 / labels.len() as f64).clamp(MIN_RATE, 1.0 - MIN_RATE);
    quantize((rate / (1.0 - rate)).ln(), SCALE)
}

/// Log-loss gradients `p - y` and hessians `max(p(1 - p), 1)` at SCALE
fn gradients_hessians(targets: &[i64], scores: &[i64]) -> (Vec<i64>, Vec<i64>) {
    targets
        .iter()
        .zip(scores)
        .map(|(&target, &score)| {
            let p = quantize(probability(score, SCALE), SCALE);
            let hessian = (p * (SCALE - p) / SCALE).max(1);
            (p - target, hessian)
        })
        .unzip()
}

fn log_loss(labels: &[u8], scores: &[i64]) -> f64 {
    let total: f64 = labels
        .iter()
        .zip(scores)
        .map(|(&bit, &score)| {
            let p = probability(score, SCALE).clamp(MIN_RATE, 1.0 - MIN_RATE);
            if bit == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / labels.len().max(1) as f64
}

/// Fraction of rows whose predicted class matches the label
pub fn accuracy(classifier: &GbdtClassifier, features: &[FeatureVector], labels: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = features
        .iter()
        .zip(labels)
        .filter(|(row, bit)| classifier.predict(row) == **bit)
        .count();
    correct as f64 / labels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Positive iff x > 5, plus an uninformative column
    fn threshold_dataset() -> (Vec<FeatureVector>, Vec<u8>) {
        let features: Vec<FeatureVector> = (0..40)
            .map(|i| vec![(i % 10) as f64, (i % 3) as f64])
            .collect();
        let labels = features.iter().map(|row| u8::from(row[0] > 5.0)).collect();
        (features, labels)
    }

    fn small_config() -> GbdtConfig {
        GbdtConfig {
            num_trees: 20,
            max_depth: 2,
            min_samples_leaf: 2,
            learning_rate: 0.3,
            l2_regularization: 1.0,
        }
    }

    #[test]
    fn test_learns_threshold() {
        let (features, labels) = threshold_dataset();
        let classifier = GbdtTrainer::new(small_config()).train(&features, &labels).unwrap();

        assert_eq!(classifier.num_trees(), 20);
        assert_eq!(classifier.feature_count, 2);
        assert_eq!(accuracy(&classifier, &features, &labels), 1.0);
        assert!(classifier.predict_proba(&[9.0, 0.0]) > 0.9);
        assert!(classifier.predict_proba(&[1.0, 0.0]) < 0.1);

        // the root of the first tree splits on the informative column
        assert_eq!(classifier.trees[0].nodes[0].feature_idx, 0);
        assert_eq!(classifier.trees[0].nodes[0].threshold, 5 * SCALE);
    }

    #[test]
    fn test_training_is_deterministic() {
        let (features, labels) = threshold_dataset();
        let trainer = GbdtTrainer::new(small_config());
        let a = trainer.train(&features, &labels).unwrap();
        let b = trainer.train(&features, &labels).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_hex().unwrap(), b.hash_hex().unwrap());
    }

    #[test]
    fn test_bias_is_log_odds_of_positive_rate() {
        assert_eq!(initial_bias(&[0, 1]), 0);
        let bias = initial_bias(&[1, 0, 0, 0]);
        assert!((bias as f64 / SCALE as f64 - (1.0f64 / 3.0).ln()).abs() < 1e-6);
        // a single class is clamped instead of diverging
        assert!(initial_bias(&[1, 1, 1]) < 14 * SCALE);
    }

    #[test]
    fn test_gradients_and_hessians() {
        let (gradients, hessians) = gradients_hessians(&[SCALE, 0], &[0, 0]);
        assert_eq!(gradients, vec![-SCALE / 2, SCALE / 2]);
        assert_eq!(hessians, vec![SCALE / 4, SCALE / 4]);

        let (_, hessians) = gradients_hessians(&[SCALE], &[40 * SCALE]);
        assert_eq!(hessians, vec![1]);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let trainer = GbdtTrainer::new(small_config());
        assert!(trainer.train(&[], &[]).is_err());
        assert!(trainer.train(&[vec![1.0]], &[0, 1]).is_err());
        assert!(trainer.train(&[vec![1.0], vec![2.0]], &[0, 2]).is_err());
        assert!(trainer.train(&[vec![1.0], vec![2.0, 3.0]], &[0, 1]).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(GbdtConfig::default().validate().is_ok());

        for broken in [
            GbdtConfig { num_trees: 0, ..GbdtConfig::default() },
            GbdtConfig { max_depth: 0, ..GbdtConfig::default() },
            GbdtConfig { min_samples_leaf: 0, ..GbdtConfig::default() },
            GbdtConfig { learning_rate: 0.0, ..GbdtConfig::default() },
            GbdtConfig { l2_regularization: -1.0, ..GbdtConfig::default() },
        ] {
            assert!(matches!(broken.validate(), Err(TrainerError::Config(_))));
        }
    }
}
