//! Serving facade over loaded artifacts
//!
//! A `Predictor` is immutable once built. Share it behind an `Arc` and call
//! it from any number of threads; nothing in the predict path writes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::artifact::{ArtifactStore, TrainedArtifacts};
use crate::classifier::Classifier;
use crate::errors::Result;
use crate::pipeline::{FeaturePipeline, FeatureVector};
use crate::record::Record;
use crate::schema::Schema;

/// Result handed back to the API layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Decoded label string
    pub label: String,
    /// Probability of the predicted class, in `[0.5, 1]`
    pub confidence: f64,
    /// Probability of the positive class
    pub positive_probability: f64,
}

#[derive(Debug, Clone)]
pub struct Predictor {
    pipeline: FeaturePipeline,
    artifacts: TrainedArtifacts,
}

impl Predictor {
    pub fn new(artifacts: TrainedArtifacts) -> Self {
        let pipeline = FeaturePipeline::new(artifacts.schema().clone());
        Self {
            pipeline,
            artifacts,
        }
    }

    /// Load and validate artifacts from `dir` against `schema`.
    pub fn load(dir: impl AsRef<Path>, schema: &Schema) -> Result<Self> {
        let artifacts = ArtifactStore::new(dir.as_ref()).load(schema)?;
        Ok(Self::new(artifacts))
    }

    pub fn artifacts(&self) -> &TrainedArtifacts {
        &self.artifacts
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    /// Transform with the persisted vocabulary
    pub fn features(&self, record: &Record) -> Result<FeatureVector> {
        self.pipeline.transform(record, self.artifacts.vocabulary())
    }

    pub fn predict(&self, record: &Record) -> Result<Prediction> {
        let features = self.features(record)?;
        self.predict_features(&features)
    }

    /// Predictions in input order
    pub fn predict_batch(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        records.iter().map(|record| self.predict(record)).collect()
    }

    /// Class bits for already transformed features, in input order
    pub fn predict_bits(&self, features: &[FeatureVector]) -> Vec<u8> {
        let classifier = self.artifacts.classifier();
        features.iter().map(|row| classifier.predict(row)).collect()
    }

    fn predict_features(&self, features: &[f64]) -> Result<Prediction> {
        let positive_probability = self.artifacts.classifier().predict_proba(features);
        let bit = u8::from(positive_probability >= 0.5);
        let label = self.artifacts.labels().decode(bit)?.to_string();
        let confidence = positive_probability.max(1.0 - positive_probability);

        Ok(Prediction {
            label,
            confidence,
            positive_probability,
        })
    }
}
