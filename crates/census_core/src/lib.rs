//! Census income classifier core
//!
//! Transforms raw census records into fixed-width feature vectors
//! identically at training and serving time, evaluates predictions per
//! demographic slice, and persists the fitted state as versioned artifacts.
//!
//! Modules:
//! - `schema`: fixed attribute order, kinds and label set
//! - `record`: typed records validated against the schema
//! - `encoder`: one-hot vocabulary fitting and encoding
//! - `label`: two-class label binarization
//! - `pipeline`: numeric pass-through plus categorical block
//! - `slice`: per-slice precision/recall/F1
//! - `gbdt`: deterministic gradient boosted tree classifier
//! - `artifact`: versioned encoder/classifier persistence
//! - `predictor`: read-only serving facade

pub mod artifact;
pub mod classifier;
pub mod encoder;
pub mod errors;
pub mod gbdt;
pub mod label;
pub mod pipeline;
pub mod predictor;
pub mod record;
pub mod schema;
pub mod serde_canon;
pub mod slice;

#[cfg(test)]
mod test_support;

pub use artifact::{ArtifactManifest, ArtifactStore, TrainedArtifacts};
pub use classifier::Classifier;
pub use encoder::{AttributeVocabulary, CategoricalEncoder, CategoricalVocabulary};
pub use errors::{CensusError, Result};
pub use gbdt::{GbdtClassifier, Node, Tree, SCALE};
pub use label::LabelBinarizer;
pub use pipeline::{FeaturePipeline, FeatureVector, Holdout, HoldoutSplit, Partition, Train, TrainSplit};
pub use predictor::{Prediction, Predictor};
pub use record::{Record, Value};
pub use schema::{Attribute, AttributeKind, Schema};
pub use slice::{ConfusionCounts, SliceEvaluator, SliceMetric};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
