//! Versioned artifact store for the fitted encoder and classifier
//!
//! A training run persists two files into an artifact directory:
//!
//! - `encoder.json`: manifest with format version, schema fingerprint,
//!   schema, column order, vocabulary, label mapping and the Blake3 hash of
//!   the classifier file
//! - `model.json`: the classifier as canonical JSON
//!
//! Loading reads the manifest first and refuses to go further when the
//! persisted schema or column order disagrees with the running schema, so a
//! mismatch is reported before the classifier is deserialized.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::encoder::CategoricalVocabulary;
use crate::errors::{CensusError, Result};
use crate::gbdt::GbdtClassifier;
use crate::label::LabelBinarizer;
use crate::pipeline::FeaturePipeline;
use crate::schema::Schema;
use crate::serde_canon::{hash_bytes_hex, to_canonical_json};

/// Manifest format understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;
pub const ENCODER_FILE: &str = "encoder.json";
pub const MODEL_FILE: &str = "model.json";

/// Fitted encoder state plus the trained classifier
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedArtifacts {
    schema: Schema,
    vocabulary: CategoricalVocabulary,
    labels: LabelBinarizer,
    classifier: GbdtClassifier,
}

impl TrainedArtifacts {
    /// Bundle fitted state, checking that the classifier width matches the
    /// pipeline width.
    pub fn new(
        schema: Schema,
        vocabulary: CategoricalVocabulary,
        labels: LabelBinarizer,
        classifier: GbdtClassifier,
    ) -> Result<Self> {
        let width = FeaturePipeline::new(schema.clone()).width(&vocabulary);
        if classifier.feature_count() != width {
            return Err(CensusError::ArtifactMismatch(format!(
                "classifier expects {} features, pipeline produces {width}",
                classifier.feature_count()
            )));
        }
        classifier.validate()?;

        Ok(Self {
            schema,
            vocabulary,
            labels,
            classifier,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn vocabulary(&self) -> &CategoricalVocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &LabelBinarizer {
        &self.labels
    }

    pub fn classifier(&self) -> &GbdtClassifier {
        &self.classifier
    }

    /// Column names in feature-vector order
    pub fn column_order(&self) -> Vec<String> {
        FeaturePipeline::new(self.schema.clone()).column_names(&self.vocabulary)
    }
}

/// Contents of `encoder.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub schema_fingerprint: String,
    pub schema: Schema,
    pub column_order: Vec<String>,
    pub vocabulary: CategoricalVocabulary,
    pub labels: LabelBinarizer,
    pub classifier_hash: String,
    pub created_at: String,
}

/// Saves and loads artifact directories
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.root.join(ENCODER_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(MODEL_FILE)
    }

    /// Write both files; returns the written manifest.
    ///
    /// The classifier is written first so a manifest never points at a
    /// classifier file that does not exist yet.
    pub fn save(&self, artifacts: &TrainedArtifacts) -> Result<ArtifactManifest> {
        fs::create_dir_all(&self.root)?;

        let model_json = artifacts.classifier.to_canonical_json()?;
        let classifier_hash = hash_bytes_hex(model_json.as_bytes());

        let manifest = ArtifactManifest {
            format_version: ARTIFACT_FORMAT_VERSION,
            schema_fingerprint: artifacts.schema.fingerprint()?,
            schema: artifacts.schema.clone(),
            column_order: artifacts.column_order(),
            vocabulary: artifacts.vocabulary.clone(),
            labels: artifacts.labels.clone(),
            classifier_hash,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        fs::write(self.model_path(), &model_json)?;
        fs::write(self.encoder_path(), to_canonical_json(&manifest)?)?;

        info!(
            path = %self.root.display(),
            columns = manifest.column_order.len(),
            trees = artifacts.classifier.num_trees(),
            classifier_hash = %manifest.classifier_hash,
            "saved artifacts"
        );

        Ok(manifest)
    }

    /// Read and check only the manifest against `schema`.
    pub fn load_manifest(&self, schema: &Schema) -> Result<ArtifactManifest> {
        let raw = fs::read_to_string(self.encoder_path())?;
        let manifest: ArtifactManifest = serde_json::from_str(&raw)?;

        if manifest.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(CensusError::ArtifactMismatch(format!(
                "unsupported artifact format version {} (expected {ARTIFACT_FORMAT_VERSION})",
                manifest.format_version
            )));
        }

        let expected_fingerprint = schema.fingerprint()?;
        if manifest.schema_fingerprint != expected_fingerprint || &manifest.schema != schema {
            let detail = schema
                .first_difference(&manifest.schema)
                .unwrap_or_else(|| "schema fingerprint differs".to_string());
            warn!(path = %self.root.display(), %detail, "artifact schema mismatch");
            return Err(CensusError::ArtifactMismatch(format!(
                "artifacts were fitted against a different schema: {detail}"
            )));
        }

        if !manifest.vocabulary.is_canonical() {
            return Err(CensusError::ArtifactMismatch(
                "persisted vocabulary is not sorted and de-duplicated".to_string(),
            ));
        }

        let pipeline = FeaturePipeline::new(schema.clone());
        pipeline.encoder().check_vocabulary(&manifest.vocabulary)?;

        let expected_columns = pipeline.column_names(&manifest.vocabulary);
        if expected_columns != manifest.column_order {
            let position = expected_columns
                .iter()
                .zip(&manifest.column_order)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| expected_columns.len().min(manifest.column_order.len()));
            return Err(CensusError::ArtifactMismatch(format!(
                "column order differs at position {position}: expected {:?}, found {:?}",
                expected_columns.get(position),
                manifest.column_order.get(position)
            )));
        }

        if manifest.labels.negative() != schema.negative_label()
            || manifest.labels.positive() != schema.positive_label()
        {
            return Err(CensusError::ArtifactMismatch(format!(
                "label mapping ({} -> 0, {} -> 1) does not match the schema",
                manifest.labels.negative(),
                manifest.labels.positive()
            )));
        }

        Ok(manifest)
    }

    /// Load artifacts fitted against `schema`.
    pub fn load(&self, schema: &Schema) -> Result<TrainedArtifacts> {
        let manifest = self.load_manifest(schema)?;

        let model_json = fs::read(self.model_path())?;
        let actual_hash = hash_bytes_hex(&model_json);
        if actual_hash != manifest.classifier_hash {
            return Err(CensusError::ArtifactMismatch(format!(
                "classifier hash {actual_hash} does not match manifest hash {}",
                manifest.classifier_hash
            )));
        }

        let classifier: GbdtClassifier = serde_json::from_slice(&model_json)?;
        let artifacts = TrainedArtifacts::new(
            manifest.schema,
            manifest.vocabulary,
            manifest.labels,
            classifier,
        )?;

        info!(
            path = %self.root.display(),
            columns = manifest.column_order.len(),
            trees = artifacts.classifier.num_trees(),
            "loaded artifacts"
        );

        Ok(artifacts)
    }
}
