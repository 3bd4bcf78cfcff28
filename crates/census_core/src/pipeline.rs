//! Feature pipeline: numeric pass-through plus one-hot categorical block
//!
//! Column order is all numeric attributes in schema order, then every
//! categorical attribute in schema order expanded into its sorted indicator
//! columns. The order is part of the persisted artifact contract.
//!
//! Fitting only accepts a [`Partition<Train>`], so evaluation and serving
//! data cannot be passed to `fit` without naming them as training data.

use std::marker::PhantomData;

use crate::encoder::{CategoricalEncoder, CategoricalVocabulary};
use crate::errors::{CensusError, Result};
use crate::label::LabelBinarizer;
use crate::record::Record;
use crate::schema::Schema;

/// Ordered numeric feature columns
pub type FeatureVector = Vec<f64>;

/// Marker for the training split
#[derive(Debug, Clone, Copy)]
pub enum Train {}

/// Marker for held-out (test / evaluation) data
#[derive(Debug, Clone, Copy)]
pub enum Holdout {}

/// Position-aligned records and label strings tagged with their role
#[derive(Debug, Clone)]
pub struct Partition<Role> {
    records: Vec<Record>,
    labels: Vec<String>,
    _role: PhantomData<Role>,
}

pub type TrainSplit = Partition<Train>;
pub type HoldoutSplit = Partition<Holdout>;

impl<Role> Partition<Role> {
    pub fn new(records: Vec<Record>, labels: Vec<String>) -> Result<Self> {
        if records.len() != labels.len() {
            return Err(CensusError::LengthMismatch {
                what: "labels".to_string(),
                expected: records.len(),
                actual: labels.len(),
            });
        }
        Ok(Self {
            records,
            labels,
            _role: PhantomData,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Composes numeric pass-through with the categorical encoder
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    schema: Schema,
    encoder: CategoricalEncoder,
}

impl FeaturePipeline {
    pub fn new(schema: Schema) -> Self {
        let encoder = CategoricalEncoder::new(&schema);
        Self { schema, encoder }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    /// Fit the vocabulary and the label mapping on the training split.
    ///
    /// Every training record is validated against the schema, and the
    /// training labels must be exactly the schema's two labels.
    pub fn fit(&self, train: &TrainSplit) -> Result<(CategoricalVocabulary, LabelBinarizer)> {
        for record in train.records() {
            record.validate(&self.schema)?;
        }

        let labels = LabelBinarizer::fit_with_positive(train.labels(), self.schema.positive_label())?;
        if labels.negative() != self.schema.negative_label() {
            return Err(CensusError::LabelCardinality {
                found: vec![labels.negative().to_string(), labels.positive().to_string()],
            });
        }

        let vocabulary = self.encoder.fit(train.records())?;

        tracing::debug!(
            rows = train.len(),
            categorical_columns = vocabulary.width(),
            "fitted feature pipeline"
        );

        Ok((vocabulary, labels))
    }

    /// Number of columns produced by `transform`
    pub fn width(&self, vocabulary: &CategoricalVocabulary) -> usize {
        self.schema.numeric().count() + vocabulary.width()
    }

    /// Column names in feature-vector order
    pub fn column_names(&self, vocabulary: &CategoricalVocabulary) -> Vec<String> {
        self.schema
            .numeric()
            .map(str::to_string)
            .chain(vocabulary.column_names())
            .collect()
    }

    /// Validate `record` and produce its feature vector.
    pub fn transform(&self, record: &Record, vocabulary: &CategoricalVocabulary) -> Result<FeatureVector> {
        record.validate(&self.schema)?;

        let mut features = Vec::with_capacity(self.width(vocabulary));
        for name in self.schema.numeric() {
            features.push(record.numeric(name)?);
        }
        self.encoder.transform_into(record, vocabulary, &mut features)?;

        Ok(features)
    }

    /// Transform each record; output order matches input order.
    pub fn transform_batch(
        &self,
        records: &[Record],
        vocabulary: &CategoricalVocabulary,
    ) -> Result<Vec<FeatureVector>> {
        records
            .iter()
            .map(|record| self.transform(record, vocabulary))
            .collect()
    }
}
