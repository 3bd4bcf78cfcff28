//! Training and evaluation runs
//!
//! A training run fits the pipeline on the training partition only, trains
//! the classifier, scores the held-out partition per slice, persists the
//! artifacts and writes the slice report. An evaluation run reloads saved
//! artifacts and scores a fresh CSV with the persisted encoder.

use anyhow::{Context, Result};
use census_core::{
    ArtifactStore, FeaturePipeline, HoldoutSplit, Predictor, Schema, SliceEvaluator, SliceMetric,
    TrainSplit, TrainedArtifacts,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::TrainerConfig;
use crate::dataset::Dataset;
use crate::errors::TrainerError;
use crate::report::{write_slice_json, write_slice_report};
use crate::trainer::{GbdtConfig, GbdtTrainer};

/// Outcome of `run_training`
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Aggregate metrics on the held-out partition
    pub overall: SliceMetric,
    /// Number of slices the evaluator produced, aggregate included
    pub slices: usize,
    pub artifact_dir: PathBuf,
    pub report_path: PathBuf,
    pub classifier_hash: String,
}

/// Where an evaluation run reads from and writes to
#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    pub artifact_dir: PathBuf,
    pub data_path: PathBuf,
    pub report_path: PathBuf,
    pub min_report_support: usize,
    pub write_json_report: bool,
}

/// Fit the feature pipeline and train the classifier on `train`.
pub fn fit_artifacts(
    schema: &Schema,
    train: &TrainSplit,
    gbdt: &GbdtConfig,
) -> std::result::Result<TrainedArtifacts, TrainerError> {
    let pipeline = FeaturePipeline::new(schema.clone());
    let (vocabulary, labels) = pipeline.fit(train)?;

    let features = pipeline.transform_batch(train.records(), &vocabulary)?;
    let bits = labels.encode_all(train.labels())?;
    let classifier = GbdtTrainer::new(gbdt.clone()).train(&features, &bits)?;

    Ok(TrainedArtifacts::new(schema.clone(), vocabulary, labels, classifier)?)
}

/// Score `holdout` and compute per-slice metrics.
pub fn evaluate_holdout(
    predictor: &Predictor,
    holdout: &HoldoutSplit,
) -> std::result::Result<Vec<SliceMetric>, TrainerError> {
    let artifacts = predictor.artifacts();
    let features = predictor
        .pipeline()
        .transform_batch(holdout.records(), artifacts.vocabulary())?;
    let predictions = predictor.predict_bits(&features);
    let truth = artifacts.labels().encode_all(holdout.labels())?;

    let evaluator = SliceEvaluator::new(artifacts.schema());
    let values = evaluator.attribute_values(holdout.records())?;
    Ok(evaluator.evaluate(&truth, &predictions, &values)?)
}

pub fn run_training(config: &TrainerConfig, schema: &Schema) -> Result<TrainingSummary> {
    config.validate().context("invalid trainer configuration")?;

    let dataset = Dataset::from_csv(&config.data_path, schema)
        .with_context(|| format!("failed to load {}", config.data_path.display()))?;
    let (train, test) = dataset
        .stratified_split(config.test_fraction, config.seed)
        .context("failed to split dataset")?;

    let artifacts = fit_artifacts(schema, &train, &config.gbdt).context("training failed")?;
    let predictor = Predictor::new(artifacts);

    let metrics = evaluate_holdout(&predictor, &test).context("evaluation failed")?;
    let overall = metrics
        .first()
        .cloned()
        .context("evaluator returned no aggregate slice")?;

    let manifest = ArtifactStore::new(&config.artifact_dir)
        .save(predictor.artifacts())
        .with_context(|| format!("failed to save artifacts to {}", config.artifact_dir.display()))?;

    write_reports(
        &config.report_path,
        config.write_json_report.then(|| config.json_report_path()),
        &metrics,
        config.min_report_support,
    )?;

    info!(
        train_rows = train.len(),
        test_rows = test.len(),
        precision = overall.precision,
        recall = overall.recall,
        f1 = overall.f1,
        "training run complete"
    );

    Ok(TrainingSummary {
        train_rows: train.len(),
        test_rows: test.len(),
        overall,
        slices: metrics.len(),
        artifact_dir: config.artifact_dir.clone(),
        report_path: config.report_path.clone(),
        classifier_hash: manifest.classifier_hash,
    })
}

pub fn run_evaluation(options: &EvaluationOptions, schema: &Schema) -> Result<Vec<SliceMetric>> {
    let predictor = Predictor::load(&options.artifact_dir, schema)
        .with_context(|| format!("failed to load artifacts from {}", options.artifact_dir.display()))?;

    let holdout = Dataset::from_csv(&options.data_path, schema)
        .and_then(Dataset::into_holdout)
        .with_context(|| format!("failed to load {}", options.data_path.display()))?;

    let metrics = evaluate_holdout(&predictor, &holdout).context("evaluation failed")?;

    write_reports(
        &options.report_path,
        options
            .write_json_report
            .then(|| options.report_path.with_extension("json")),
        &metrics,
        options.min_report_support,
    )?;

    if let Some(overall) = metrics.first() {
        info!(
            rows = holdout.len(),
            precision = overall.precision,
            recall = overall.recall,
            f1 = overall.f1,
            "evaluation run complete"
        );
    }

    Ok(metrics)
}

fn write_reports(
    report_path: &Path,
    json_path: Option<PathBuf>,
    metrics: &[SliceMetric],
    min_support: usize,
) -> Result<()> {
    write_slice_report(report_path, metrics, min_support)
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    if let Some(json_path) = json_path {
        write_slice_json(&json_path, metrics, min_support)
            .with_context(|| format!("failed to write {}", json_path.display()))?;
    }
    Ok(())
}
