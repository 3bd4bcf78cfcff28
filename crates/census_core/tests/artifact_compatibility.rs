//! Artifact persistence across processes: round-trip behavior and schema
//! mismatch detection.

use anyhow::Result;
use census_core::{
    ArtifactStore, Attribute, CensusError, FeaturePipeline, GbdtClassifier, Node, Partition,
    Predictor, Record, Schema, TrainedArtifacts, Tree, SCALE,
};
use std::fs;
use tempfile::TempDir;

fn schema(order: &[(&str, bool)]) -> Schema {
    let attributes = order
        .iter()
        .map(|(name, numeric)| {
            if *numeric {
                Attribute::numeric(*name)
            } else {
                Attribute::categorical(*name)
            }
        })
        .collect();
    Schema::new(attributes, "income", "low", "high").expect("valid schema")
}

fn training_schema() -> Schema {
    schema(&[("age", true), ("job", false), ("city", false)])
}

fn row(age: i64, job: &str, city: &str) -> Record {
    Record::new().with("age", age).with("job", job).with("city", city)
}

fn train_and_save(dir: &TempDir) -> Result<TrainedArtifacts> {
    let schema = training_schema();
    let pipeline = FeaturePipeline::new(schema.clone());
    let split = Partition::new(
        vec![row(25, "clerk", "north"), row(52, "manager", "south"), row(38, "clerk", "south")],
        vec!["low".to_string(), "high".to_string(), "low".to_string()],
    )?;
    let (vocabulary, labels) = pipeline.fit(&split)?;

    // job=manager is column 2 (age, job=clerk, job=manager, city=north, city=south)
    let tree = Tree::new(
        vec![
            Node::internal(0, 2, SCALE / 2, 1, 2),
            Node::leaf(1, -2 * SCALE),
            Node::leaf(2, 2 * SCALE),
        ],
        SCALE,
    );
    let classifier = GbdtClassifier::new(vec![tree], 0, pipeline.width(&vocabulary));
    let artifacts = TrainedArtifacts::new(schema, vocabulary, labels, classifier)?;
    ArtifactStore::new(dir.path()).save(&artifacts)?;
    Ok(artifacts)
}

#[test]
fn reloaded_artifacts_score_identically() -> Result<()> {
    let dir = TempDir::new()?;
    let original = Predictor::new(train_and_save(&dir)?);
    let reloaded = Predictor::load(dir.path(), &training_schema())?;

    assert_eq!(
        original.artifacts().column_order(),
        reloaded.artifacts().column_order()
    );

    for record in [row(30, "manager", "north"), row(61, "clerk", "east"), row(19, "pilot", "south")] {
        assert_eq!(original.predict(&record)?, reloaded.predict(&record)?);
        assert_eq!(original.features(&record)?, reloaded.features(&record)?);
    }

    assert_eq!(reloaded.predict(&row(30, "manager", "north"))?.label, "high");
    assert_eq!(reloaded.predict(&row(30, "pilot", "north"))?.label, "low");
    Ok(())
}

#[test]
fn reordered_schema_is_rejected_before_classifier_is_read() -> Result<()> {
    let dir = TempDir::new()?;
    train_and_save(&dir)?;

    // remove the classifier file: the manifest check alone must fail
    fs::remove_file(ArtifactStore::new(dir.path()).model_path())?;

    let reordered = schema(&[("age", true), ("city", false), ("job", false)]);
    let err = Predictor::load(dir.path(), &reordered).unwrap_err();
    match err {
        CensusError::ArtifactMismatch(message) => {
            assert!(message.contains("attribute 1"), "{message}")
        }
        other => panic!("expected artifact mismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn changed_attribute_kind_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    train_and_save(&dir)?;

    let numeric_job = schema(&[("age", true), ("job", true), ("city", false)]);
    assert!(matches!(
        ArtifactStore::new(dir.path()).load(&numeric_job),
        Err(CensusError::ArtifactMismatch(_))
    ));
    Ok(())
}

#[test]
fn edited_column_order_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    train_and_save(&dir)?;
    let store = ArtifactStore::new(dir.path());

    let manifest = fs::read_to_string(store.encoder_path())?;
    let swapped = manifest.replace(
        "\"job=clerk\",\"job=manager\"",
        "\"job=manager\",\"job=clerk\"",
    );
    assert_ne!(manifest, swapped);
    fs::write(store.encoder_path(), swapped)?;

    let err = store.load(&training_schema()).unwrap_err();
    assert!(
        matches!(err, CensusError::ArtifactMismatch(ref m) if m.contains("position 1")),
        "{err}"
    );
    Ok(())
}

#[test]
fn reordered_vocabulary_is_rejected_at_load() -> Result<()> {
    let dir = TempDir::new()?;
    train_and_save(&dir)?;
    let store = ArtifactStore::new(dir.path());

    // swap the vocabulary entries and make column_order agree with them,
    // so the manifest is consistent with itself but not with the schema
    let mut manifest: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.encoder_path())?)?;
    let entries = manifest["vocabulary"]["entries"]
        .as_array_mut()
        .expect("vocabulary entries");
    entries.swap(0, 1);
    manifest["column_order"] = serde_json::json!([
        "age",
        "city=north",
        "city=south",
        "job=clerk",
        "job=manager"
    ]);
    fs::write(store.encoder_path(), serde_json::to_string(&manifest)?)?;

    let err = Predictor::load(dir.path(), &training_schema()).unwrap_err();
    assert!(
        matches!(err, CensusError::ArtifactMismatch(ref m) if m.contains("vocabulary attributes")),
        "{err}"
    );
    Ok(())
}
