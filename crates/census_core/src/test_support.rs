//! Shared fixtures for unit tests

use crate::record::{Record, Value};
use crate::schema::{Attribute, Schema};

/// Well-formed census record (the API example payload).
pub(crate) fn census_record() -> Record {
    Record::new()
        .with("age", 37_i64)
        .with("workclass", "Private")
        .with("fnlgt", 178_356_i64)
        .with("education", "HS-grad")
        .with("education-num", 10_i64)
        .with("marital-status", "Married-civ-spouse")
        .with("occupation", "Prof-specialty")
        .with("relationship", "Husband")
        .with("race", "White")
        .with("sex", "Male")
        .with("capital-gain", 0_i64)
        .with("capital-loss", 0_i64)
        .with("hours-per-week", 40_i64)
        .with("native-country", "United-States")
}

/// `hours` (numeric), `color` (categorical), `size` (numeric), `shape` (categorical)
pub(crate) fn small_schema() -> Schema {
    Schema::new(
        vec![
            Attribute::numeric("hours"),
            Attribute::categorical("color"),
            Attribute::numeric("size"),
            Attribute::categorical("shape"),
        ],
        "label",
        "no",
        "yes",
    )
    .expect("valid test schema")
}

pub(crate) fn small_record(hours: f64, color: &str, size: f64, shape: &str) -> Record {
    Record::new()
        .with("hours", Value::Numeric(hours))
        .with("color", color)
        .with("size", Value::Numeric(size))
        .with("shape", shape)
}
