//! CSV dataset loading and deterministic stratified splitting
//!
//! The header must name every schema attribute plus the label column;
//! other columns are ignored. Cells are trimmed, since the public census
//! file carries a space after every comma.

use census_core::{AttributeKind, CensusError, HoldoutSplit, Partition, Record, Schema, TrainSplit, Value};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Marker the census files use for an unknown value
pub const MISSING_MARKER: &str = "?";

/// Rows read from a CSV file, position-aligned with their label strings
#[derive(Clone, Debug)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub labels: Vec<String>,
}

impl Dataset {
    /// Load a dataset from a header-bearing CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            TrainerError::Dataset(format!("failed to open {}: {e}", path.display()))
        })?;
        let dataset = Self::from_reader(file, schema)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R, schema: &Schema) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column_of = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                TrainerError::Census(CensusError::Schema {
                    attribute: name.to_string(),
                    reason: "column missing from dataset header".to_string(),
                })
            })
        };

        let columns = schema
            .attributes()
            .iter()
            .map(|attribute| Ok((attribute, column_of(&attribute.name)?)))
            .collect::<Result<Vec<_>>>()?;
        let label_column = column_of(schema.label_column())?;

        let mut records = Vec::new();
        let mut labels = Vec::new();

        for row in reader.records() {
            let row = row?;
            if row.iter().all(str::is_empty) {
                continue;
            }
            let line = row.position().map(|p| p.line()).unwrap_or_default();

            let mut record = Record::new();
            for (attribute, column) in &columns {
                let cell = row.get(*column).unwrap_or_default();
                let value = match attribute.kind {
                    AttributeKind::Numeric => Value::Numeric(parse_numeric(cell, &attribute.name, line)?),
                    AttributeKind::Categorical => Value::Categorical(cell.to_string()),
                };
                record.insert(attribute.name.clone(), value);
            }

            let label = row.get(label_column).unwrap_or_default();
            if label.is_empty() {
                return Err(TrainerError::Row {
                    line,
                    source: CensusError::InvalidLabel("empty label cell".to_string()),
                });
            }

            records.push(record);
            labels.push(label.to_string());
        }

        if records.is_empty() {
            return Err(TrainerError::Dataset("dataset has no rows".to_string()));
        }

        Ok(Self { records, labels })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row count per label string
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Split into training and held-out partitions, preserving the label
    /// ratio.
    ///
    /// Rows are grouped by label in sorted label order, each group is
    /// shuffled with an LCG seeded once from `seed`, and
    /// `round(group_len * test_fraction)` rows per group are held out.
    /// Both partitions keep the original row order.
    pub fn stratified_split(&self, test_fraction: f64, seed: i64) -> Result<(TrainSplit, HoldoutSplit)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TrainerError::Config(format!(
                "test fraction must lie in (0, 1), got {test_fraction}"
            )));
        }

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, label) in self.labels.iter().enumerate() {
            groups.entry(label.as_str()).or_default().push(row);
        }

        let mut rng = LcgRng::new(seed);
        let mut held_out = vec![false; self.len()];
        for (label, rows) in groups.iter_mut() {
            rng.shuffle(rows);
            let take = ((rows.len() as f64 * test_fraction).round() as usize).min(rows.len());
            for &row in &rows[..take] {
                held_out[row] = true;
            }
            debug!(label = *label, rows = rows.len(), held_out = take, "stratified group");
        }

        let (mut train_records, mut train_labels) = (Vec::new(), Vec::new());
        let (mut test_records, mut test_labels) = (Vec::new(), Vec::new());
        for (row, is_test) in held_out.into_iter().enumerate() {
            let record = self.records[row].clone();
            let label = self.labels[row].clone();
            if is_test {
                test_records.push(record);
                test_labels.push(label);
            } else {
                train_records.push(record);
                train_labels.push(label);
            }
        }

        let train = Partition::new(train_records, train_labels)?;
        let test = Partition::new(test_records, test_labels)?;
        info!(train = train.len(), test = test.len(), seed, "split dataset");
        Ok((train, test))
    }

    /// Use every row as evaluation data
    pub fn into_holdout(self) -> Result<HoldoutSplit> {
        Ok(Partition::new(self.records, self.labels)?)
    }
}

fn parse_numeric(cell: &str, attribute: &str, line: u64) -> Result<f64> {
    if cell.is_empty() || cell == MISSING_MARKER {
        return Err(TrainerError::Row {
            line,
            source: CensusError::MissingAttribute {
                attribute: attribute.to_string(),
            },
        });
    }
    let value = cell.parse::<f64>().map_err(|_| {
        TrainerError::Dataset(format!(
            "line {line}, column '{attribute}': invalid number '{cell}'"
        ))
    })?;
    if !value.is_finite() {
        return Err(TrainerError::Row {
            line,
            source: CensusError::Schema {
                attribute: attribute.to_string(),
                reason: format!("non-finite value '{cell}'"),
            },
        });
    }
    Ok(value)
}
