//! Slice-based evaluation
//!
//! Computes precision, recall and F1 over the whole evaluation set and for
//! every (categorical attribute, value) pair observed in it. Slices are
//! produced by partitioning row indices per attribute and reducing each
//! partition to confusion counts.
//!
//! Output order is fixed: the aggregate slice first, then attributes in
//! schema order, values in the same byte-lexicographic order the encoder
//! uses. Slices with tiny support are reported like any other.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{CensusError, Result};
use crate::record::Record;
use crate::schema::Schema;

/// Binary confusion counts for one slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ConfusionCounts {
    /// Count outcomes over the given row indices. Callers check that every
    /// index is in range for both slices.
    pub(crate) fn over(ground_truth: &[u8], predictions: &[u8], rows: impl IntoIterator<Item = usize>) -> Self {
        let mut counts = Self::default();
        for row in rows {
            counts.record(ground_truth[row], predictions[row]);
        }
        counts
    }

    fn record(&mut self, truth: u8, predicted: u8) {
        match (truth, predicted) {
            (1, 1) => self.true_positives += 1,
            (0, 1) => self.false_positives += 1,
            (1, 0) => self.false_negatives += 1,
            _ => self.true_negatives += 1,
        }
    }

    pub fn support(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    /// 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        let denom = self.true_positives + self.false_positives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }

    /// 0 when there are no actual positives
    pub fn recall(&self) -> f64 {
        let denom = self.true_positives + self.false_negatives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

/// Metrics for one slice. `attribute` and `value` are `None` for the
/// aggregate slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceMetric {
    pub attribute: Option<String>,
    pub value: Option<String>,
    pub support: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl SliceMetric {
    fn from_counts(attribute: Option<&str>, value: Option<&str>, counts: &ConfusionCounts) -> Self {
        Self {
            attribute: attribute.map(str::to_string),
            value: value.map(str::to_string),
            support: counts.support(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1(),
        }
    }

    pub fn is_overall(&self) -> bool {
        self.attribute.is_none()
    }
}

/// Evaluates predictions per categorical slice
#[derive(Debug, Clone)]
pub struct SliceEvaluator {
    attributes: Vec<String>,
}

impl SliceEvaluator {
    /// Evaluator over the schema's categorical attributes
    pub fn new(schema: &Schema) -> Self {
        Self {
            attributes: schema.categorical().map(str::to_string).collect(),
        }
    }

    /// Extract position-aligned categorical columns from records.
    pub fn attribute_values(&self, records: &[Record]) -> Result<BTreeMap<String, Vec<String>>> {
        let mut columns = BTreeMap::new();
        for attribute in &self.attributes {
            let column = records
                .iter()
                .map(|record| record.categorical(attribute).map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            columns.insert(attribute.clone(), column);
        }
        Ok(columns)
    }

    /// Aggregate metric followed by one metric per observed
    /// (attribute, value) pair.
    pub fn evaluate(
        &self,
        ground_truth: &[u8],
        predictions: &[u8],
        attribute_values: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<SliceMetric>> {
        self.check_inputs(ground_truth, predictions, attribute_values)?;

        let rows = ground_truth.len();
        let mut metrics = Vec::new();
        metrics.push(SliceMetric::from_counts(
            None,
            None,
            &ConfusionCounts::over(ground_truth, predictions, 0..rows),
        ));

        for attribute in &self.attributes {
            let column = &attribute_values[attribute];

            let mut partitions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
            for (row, value) in column.iter().enumerate() {
                partitions.entry(value.as_str()).or_default().push(row);
            }

            for (value, indices) in partitions {
                let counts = ConfusionCounts::over(ground_truth, predictions, indices);
                metrics.push(SliceMetric::from_counts(Some(attribute.as_str()), Some(value), &counts));
            }
        }

        Ok(metrics)
    }

    fn check_inputs(
        &self,
        ground_truth: &[u8],
        predictions: &[u8],
        attribute_values: &BTreeMap<String, Vec<String>>,
    ) -> Result<()> {
        let rows = ground_truth.len();
        if predictions.len() != rows {
            return Err(CensusError::LengthMismatch {
                what: "predictions".to_string(),
                expected: rows,
                actual: predictions.len(),
            });
        }

        if let Some(bad) = ground_truth.iter().chain(predictions).find(|bit| **bit > 1) {
            return Err(CensusError::InvalidLabel(format!("bit {bad} is not 0 or 1")));
        }

        for attribute in &self.attributes {
            let column = attribute_values
                .get(attribute)
                .ok_or_else(|| CensusError::schema(attribute, "no values supplied for slicing"))?;
            if column.len() != rows {
                return Err(CensusError::LengthMismatch {
                    what: format!("values of '{attribute}'"),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }

        if let Some(extra) = attribute_values
            .keys()
            .find(|name| !self.attributes.contains(*name))
        {
            return Err(CensusError::schema(extra, "not a categorical attribute of the schema"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;

    fn round3(value: f64) -> f64 {
        (value * 1000.0).round() / 1000.0
    }

    fn schema_a() -> Schema {
        Schema::new(
            vec![Attribute::numeric("n"), Attribute::categorical("A")],
            "y",
            "0",
            "1",
        )
        .unwrap()
    }

    fn column(values: &[&str]) -> BTreeMap<String, Vec<String>> {
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), values.iter().map(|v| v.to_string()).collect());
        map
    }

    #[test]
    fn aggregate_metric_example() {
        let evaluator = SliceEvaluator::new(&schema_a());
        let metrics = evaluator
            .evaluate(&[1, 1, 0, 0], &[1, 0, 0, 0], &column(&["x", "x", "y", "y"]))
            .unwrap();

        let overall = &metrics[0];
        assert!(overall.is_overall());
        assert_eq!(overall.support, 4);
        assert_eq!(overall.precision, 1.0);
        assert_eq!(overall.recall, 0.5);
        assert_eq!(round3(overall.f1), 0.667);
    }

    #[test]
    fn one_slice_per_observed_value() {
        let evaluator = SliceEvaluator::new(&schema_a());
        let metrics = evaluator
            .evaluate(
                &[1, 0, 1, 0, 1],
                &[1, 1, 0, 0, 1],
                &column(&["y", "x", "x", "y", "x"]),
            )
            .unwrap();

        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[1].attribute.as_deref(), Some("A"));
        assert_eq!(metrics[1].value.as_deref(), Some("x"));
        assert_eq!(metrics[1].support, 3);
        assert_eq!(metrics[2].value.as_deref(), Some("y"));
        assert_eq!(metrics[2].support, 2);

        // slice x: rows 1, 2, 4 -> tp=1 (row 4), fp=1 (row 1), fn=1 (row 2)
        assert_eq!(metrics[1].precision, 0.5);
        assert_eq!(metrics[1].recall, 0.5);
        // slice y: rows 0, 3 -> tp=1, tn=1
        assert_eq!(metrics[2].precision, 1.0);
        assert_eq!(metrics[2].f1, 1.0);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let evaluator = SliceEvaluator::new(&schema_a());
        let metrics = evaluator
            .evaluate(&[0, 1], &[0, 0], &column(&["only", "only"]))
            .unwrap();
        let slice = &metrics[1];
        assert_eq!(slice.precision, 0.0);
        assert_eq!(slice.recall, 0.0);
        assert_eq!(slice.f1, 0.0);

        let negatives = ConfusionCounts::over(&[0, 0], &[0, 0], 0..2);
        assert_eq!(negatives.recall(), 0.0);
        assert_eq!(negatives.support(), 2);
    }

    #[test]
    fn singleton_slices_are_kept() {
        let evaluator = SliceEvaluator::new(&schema_a());
        let metrics = evaluator
            .evaluate(&[1, 0, 0], &[1, 0, 0], &column(&["a", "b", "c"]))
            .unwrap();
        assert_eq!(metrics.len(), 4);
        assert!(metrics[1..].iter().all(|m| m.support == 1));
    }

    #[test]
    fn values_follow_byte_order() {
        let evaluator = SliceEvaluator::new(&schema_a());
        let metrics = evaluator
            .evaluate(&[0; 4], &[0; 4], &column(&["b", "B", "a", "?"]))
            .unwrap();
        let values: Vec<_> = metrics[1..]
            .iter()
            .map(|m| m.value.clone().unwrap_or_default())
            .collect();
        assert_eq!(values, vec!["?", "B", "a", "b"]);
    }

    #[test]
    fn rejects_misaligned_inputs() {
        let evaluator = SliceEvaluator::new(&schema_a());
        assert!(matches!(
            evaluator.evaluate(&[1, 0], &[1], &column(&["x", "x"])),
            Err(CensusError::LengthMismatch { .. })
        ));
        assert!(matches!(
            evaluator.evaluate(&[1, 0], &[1, 0], &column(&["x"])),
            Err(CensusError::LengthMismatch { .. })
        ));
        // a longer column would index past the outcome slices
        assert!(matches!(
            evaluator.evaluate(&[1, 0], &[1, 0], &column(&["x", "y", "z"])),
            Err(CensusError::LengthMismatch { .. })
        ));
        assert!(matches!(
            evaluator.evaluate(&[2, 0], &[1, 0], &column(&["x", "y"])),
            Err(CensusError::InvalidLabel(_))
        ));
        assert!(matches!(
            evaluator.evaluate(&[1, 0], &[1, 0], &BTreeMap::new()),
            Err(CensusError::Schema { .. })
        ));

        let mut extra = column(&["x", "y"]);
        extra.insert("n".to_string(), vec!["1".to_string(), "2".to_string()]);
        assert!(matches!(
            evaluator.evaluate(&[1, 0], &[1, 0], &extra),
            Err(CensusError::Schema { .. })
        ));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let evaluator = SliceEvaluator::new(&schema_a());
        let values = column(&["x", "y", "x", "z", "y", "x"]);
        let truth = [1, 0, 1, 1, 0, 0];
        let predicted = [1, 1, 0, 1, 0, 0];

        let first = serde_json::to_string(&evaluator.evaluate(&truth, &predicted, &values).unwrap()).unwrap();
        let second = serde_json::to_string(&evaluator.evaluate(&truth, &predicted, &values).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
