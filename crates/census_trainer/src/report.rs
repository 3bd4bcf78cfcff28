//! Slice report rendering
//!
//! One line per slice in evaluator order:
//!
//! ```text
//! all=all | support: 6513 | precision: 0.7841 | recall: 0.6203 | f1: 0.6926
//! workclass=Private | support: 4578 | precision: 0.7765 | recall: 0.5919 | f1: 0.6717
//! ```
//!
//! The minimum-support filter lives here and never drops the aggregate
//! line; the evaluator itself always reports every slice.

use census_core::SliceMetric;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::errors::Result;

/// Name used for both halves of the aggregate slice
pub const AGGREGATE: &str = "all";

pub fn format_slice_line(metric: &SliceMetric) -> String {
    format!(
        "{}={} | support: {} | precision: {:.4} | recall: {:.4} | f1: {:.4}",
        metric.attribute.as_deref().unwrap_or(AGGREGATE),
        metric.value.as_deref().unwrap_or(AGGREGATE),
        metric.support,
        metric.precision,
        metric.recall,
        metric.f1
    )
}

/// Slices that make it into the report, in input order
pub fn reported_slices(metrics: &[SliceMetric], min_support: usize) -> Vec<&SliceMetric> {
    metrics
        .iter()
        .filter(|metric| metric.is_overall() || metric.support >= min_support)
        .collect()
}

pub fn render_slice_report(metrics: &[SliceMetric], min_support: usize) -> String {
    let mut out = String::new();
    for metric in reported_slices(metrics, min_support) {
        // writing to a String cannot fail
        let _ = writeln!(out, "{}", format_slice_line(metric));
    }
    out
}

pub fn write_slice_report<P: AsRef<Path>>(path: P, metrics: &[SliceMetric], min_support: usize) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;
    std::fs::write(path, render_slice_report(metrics, min_support))?;
    info!(
        path = %path.display(),
        slices = reported_slices(metrics, min_support).len(),
        min_support,
        "wrote slice report"
    );
    Ok(())
}

/// Same filtered sequence as the text report, as a JSON array
pub fn write_slice_json<P: AsRef<Path>>(path: P, metrics: &[SliceMetric], min_support: usize) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;
    let json = serde_json::to_string_pretty(&reported_slices(metrics, min_support))?;
    std::fs::write(path, json)?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
