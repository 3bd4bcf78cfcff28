//! Census income trainer
//!
//! Loads census CSV data, splits it deterministically, trains the
//! fixed-point GBDT classifier on the training partition only and reports
//! per-slice metrics on the held-out partition. Identical inputs and seed
//! produce byte-identical classifier artifacts.

pub mod cart;
pub mod config;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod report;
pub mod run;
pub mod trainer;

pub use config::TrainerConfig;
pub use dataset::Dataset;
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use report::{format_slice_line, render_slice_report, write_slice_json, write_slice_report};
pub use run::{
    evaluate_holdout, fit_artifacts, run_evaluation, run_training, EvaluationOptions,
    TrainingSummary,
};
pub use trainer::{GbdtConfig, GbdtTrainer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
