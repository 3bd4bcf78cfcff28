//! Census income classifier CLI
//!
//! Trains the classifier with a slice report, re-evaluates saved artifacts
//! on new data, and serves single predictions from JSON.

use anyhow::{Context, Result};
use census_core::{Predictor, Record, Schema};
use census_trainer::{run_evaluation, run_training, EvaluationOptions, TrainerConfig};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding a tracing filter, e.g. `census_trainer=debug`
const LOG_ENV: &str = "CENSUS_LOG";

#[derive(Parser, Debug)]
#[command(name = "census-ml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Census income classifier: training, slice evaluation and prediction", long_about = None)]
struct Cli {
    /// Verbose logging (ignored when CENSUS_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train on a CSV file, save artifacts and write the slice report
    Train(TrainArgs),

    /// Score a CSV file with saved artifacts and write the slice report
    Evaluate {
        /// Artifact directory written by `train`
        #[arg(long)]
        artifacts: PathBuf,

        /// CSV file to evaluate
        #[arg(long)]
        data: PathBuf,

        /// Slice report path
        #[arg(long, default_value = "slice_output.txt")]
        report: PathBuf,

        /// Leave slices below this support out of the report
        #[arg(long, default_value = "0")]
        min_support: usize,

        /// Also write the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict one record (JSON object) or many (JSON array)
    Predict {
        /// Artifact directory written by `train`
        #[arg(long)]
        artifacts: PathBuf,

        /// JSON input file; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

/// Flags override values from `--config`
#[derive(Args, Debug)]
struct TrainArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training CSV path
    #[arg(long)]
    data: Option<PathBuf>,

    /// Output directory for encoder and classifier artifacts
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Slice report path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Held-out fraction of each label group
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Seed for the stratified split
    #[arg(long)]
    seed: Option<i64>,

    /// Leave slices below this support out of the report
    #[arg(long)]
    min_support: Option<usize>,

    /// Also write the report as JSON
    #[arg(long)]
    json: bool,

    /// Number of boosting trees
    #[arg(long)]
    trees: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples per leaf
    #[arg(long)]
    min_samples_leaf: Option<usize>,

    /// Shrinkage per tree
    #[arg(long)]
    learning_rate: Option<f64>,
}

impl TrainArgs {
    fn into_config(self) -> Result<TrainerConfig> {
        let mut config = match &self.config {
            Some(path) => TrainerConfig::load_from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => TrainerConfig::default(),
        };

        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(artifacts) = self.artifacts {
            config.artifact_dir = artifacts;
        }
        if let Some(report) = self.report {
            config.report_path = report;
        }
        if let Some(fraction) = self.test_fraction {
            config.test_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(min_support) = self.min_support {
            config.min_report_support = min_support;
        }
        config.write_json_report |= self.json;
        if let Some(trees) = self.trees {
            config.gbdt.num_trees = trees;
        }
        if let Some(depth) = self.max_depth {
            config.gbdt.max_depth = depth;
        }
        if let Some(min_leaf) = self.min_samples_leaf {
            config.gbdt.min_samples_leaf = min_leaf;
        }
        if let Some(rate) = self.learning_rate {
            config.gbdt.learning_rate = rate;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let schema = Schema::census();

    match cli.command {
        Commands::Train(args) => train(args.into_config()?, &schema),
        Commands::Evaluate {
            artifacts,
            data,
            report,
            min_support,
            json,
        } => {
            let options = EvaluationOptions {
                artifact_dir: artifacts,
                data_path: data,
                report_path: report,
                min_report_support: min_support,
                write_json_report: json,
            };
            let metrics = run_evaluation(&options, &schema)?;
            info!("Wrote {} slices to {}", metrics.len(), options.report_path.display());
            Ok(())
        }
        Commands::Predict { artifacts, input } => predict(&artifacts, input, &schema),
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for prediction output
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn train(config: TrainerConfig, schema: &Schema) -> Result<()> {
    info!("Census income trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");
    info!("Data: {}", config.data_path.display());
    info!(
        "Split: test fraction {} (seed {})",
        config.test_fraction, config.seed
    );
    info!(
        "GBDT: {} trees, depth {}, min leaf {}, learning rate {}",
        config.gbdt.num_trees,
        config.gbdt.max_depth,
        config.gbdt.min_samples_leaf,
        config.gbdt.learning_rate
    );

    let summary = run_training(&config, schema)?;

    info!("═══════════════════════════════════════════");
    info!("✓ Training completed successfully");
    info!("  Train rows: {}, test rows: {}", summary.train_rows, summary.test_rows);
    info!(
        "  Test precision {:.4}, recall {:.4}, f1 {:.4}",
        summary.overall.precision, summary.overall.recall, summary.overall.f1
    );
    info!("  Artifacts: {}", summary.artifact_dir.display());
    info!("  Classifier hash: {}", summary.classifier_hash);
    info!("  Slice report: {} ({} slices)", summary.report_path.display(), summary.slices);

    Ok(())
}

fn predict(artifacts: &Path, input: Option<PathBuf>, schema: &Schema) -> Result<()> {
    let predictor = Predictor::load(artifacts, schema)
        .with_context(|| format!("failed to load artifacts from {}", artifacts.display()))?;

    let raw = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };

    let json: serde_json::Value = serde_json::from_str(&raw).context("input is not valid JSON")?;
    let output = if json.is_array() {
        let records: Vec<Record> = serde_json::from_value(json).context("invalid record array")?;
        serde_json::to_string_pretty(&predictor.predict_batch(&records)?)?
    } else {
        let record: Record = serde_json::from_value(json).context("invalid record")?;
        serde_json::to_string_pretty(&predictor.predict(&record)?)?
    };

    println!("{output}");
    Ok(())
}
