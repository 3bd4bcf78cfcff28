//! Trainer configuration
//!
//! Every field has a default, so a TOML file only needs the keys it
//! changes. Command-line flags are applied on top of the loaded file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::{Result, TrainerError};
use crate::trainer::GbdtConfig;

/// Settings for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Header-bearing CSV with every schema attribute and the label column
    pub data_path: PathBuf,
    /// Directory receiving `encoder.json` and `model.json`
    pub artifact_dir: PathBuf,
    /// Slice report destination
    pub report_path: PathBuf,
    /// Also write the slice metrics as JSON next to the text report
    pub write_json_report: bool,
    pub test_fraction: f64,
    pub seed: i64,
    /// Slices below this support are left out of the report
    pub min_report_support: usize,
    pub gbdt: GbdtConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/census.csv"),
            artifact_dir: PathBuf::from("model"),
            report_path: PathBuf::from("slice_output.txt"),
            write_json_report: false,
            test_fraction: 0.2,
            seed: 42,
            min_report_support: 0,
            gbdt: GbdtConfig::default(),
        }
    }
}

impl TrainerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrainerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "loaded trainer configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainerError::Config(format!(
                "test_fraction must lie in (0, 1), got {}",
                self.test_fraction
            )));
        }
        self.gbdt.validate()
    }

    /// JSON report path: the text report path with a `.json` extension
    pub fn json_report_path(&self) -> PathBuf {
        self.report_path.with_extension("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_validate() {
        let config = TrainerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.json_report_path(), PathBuf::from("slice_output.json"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TrainerConfig::from_toml_str(
            r#"
            seed = 7
            test_fraction = 0.3

            [gbdt]
            num_trees = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.gbdt.num_trees, 12);
        assert_eq!(config.gbdt.max_depth, GbdtConfig::default().max_depth);
        assert_eq!(config.artifact_dir, PathBuf::from("model"));
    }

    #[test]
    fn test_unparseable_toml() {
        assert!(matches!(
            TrainerConfig::from_toml_str("seed = \"seven\""),
            Err(TrainerError::Toml(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for fraction in [0.0, 1.0, 1.5] {
            let config = TrainerConfig {
                test_fraction: fraction,
                ..TrainerConfig::default()
            };
            assert!(config.validate().is_err());
        }

        let mut config = TrainerConfig::default();
        config.gbdt.num_trees = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trainer.toml");

        let mut config = TrainerConfig::default();
        config.seed = 1234;
        config.min_report_support = 30;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(TrainerConfig::load_from_file(&path).unwrap(), config);
    }
}
