use census_core::CensusError;
use thiserror::Error;

/// Errors returned by dataset loading, configuration and training.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: CensusError,
    },

    #[error("training error: {0}")]
    Training(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Census(#[from] CensusError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
