use thiserror::Error;

/// Errors surfaced by the risk pipeline
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Training failed: {0}")]
    TrainingFailed(String),

    #[error("Model store corrupt at {path}: {reason}")]
    ModelStoreCorrupt { path: String, reason: String },

    #[error("Bundle schema mismatch: {0}")]
    BundleSchemaMismatch(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RiskError>;
