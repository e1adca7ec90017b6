use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by Chat Insights.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// The input path does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The file extension is not one of `.csv`, `.json`, `.jsonl`, `.ndjson`.
    #[error("Unsupported file format: {0} (supported: .csv, .json, .jsonl)")]
    UnsupportedFormat(String),

    /// Neither a `create_time` nor a `timestamp` column was found.
    #[error("No timestamp column found (expected `create_time` or `timestamp`)")]
    MissingTimestamp,

    /// Fewer than two numeric features are available for correlation.
    #[error("Insufficient numeric columns for correlation: {found} available, 2 required")]
    InsufficientColumns { found: usize },

    /// Any parse failure while reading an input file.
    #[error("Failed to load {path}: {message}")]
    LoadFailure { path: PathBuf, message: String },

    /// A directory input contained no supported data files.
    #[error("No supported data files found in {0}")]
    NoDataFiles(PathBuf),

    /// A step that needs the loaded table ran without one.
    #[error("No conversation data loaded")]
    NoData,

    /// A timestamp value did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An output artifact could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InsightsError {
    /// Build a [`InsightsError::LoadFailure`] from any displayable cause.
    pub fn load_failure(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::LoadFailure {
            path: path.into(),
            message: cause.to_string(),
        }
    }
}

/// Convenience alias used throughout the insights crates.
pub type Result<T> = std::result::Result<T, InsightsError>;
