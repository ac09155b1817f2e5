//! Error types for the sellin_forecast crate

use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for the sellin_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// An input file is missing, unreadable or lacks a required column
    #[error("Data load error for '{}': {reason}", path.display())]
    DataLoadError { path: PathBuf, reason: String },

    /// A period value cannot be read as a calendar month
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The ensemble cannot process the panel as a whole
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// A per-model output file cannot be written
    #[error("Persist error for '{}': {reason}", path.display())]
    PersistError { path: PathBuf, reason: String },

    /// A series is too short for the model
    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Numerical failure while fitting a model
    #[error("Computation error: {0}")]
    ComputationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    MathError(#[from] forecast_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Build a [`ForecastError::DataLoadError`] for `path`
    pub fn data_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ForecastError::DataLoadError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`ForecastError::PersistError`] for `path`
    pub fn persist(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ForecastError::PersistError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
