//! Error types for gamma level analysis

use thiserror::Error;

use super::CanonicalField;

#[derive(Error, Debug)]
pub enum GammaError {
    /// A required canonical column has no matching raw header
    #[error("Schema error: required column '{field}' not found")]
    Schema { field: CanonicalField },

    /// A stage received zero usable rows
    #[error("Empty series: {0}")]
    EmptySeries(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GammaResult<T> = Result<T, GammaError>;

impl GammaError {
    pub fn schema(field: CanonicalField) -> Self {
        Self::Schema { field }
    }

    pub fn empty_series(context: impl Into<String>) -> Self {
        Self::EmptySeries(context.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
