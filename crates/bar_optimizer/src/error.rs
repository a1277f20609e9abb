//! Optimizer error types.

use thiserror::Error;

use bar_core::error::SimError;

/// Errors that stop an optimization before it starts.
///
/// A failed evaluation of a single individual is not an error; it is
/// scored as the objective's worst value.
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// The objective name is not recognized.
    #[error("Unknown objective '{0}'")]
    UnknownObjective(String),

    /// GA parameters cannot run.
    #[error("Invalid GA parameters: {0}")]
    InvalidParams(String),

    /// Parameter file not found.
    #[error("Parameter file not found: {0}")]
    FileNotFound(String),

    /// Failed to read a parameter file.
    #[error("Failed to read parameter file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse a parameter file.
    #[error("Failed to parse GA parameters: {0}")]
    ParseError(#[from] ron::error::SpannedError),

    /// The simulation core refused to run.
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Result type for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;
