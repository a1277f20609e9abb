//! Error types for the build-order simulation.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the simulation core.
///
/// Malformed build orders are never reported through this type: unknown
/// unit identifiers are skipped at assignment time. Errors here are raised
/// only at construction boundaries or by explicit validation helpers.
#[derive(Debug, Error)]
pub enum SimError {
    /// The unit catalog has no entries and cannot drive a simulation.
    #[error("Unit catalog is empty")]
    EmptyCatalog,

    /// A unit identifier is not present in the catalog.
    #[error("Unknown unit ID: {0}")]
    UnknownUnit(String),

    /// A strategy field was given a value outside its enumeration.
    #[error("Invalid value '{value}' for strategy field '{field}'")]
    InvalidStrategyValue {
        /// Field name.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// A goal definition is malformed.
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// Invalid simulation state (serialization failures, broken invariants).
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}
