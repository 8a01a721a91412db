//! # Application Errors

use gridmodel_core::GridError;
use thiserror::Error;

/// Errors surfaced by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// The store rejected an operation.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An input file could not be read or parsed.
    #[error("Input error: {0}")]
    Input(String),

    /// A delta was applied and reported as failed.
    #[error("Update rejected: {0}")]
    Rejected(String),
}
