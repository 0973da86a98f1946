//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while extracting references or resolving INDIRECT
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// INDIRECT argument could not be turned into a reference
    #[error("INDIRECT resolution failed: {0}")]
    Indirect(String),

    /// Address-level error from the core crate
    #[error(transparent)]
    Core(#[from] depsheet_core::Error),
}
