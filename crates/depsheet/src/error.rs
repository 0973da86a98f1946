//! Error types for depsheet

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exploring dependencies
///
/// Only [`Error::InvalidConfig`] and address errors on the root cell reach the
/// caller of an exploration; everything else ends up as an error node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Options rejected before exploration starts
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cell reader does not know the workbook
    #[error("Workbook not found: {0}")]
    WorkbookNotFound(String),

    /// The workbook has no sheet with this name
    #[error("Sheet '{sheet}' not found in workbook {workbook}")]
    SheetNotFound { workbook: String, sheet: String },

    /// Any other failure reported by the cell reader
    #[error("Error reading cell: {0}")]
    CellRead(String),

    /// Error from the core crate
    #[error(transparent)]
    Core(#[from] depsheet_core::Error),

    /// Error from the formula crate
    #[error(transparent)]
    Formula(#[from] depsheet_formula::FormulaError),
}
