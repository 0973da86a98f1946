//! # depsheet-core
//!
//! Core data structures for the depsheet dependency explorer.
//!
//! This crate provides the addressing types used throughout depsheet:
//! - [`CellAddress`] and [`CellRange`] - A1-style cell addressing and ranges
//! - [`WorkbookPath`] - Workbook file paths with separator-aware normalization
//! - [`CellRef`] and [`RangeRef`] - Workbook/sheet qualified references
//! - [`CellKey`] - The normalized identity of a cell, used for cycle detection
//! - [`DisplayAddress`] - Short and full renderings of a reference
//!
//! ## Example
//!
//! ```rust
//! use depsheet_core::{CellAddress, CellRef, WorkbookPath};
//!
//! let addr = CellAddress::parse("B2").unwrap();
//! assert_eq!(addr.row, 2);
//! assert_eq!(addr.col, 2);
//! assert_eq!(addr.to_string(), "B2");
//!
//! let root = WorkbookPath::new(r"C:\data\Main.xlsx");
//! let other = CellRef::new(WorkbookPath::new(r"C:\data\Other.xlsx"), "Sheet1", addr);
//! assert_eq!(other.display(&root).short, "[Other.xlsx]Sheet1!B2");
//! ```

pub mod address;
pub mod error;
pub mod reference;

// Re-exports for convenience
pub use address::{format_address, parse_address, CellAddress, CellRange, CellRangeIterator};
pub use error::{Error, Result};
pub use reference::{CellKey, CellRef, DisplayAddress, RangeRef, WorkbookPath};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum number of column letters in an A1 address (XFD)
pub const MAX_COL_LETTERS: usize = 3;

/// Maximum number of row digits in an A1 address
pub const MAX_ROW_DIGITS: usize = 7;
