//! # depsheet-formula
//!
//! Formula text analysis for depsheet.
//!
//! This crate provides:
//! - Reference extraction (formula text → ordered, deduplicated references)
//! - Range policy (expand small ranges, summarize large ones)
//! - INDIRECT resolution (string-built references → literal references)
//! - Formula text cleanup and external link tables
//!
//! Nothing here evaluates formulas; the only expressions computed are the
//! string arguments of `INDIRECT`.
//!
//! ## Example
//!
//! ```rust
//! use depsheet_core::WorkbookPath;
//! use depsheet_formula::{RangePolicy, ReferenceParser, ReferenceTarget};
//!
//! let parser = ReferenceParser::new(RangePolicy::new(5));
//! let book = WorkbookPath::new(r"C:\data\Main.xlsx");
//! let refs = parser.parse("=SUM(A1:A3)+'[Other.xlsx]Rates'!B2", &book, "Sheet1");
//!
//! // Three expanded cells and one external cell
//! assert_eq!(refs.len(), 4);
//! match &refs[3].target {
//!     ReferenceTarget::Cell { cell, .. } => assert_eq!(cell.sheet, "Rates"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod error;
pub mod indirect;
pub mod links;
pub mod normalize;
pub mod range_policy;
pub mod references;

pub use error::{FormulaError, FormulaResult};
pub use indirect::{find_indirect, CellLookup, IndirectCall, IndirectResolution, IndirectResolver};
pub use links::LinkTable;
pub use normalize::{collapse_doubled_quotes, collapse_separators, normalize_formula};
pub use range_policy::{range_fingerprint, RangePolicy, RangeSummary, DEFAULT_EXPAND_THRESHOLD};
pub use references::{FormulaReference, ReferenceKind, ReferenceParser, ReferenceTarget};
