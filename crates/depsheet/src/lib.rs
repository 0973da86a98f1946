//! # depsheet
//!
//! Dependency trees for spreadsheet cells.
//!
//! Given a cell, depsheet finds every cell, range and external workbook that
//! feeds its value and returns them as a bounded tree:
//!
//! - references are extracted from formula text (other sheets, other
//!   workbooks, ranges, single cells)
//! - `INDIRECT` arguments are evaluated into literal references
//! - small ranges are expanded cell by cell, large ones summarized
//! - cycles and depth are bounded; failures become error leaves
//!
//! Workbook files are never opened here. Cells come from a [`CellReader`],
//! such as the in-memory [`MemoryReader`].
//!
//! ## Example
//!
//! ```rust
//! use depsheet::prelude::*;
//!
//! let mut reader = MemoryReader::new();
//! reader.set_formula(r"C:\data\Main.xlsx", "Sheet1", "A1", "=Sheet2!B1*2", "84").unwrap();
//! reader.set_formula(r"C:\data\Main.xlsx", "Sheet2", "B1", r"='C:\data\[Rates.xlsx]FX'!C3", "42").unwrap();
//! reader.set_value(r"C:\data\Rates.xlsx", "FX", "C3", "42").unwrap();
//!
//! let exploration = explore_cell_dependencies(
//!     &reader,
//!     r"C:\data\Main.xlsx",
//!     "Sheet1",
//!     "A1",
//!     ExploreOptions::default(),
//! )
//! .unwrap();
//!
//! let b1 = &exploration.tree.children[0];
//! assert_eq!(b1.address.display, "Sheet2!B1");
//! assert_eq!(b1.children[0].address.display, "[Rates.xlsx]FX!C3");
//! assert_eq!(exploration.summary.total_nodes, 3);
//! ```

pub mod error;
pub mod explorer;
pub mod node;
pub mod options;
pub mod prelude;
pub mod progress;
pub mod reader;
pub mod summary;

pub use error::{Error, Result};
pub use explorer::{DependencyExplorer, Exploration};
pub use node::{DependencyNode, NodeIter, NodeKind, NodeType};
pub use options::ExploreOptions;
pub use progress::{LogProgress, ProgressSink};
pub use reader::{CellContent, CellKind, CellReader, MemoryReader};
pub use summary::ExplorationSummary;

// Re-export the address and formula layers
pub use depsheet_core::{
    format_address, parse_address, CellAddress, CellKey, CellRange, CellRef, DisplayAddress,
    RangeRef, WorkbookPath,
};
pub use depsheet_formula::{
    FormulaReference, IndirectResolution, LinkTable, RangeSummary, ReferenceKind,
    ReferenceParser, ReferenceTarget,
};

/// Explore the dependencies of the cell at `address` (A1 notation)
///
/// Builds a [`DependencyExplorer`] for a single exploration. Fails only on
/// invalid options or an unparsable `address`.
pub fn explore_cell_dependencies<R, W>(
    reader: R,
    workbook: W,
    sheet: &str,
    address: &str,
    options: ExploreOptions,
) -> Result<Exploration>
where
    R: CellReader,
    W: Into<WorkbookPath>,
{
    DependencyExplorer::new(reader, options)?.explore_a1(workbook, sheet, address)
}
