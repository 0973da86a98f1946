//! Prelude module - common imports for depsheet users
//!
//! ```rust
//! use depsheet::prelude::*;
//! ```

pub use crate::{
    // Entry points
    explore_cell_dependencies,
    // Addressing
    CellAddress,
    // Reader contract
    CellContent,
    CellKind,
    CellReader,
    CellRef,
    DependencyExplorer,
    // Tree types
    DependencyNode,
    // Error types
    Error,
    Exploration,
    ExplorationSummary,
    // Options
    ExploreOptions,
    MemoryReader,
    NodeKind,
    NodeType,
    ProgressSink,
    Result,
    WorkbookPath,
};
