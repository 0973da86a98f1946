//! Dependency tree construction
//!
//! The explorer walks a cell's references depth-first. For every cell it:
//!
//! 1. stops with a limit node once `max_depth` is reached;
//! 2. stops with a circular-reference node if the cell is already on the
//!    current path;
//! 3. reads the cell through the [`CellReader`];
//! 4. for formula cells, resolves `INDIRECT`, extracts references, and
//!    recurses into each one at `depth + 1`.
//!
//! Cycle detection is per path: a cell is removed from the visited set when
//! its subtree is finished, so the same cell is fully explored again when it
//! shows up in a sibling branch.
//!
//! # Example
//!
//! ```rust
//! use depsheet::{DependencyExplorer, ExploreOptions, MemoryReader, NodeType};
//!
//! let mut reader = MemoryReader::new();
//! reader.set_formula("Book.xlsx", "Sheet1", "A1", "=B1+C1", "3").unwrap();
//! reader.set_value("Book.xlsx", "Sheet1", "B1", "1").unwrap();
//! reader.set_value("Book.xlsx", "Sheet1", "C1", "2").unwrap();
//!
//! let explorer = DependencyExplorer::new(&reader, ExploreOptions::default()).unwrap();
//! let exploration = explorer.explore_a1("Book.xlsx", "Sheet1", "A1").unwrap();
//!
//! assert_eq!(exploration.tree.children.len(), 2);
//! assert_eq!(exploration.summary.count(NodeType::Value), 2);
//! ```

use crate::node::{DependencyNode, NodeKind};
use crate::options::ExploreOptions;
use crate::progress::ProgressSink;
use crate::reader::CellReader;
use crate::summary::ExplorationSummary;
use crate::Result;
use ahash::AHashSet;
use depsheet_core::{CellAddress, CellKey, CellRef, DisplayAddress, WorkbookPath};
use depsheet_formula::{
    normalize_formula, IndirectResolver, RangePolicy, RangeSummary, ReferenceParser,
    ReferenceTarget,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mutable state of one exploration
///
/// Created fresh for every call to [`DependencyExplorer::explore`].
#[derive(Debug, Default)]
struct ExplorationState {
    /// Cells on the current recursion path
    visited: AHashSet<CellKey>,
    /// Cells met again while already on the path, in discovery order
    circular_refs: Vec<CellKey>,
    /// Cells read so far
    processed: usize,
}

impl ExplorationState {
    /// Push `key` onto the path; false if it is already there
    fn enter(&mut self, key: &CellKey) -> bool {
        self.visited.insert(key.clone())
    }

    fn leave(&mut self, key: &CellKey) {
        self.visited.remove(key);
    }
}

/// Result of one exploration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Exploration {
    pub tree: DependencyNode,
    pub summary: ExplorationSummary,
}

/// Builds dependency trees from a [`CellReader`]
pub struct DependencyExplorer<'a, R> {
    reader: R,
    options: ExploreOptions,
    parser: ReferenceParser,
    progress: Option<Box<dyn ProgressSink + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, R: CellReader> DependencyExplorer<'a, R> {
    /// Create an explorer, rejecting invalid options
    pub fn new(reader: R, options: ExploreOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            reader,
            options,
            parser: ReferenceParser::new(RangePolicy::new(options.range_expand_threshold)),
            progress: None,
            cancel: None,
        })
    }

    /// Attach a progress sink
    pub fn with_progress<P: ProgressSink + 'a>(mut self, sink: P) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Attach a cancellation flag, polled once per child reference
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &ExploreOptions {
        &self.options
    }

    /// Explore the dependencies of `workbook`/`sheet`/`cell`
    pub fn explore(&self, workbook: &WorkbookPath, sheet: &str, cell: CellAddress) -> Exploration {
        let root = CellRef::new(workbook.clone(), sheet, cell);
        let mut state = ExplorationState::default();

        let shown = DisplayAddress::qualified(workbook, sheet, &cell.to_a1_string(), workbook, true);
        self.report(&format!(
            "Starting dependency exploration of {} (max depth {})",
            shown.display, self.options.max_depth
        ));

        let tree = self.explore_cell(&mut state, workbook, root, 0, None);
        let summary = ExplorationSummary::from_tree(&tree, &state.circular_refs);

        self.report(&format!(
            "Exploration complete: {} cells processed, {} nodes, max depth {}",
            state.processed, summary.total_nodes, summary.max_depth_reached
        ));
        if summary.circular_references > 0 {
            log::warn!(
                "{} circular reference(s) found exploring {}",
                summary.circular_references,
                shown.display
            );
        }

        Exploration { tree, summary }
    }

    /// Explore a cell given in A1 notation
    pub fn explore_a1<W: Into<WorkbookPath>>(
        &self,
        workbook: W,
        sheet: &str,
        address: &str,
    ) -> Result<Exploration> {
        let cell = CellAddress::parse(address)?;
        Ok(self.explore(&workbook.into(), sheet, cell))
    }

    fn explore_cell(
        &self,
        state: &mut ExplorationState,
        root: &WorkbookPath,
        target: CellRef,
        depth: u32,
        origin_range: Option<String>,
    ) -> DependencyNode {
        let location = target.cell.to_a1_string();
        let address =
            DisplayAddress::qualified(&target.workbook, &target.sheet, &location, root, depth == 0);
        let mut node = DependencyNode {
            address,
            workbook: target.workbook.clone(),
            sheet: target.sheet.clone(),
            location,
            depth,
            origin_range,
            kind: NodeKind::LimitReached,
            children: Vec::new(),
        };

        if depth >= self.options.max_depth {
            log::warn!("Depth limit {} reached at {}", self.options.max_depth, node.address);
            self.report(&format!(
                "Depth limit {} reached at {}",
                self.options.max_depth, node.address
            ));
            return node;
        }

        let key = target.key();
        if !state.enter(&key) {
            log::warn!("Circular reference detected at {}", node.address);
            self.report(&format!("Circular reference detected at {}", node.address));
            state.circular_refs.push(key);
            node.kind = NodeKind::CircularRef;
            return node;
        }

        state.processed += 1;
        log::debug!("Exploring {} at depth {depth}", node.address);
        self.report(&format!(
            "Exploring {} at depth {}/{} ({} cells processed)",
            node.address, depth, self.options.max_depth, state.processed
        ));

        let content = match self
            .reader
            .read_cell(&target.workbook, &target.sheet, &target.cell)
        {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Error reading {}: {e}", node.address);
                self.report(&format!("Error reading {}: {e}", node.address));
                state.leave(&key);
                node.kind = NodeKind::Error {
                    message: e.to_string(),
                };
                return node;
            }
        };

        let formula = match content.formula.as_deref() {
            Some(formula) if content.is_formula() => normalize_formula(formula),
            _ => {
                node.kind = NodeKind::Value {
                    value: content.display_value,
                    calculated_value: content.calculated_value,
                };
                state.leave(&key);
                return node;
            }
        };

        let links = self.reader.external_links(&target.workbook);
        let lookup = |cell: &CellAddress| {
            self.reader
                .read_cell(&target.workbook, &target.sheet, cell)
                .ok()
                .map(|content| content.display_value)
        };
        let resolution = IndirectResolver::new(lookup, &links, target.cell).resolve(&formula);
        if resolution.has_indirect {
            match (&resolution.resolved_formula, &resolution.error) {
                (Some(resolved), _) => {
                    self.report(&format!("Resolved INDIRECT in {}: {resolved}", node.address))
                }
                (None, error) => self.report(&format!(
                    "Could not resolve INDIRECT in {}: {}",
                    node.address,
                    error.as_deref().unwrap_or("unknown error")
                )),
            }
        }

        let references = self.parser.parse(
            resolution.formula_for_parsing(),
            &target.workbook,
            &target.sheet,
        );
        if references.is_empty() {
            self.report(&format!("No resolvable references in {}", node.address));
        } else {
            log::debug!("{} references found in {}", references.len(), node.address);
            self.report(&format!(
                "Found {} references in {}",
                references.len(),
                node.address
            ));
        }

        for reference in references {
            let child = if self.is_cancelled() {
                self.cancelled_node(root, reference.target, depth + 1)
            } else {
                match reference.target {
                    ReferenceTarget::Cell { cell, origin_range } => {
                        self.explore_cell(state, root, cell, depth + 1, origin_range)
                    }
                    ReferenceTarget::RangeSummary(summary) => {
                        range_node(root, summary, depth + 1)
                    }
                }
            };
            node.children.push(child);
        }

        node.kind = NodeKind::Formula {
            formula,
            resolved_formula: resolution.resolved_formula,
            value: content.display_value,
            calculated_value: content.calculated_value,
        };
        state.leave(&key);
        node
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    fn cancelled_node(
        &self,
        root: &WorkbookPath,
        target: ReferenceTarget,
        depth: u32,
    ) -> DependencyNode {
        let mut node = match target {
            ReferenceTarget::Cell { cell, origin_range } => {
                let location = cell.cell.to_a1_string();
                DependencyNode {
                    address: cell.display(root),
                    workbook: cell.workbook,
                    sheet: cell.sheet,
                    location,
                    depth,
                    origin_range,
                    kind: NodeKind::Cancelled,
                    children: Vec::new(),
                }
            }
            ReferenceTarget::RangeSummary(summary) => range_node(root, summary, depth),
        };
        log::debug!("Exploration cancelled before {}", node.address);
        node.kind = NodeKind::Cancelled;
        node
    }

    fn report(&self, message: &str) {
        if let Some(sink) = &self.progress {
            sink.report(message);
        }
    }
}

/// Leaf node standing in for a summarized range
fn range_node(root: &WorkbookPath, summary: RangeSummary, depth: u32) -> DependencyNode {
    let address = DisplayAddress::qualified(
        &summary.workbook,
        &summary.sheet,
        &summary.range_text,
        root,
        false,
    );
    DependencyNode {
        address,
        workbook: summary.workbook.clone(),
        sheet: summary.sheet.clone(),
        location: summary.range_text.clone(),
        depth,
        origin_range: None,
        kind: NodeKind::RangeSummary(summary),
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;
    use crate::reader::MemoryReader;
    use std::cell::RefCell;

    const BOOK: &str = "Book.xlsx";

    #[test]
    fn test_root_uses_external_form() {
        let mut reader = MemoryReader::new();
        reader.set_value(r"C:\data\Main.xlsx", "Sheet1", "A1", "1").unwrap();
        let explorer = DependencyExplorer::new(&reader, ExploreOptions::default()).unwrap();
        let exploration = explorer
            .explore_a1(r"C:\data\Main.xlsx", "Sheet1", "A1")
            .unwrap();

        assert_eq!(exploration.tree.address.display, "[Main.xlsx]Sheet1!A1");
        assert_eq!(exploration.tree.address.full, r"'C:\data\[Main.xlsx]Sheet1'!A1");
        assert_eq!(exploration.tree.node_type(), NodeType::Value);
    }

    #[test]
    fn test_visited_set_is_per_path() {
        // A1 uses B1 twice through different cells; B1 must be explored in both branches
        let mut reader = MemoryReader::new();
        reader.set_formula(BOOK, "Sheet1", "A1", "=C1+D1", "4").unwrap();
        reader.set_formula(BOOK, "Sheet1", "C1", "=B1", "2").unwrap();
        reader.set_formula(BOOK, "Sheet1", "D1", "=B1", "2").unwrap();
        reader.set_value(BOOK, "Sheet1", "B1", "2").unwrap();

        let explorer = DependencyExplorer::new(&reader, ExploreOptions::default()).unwrap();
        let exploration = explorer.explore_a1(BOOK, "Sheet1", "A1").unwrap();

        assert_eq!(exploration.summary.total_nodes, 5);
        assert_eq!(exploration.summary.circular_references, 0);
        for branch in &exploration.tree.children {
            assert_eq!(branch.children[0].node_type(), NodeType::Value);
        }
    }

    #[test]
    fn test_read_error_becomes_leaf_and_siblings_continue() {
        let mut reader = MemoryReader::new();
        reader
            .set_formula(BOOK, "Sheet1", "A1", "=Missing!A1+B1", "0")
            .unwrap();
        reader.set_value(BOOK, "Sheet1", "B1", "5").unwrap();

        let explorer = DependencyExplorer::new(&reader, ExploreOptions::default()).unwrap();
        let tree = explorer.explore_a1(BOOK, "Sheet1", "A1").unwrap().tree;

        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].node_type(), NodeType::Error);
        assert!(tree.children[0].error().unwrap().contains("Missing"));
        assert_eq!(tree.children[1].node_type(), NodeType::Value);
    }

    #[test]
    fn test_cancellation_marks_remaining_children() {
        let mut reader = MemoryReader::new();
        reader
            .set_formula(BOOK, "Sheet1", "A1", "=B1+SUM(C1:C9)", "0")
            .unwrap();
        reader.set_value(BOOK, "Sheet1", "B1", "5").unwrap();

        let flag = Arc::new(AtomicBool::new(true));
        let explorer = DependencyExplorer::new(&reader, ExploreOptions::default())
            .unwrap()
            .with_cancel_flag(flag);
        let exploration = explorer.explore_a1(BOOK, "Sheet1", "A1").unwrap();

        let types: Vec<NodeType> = exploration
            .tree
            .children
            .iter()
            .map(|c| c.node_type())
            .collect();
        assert_eq!(types, vec![NodeType::Cancelled, NodeType::Cancelled]);
        assert_eq!(exploration.tree.children[1].location, "C1:C9");
    }

    #[test]
    fn test_progress_does_not_change_result() {
        let mut reader = MemoryReader::new();
        reader.set_formula(BOOK, "Sheet1", "A1", "=A2", "1").unwrap();
        reader.set_formula(BOOK, "Sheet1", "A2", "=A1", "1").unwrap();

        let plain = DependencyExplorer::new(&reader, ExploreOptions::default())
            .unwrap()
            .explore_a1(BOOK, "Sheet1", "A1")
            .unwrap();

        let lines = RefCell::new(Vec::new());
        let observed = DependencyExplorer::new(&reader, ExploreOptions::default())
            .unwrap()
            .with_progress(|message: &str| lines.borrow_mut().push(message.to_string()))
            .explore_a1(BOOK, "Sheet1", "A1")
            .unwrap();

        assert_eq!(plain, observed);
        let lines = lines.into_inner();
        assert!(lines[0].starts_with("Starting dependency exploration of [Book.xlsx]Sheet1!A1"));
        assert!(lines.iter().any(|l| l.starts_with("Circular reference detected at")));
        assert!(lines
            .last()
            .unwrap()
            .starts_with("Exploration complete: 2 cells processed"));
    }
}
