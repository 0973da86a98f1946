//! Dependency tree nodes

use depsheet_core::{DisplayAddress, WorkbookPath};
use depsheet_formula::RangeSummary;
use std::fmt;

/// Node classification, used for summaries and renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeType {
    Formula,
    Value,
    RangeSummary,
    CircularRef,
    LimitReached,
    Error,
    Cancelled,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Formula => "formula",
            NodeType::Value => "value",
            NodeType::RangeSummary => "range_summary",
            NodeType::CircularRef => "circular_ref",
            NodeType::LimitReached => "limit_reached",
            NodeType::Error => "error",
            NodeType::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-type payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum NodeKind {
    /// A formula cell; its references are the node's children
    Formula {
        /// Normalized formula text
        formula: String,
        /// The formula with its INDIRECT call replaced, when resolution succeeded
        resolved_formula: Option<String>,
        value: String,
        calculated_value: Option<String>,
    },
    /// A constant (or unclassified) cell
    Value {
        value: String,
        calculated_value: Option<String>,
    },
    /// A range too large to expand
    RangeSummary(RangeSummary),
    /// The cell is already on the current path
    CircularRef,
    /// The depth limit was reached before the cell was read
    LimitReached,
    /// The cell could not be read
    Error { message: String },
    /// Exploration was cancelled before the cell was visited
    Cancelled,
}

/// One node of a dependency tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DependencyNode {
    pub address: DisplayAddress,
    pub workbook: WorkbookPath,
    pub sheet: String,
    /// Cell address (`B2`) or, for range summaries, range text (`A1:B20`)
    pub location: String,
    pub depth: u32,
    /// Range text this node was expanded from
    pub origin_range: Option<String>,
    pub kind: NodeKind,
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Formula { .. } => NodeType::Formula,
            NodeKind::Value { .. } => NodeType::Value,
            NodeKind::RangeSummary(_) => NodeType::RangeSummary,
            NodeKind::CircularRef => NodeType::CircularRef,
            NodeKind::LimitReached => NodeType::LimitReached,
            NodeKind::Error { .. } => NodeType::Error,
            NodeKind::Cancelled => NodeType::Cancelled,
        }
    }

    /// Displayed value of the cell, or the summary text of a range
    pub fn value(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Formula { value, .. } | NodeKind::Value { value, .. } => Some(value.clone()),
            NodeKind::RangeSummary(summary) => Some(summary.value_text()),
            _ => None,
        }
    }

    pub fn formula(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Formula { formula, .. } => Some(formula),
            _ => None,
        }
    }

    pub fn resolved_formula(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Formula {
                resolved_formula, ..
            } => resolved_formula.as_deref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Error { message } => Some(message),
            NodeKind::RangeSummary(summary) => summary.error.as_deref(),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterate over this node and all descendants, depth-first in child order
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }

    /// Number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

/// Pre-order iterator over a dependency tree
pub struct NodeIter<'a> {
    stack: Vec<&'a DependencyNode>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a DependencyNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(location: &str, kind: NodeKind) -> DependencyNode {
        let workbook = WorkbookPath::new("Book.xlsx");
        DependencyNode {
            address: DisplayAddress::qualified(&workbook, "Sheet1", location, &workbook, false),
            workbook,
            sheet: "Sheet1".to_string(),
            location: location.to_string(),
            depth: 1,
            origin_range: None,
            kind,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_preorder_iteration() {
        let mut root = leaf(
            "A1",
            NodeKind::Formula {
                formula: "=B1+C1".to_string(),
                resolved_formula: None,
                value: "3".to_string(),
                calculated_value: Some("3".to_string()),
            },
        );
        let mut b1 = leaf(
            "B1",
            NodeKind::Formula {
                formula: "=D1".to_string(),
                resolved_formula: None,
                value: "1".to_string(),
                calculated_value: None,
            },
        );
        b1.children.push(leaf("D1", NodeKind::LimitReached));
        root.children.push(b1);
        root.children.push(leaf("C1", NodeKind::CircularRef));

        let order: Vec<&str> = root.iter().map(|n| n.location.as_str()).collect();
        assert_eq!(order, vec!["A1", "B1", "D1", "C1"]);
        assert_eq!(root.count(), 4);
        assert_eq!(root.formula(), Some("=B1+C1"));
        assert_eq!(root.value().as_deref(), Some("3"));
    }

    #[test]
    fn test_node_types() {
        assert_eq!(leaf("A1", NodeKind::Cancelled).node_type(), NodeType::Cancelled);
        let error = leaf(
            "A1",
            NodeKind::Error {
                message: "boom".to_string(),
            },
        );
        assert_eq!(error.node_type().as_str(), "error");
        assert_eq!(error.error(), Some("boom"));
        assert_eq!(error.value(), None);
    }
}
