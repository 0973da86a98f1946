//! Run summary of an exploration

use crate::node::{DependencyNode, NodeType};
use depsheet_core::CellKey;
use std::collections::BTreeMap;

/// Statistics over a finished dependency tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExplorationSummary {
    /// Number of nodes in the tree
    pub total_nodes: usize,
    /// Deepest node depth
    pub max_depth_reached: u32,
    /// Node count per type
    pub type_distribution: BTreeMap<NodeType, usize>,
    /// Number of circular references met
    pub circular_references: usize,
    /// `workbook|sheet|cell` keys of the circular references, in discovery order
    pub circular_ref_list: Vec<String>,
}

impl ExplorationSummary {
    /// Summarize `tree`, with the circular references recorded during exploration
    pub fn from_tree(tree: &DependencyNode, circular_refs: &[CellKey]) -> Self {
        let mut summary = Self::default();
        for node in tree.iter() {
            summary.total_nodes += 1;
            summary.max_depth_reached = summary.max_depth_reached.max(node.depth);
            *summary
                .type_distribution
                .entry(node.node_type())
                .or_insert(0) += 1;
        }
        summary.circular_references = circular_refs.len();
        summary.circular_ref_list = circular_refs.iter().map(|key| key.to_string()).collect();
        summary
    }

    /// Count of nodes of one type
    pub fn count(&self, node_type: NodeType) -> usize {
        self.type_distribution.get(&node_type).copied().unwrap_or(0)
    }
}
