//! Change notifications emitted by an editable tree.

use crate::node::NodeId;

/// Child-index path from the root to a node; the root is the empty path.
pub type TreePath = Vec<usize>;

/// A change to a [`FilterTree`](crate::FilterTree).
///
/// Paths and indices describe the tree as it was just before the change,
/// except for `NodesInserted`, which reports final positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// A node's own fields changed (operator, threshold, negate, mode, ...).
    NodeChanged { path: TreePath, node: NodeId },

    /// Nodes were attached under the group at `parent`.
    NodesInserted {
        parent: TreePath,
        indices: Vec<usize>,
        nodes: Vec<NodeId>,
    },

    /// Nodes were detached from the group at `parent`.
    NodesRemoved {
        parent: TreePath,
        indices: Vec<usize>,
        nodes: Vec<NodeId>,
    },

    /// Everything below `path` was rebuilt.
    StructureChanged { path: TreePath },
}
