//! Error types for shoebox-smartlist

use shoebox_filter::ThresholdError;
use thiserror::Error;

use crate::node::NodeId;

/// Result type alias for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Contract violations on an editable tree.
///
/// Every variant is raised before the tree is touched, so a failed call
/// leaves the tree exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Id does not name a live node of this tree
    #[error("Node {0} is not in this tree")]
    UnknownNode(NodeId),

    /// Children can only be attached to groups
    #[error("Node {0} is not a group and cannot hold children")]
    NotAGroup(NodeId),

    /// Edit targets a field the node kind does not have
    #[error("Node {node} does not hold a {expected}")]
    WrongKind { node: NodeId, expected: &'static str },

    /// Node is not a child of the given parent
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Insertion index past the end of the child list
    #[error("Index {index} is out of range for a group with {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    /// Move would place a node under itself or one of its descendants
    #[error("Moving node {node} under {parent} would make it its own ancestor")]
    WouldCreateCycle { node: NodeId, parent: NodeId },

    /// Node holds a rule this build does not understand
    #[error("Node {0} holds an unsupported rule and cannot be edited")]
    NotEditable(NodeId),

    /// The root group is owned by the tree
    #[error("The root group cannot be detached")]
    CannotDetachRoot,

    /// Imported predicate nests too deeply
    #[error("Predicate nests deeper than {0} levels")]
    TooDeep(usize),

    /// Smart list would end up referencing itself
    #[error("Smart list '{0}' would reference itself")]
    CyclicQuery(String),
}

/// Errors from value edits that take user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Structural problem with the edit target
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Entered text was rejected; the node keeps its previous value
    #[error("Invalid value: {0}")]
    Invalid(#[from] ThresholdError),
}
