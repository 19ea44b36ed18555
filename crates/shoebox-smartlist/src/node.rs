//! Nodes of an editable filter tree.

use std::fmt;

use shoebox_filter::{
    AlbumRef, Comparison, GroupMode, Opaque, Predicate, QueryRef, TagRef, TextMatch,
};

/// Handle to a node inside one [`FilterTree`](crate::FilterTree).
///
/// Ids are never reused, so a handle to a removed node stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Variant-specific content of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Combines its children; the mode is the one last chosen by the user.
    Group(GroupMode),
    Compare(Comparison),
    Tag(TagRef),
    AnyTags,
    Album(AlbumRef),
    AnyAlbum,
    Query(QueryRef),
    Text(TextMatch),
    Duplicate,
    Constant(bool),
    /// Rule kind this build does not understand; shown but not editable.
    Unsupported(Opaque),
}

impl NodeKind {
    pub fn is_group(&self) -> bool {
        matches!(self, NodeKind::Group(_))
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self, NodeKind::Unsupported(_))
    }

    /// Short name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Group(_) => "group",
            NodeKind::Compare(_) => "comparison",
            NodeKind::Tag(_) => "tag",
            NodeKind::AnyTags => "any-tags rule",
            NodeKind::Album(_) => "album",
            NodeKind::AnyAlbum => "any-album rule",
            NodeKind::Query(_) => "smart list reference",
            NodeKind::Text(_) => "text pattern",
            NodeKind::Duplicate => "duplicate rule",
            NodeKind::Constant(_) => "constant",
            NodeKind::Unsupported(_) => "unsupported rule",
        }
    }

    /// The predicate of this node alone, ignoring children and negation.
    ///
    /// A group stands for its mode over no children.
    pub fn predicate(&self) -> Predicate {
        match self {
            NodeKind::Group(mode) => mode.join(Vec::new()),
            NodeKind::Compare(cmp) => Predicate::Compare(*cmp),
            NodeKind::Tag(tag) => Predicate::HasTag(tag.clone()),
            NodeKind::AnyTags => Predicate::HasAnyTags,
            NodeKind::Album(album) => Predicate::InAlbum(album.clone()),
            NodeKind::AnyAlbum => Predicate::InAnyAlbum,
            NodeKind::Query(query) => Predicate::InQuery(query.clone()),
            NodeKind::Text(text) => Predicate::Text(text.clone()),
            NodeKind::Duplicate => Predicate::IsDuplicate,
            NodeKind::Constant(value) => Predicate::Constant(*value),
            NodeKind::Unsupported(opaque) => Predicate::Unsupported(opaque.clone()),
        }
    }
}

/// One node of an editable filter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) negate: bool,
    pub(crate) kind: NodeKind,
}

impl FilterNode {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            negate: false,
            kind,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node is shown as negated.
    ///
    /// For comparisons the stored operator already carries the negation.
    pub fn negate(&self) -> bool {
        self.negate
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Flip the negate flag; comparisons also flip their operator.
    pub(crate) fn toggle_negate(&mut self) {
        self.negate = !self.negate;
        if let NodeKind::Compare(cmp) = &mut self.kind {
            *cmp = cmp.negated();
        }
    }
}
