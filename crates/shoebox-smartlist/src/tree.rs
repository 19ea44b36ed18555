//! Arena-backed editable filter tree.
//!
//! Nodes live in one arena owned by the tree and refer to each other by
//! [`NodeId`]. The tree keeps parent and child links consistent: a node is
//! listed by exactly one parent (none for the root), and every move goes
//! through a detach followed by an attach. Each mutation notifies the
//! tree's listener registry directly.

use shoebox_filter::{
    AlbumRef, CompareOp, EvalContext, FilterConfig, GroupMode, ListenerId, Listeners, Predicate,
    QueryRef, TagRef, TextAttribute, TextPattern, Threshold,
};

use crate::convert::check_references;
use crate::error::{EditError, Result, TreeError};
use crate::event::{TreeEvent, TreePath};
use crate::node::{FilterNode, NodeId, NodeKind};

/// A user-editable boolean expression mirroring a [`Predicate`].
#[derive(Debug)]
pub struct FilterTree {
    pub(crate) nodes: Vec<Option<FilterNode>>,
    /// Id of the node in slot 0; ids are never reused across compactions
    base: usize,
    live: usize,
    pub(crate) root: NodeId,
    pub(crate) owner: Option<QueryRef>,
    pub(crate) config: FilterConfig,
    listeners: Listeners<TreeEvent>,
}

impl Default for FilterTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterTree {
    /// An empty tree: a root "all of the following" group with no clauses.
    pub fn new() -> Self {
        Self::with_config(FilterConfig::default())
    }

    pub fn with_config(config: FilterConfig) -> Self {
        Self {
            nodes: vec![Some(FilterNode::new(NodeKind::Group(GroupMode::All), None))],
            base: 0,
            live: 1,
            root: NodeId(0),
            owner: None,
            config,
            listeners: Listeners::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The smart list this tree defines, if it was opened for one.
    pub fn owner(&self) -> Option<&QueryRef> {
        self.owner.as_ref()
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn get(&self, id: NodeId) -> Option<&FilterNode> {
        let slot = id.0.checked_sub(self.base)?;
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> Result<&FilterNode> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut FilterNode> {
        let slot = id.0.checked_sub(self.base)?;
        self.nodes.get_mut(slot).and_then(Option::as_mut)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut FilterNode> {
        self.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Whether the root group holds no clauses.
    pub fn is_empty(&self) -> bool {
        self.get(self.root)
            .map_or(true, |root| root.children.is_empty())
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Whether the presentation layer may offer edits for this node.
    pub fn is_editable(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.kind.is_editable())
    }

    pub fn subscribe(&self, listener: impl Fn(&TreeEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub(crate) fn emit(&self, event: TreeEvent) {
        self.listeners.emit(&event);
    }

    /// Child-index path from the root to `id`.
    pub fn path(&self, id: NodeId) -> Result<TreePath> {
        let mut path = Vec::new();
        let mut current = id;
        let mut node = self.node(id)?;
        while let Some(parent) = node.parent {
            let parent_node = self.node(parent)?;
            let index = parent_node
                .children
                .iter()
                .position(|child| *child == current)
                .ok_or(TreeError::NotAChild {
                    parent,
                    child: current,
                })?;
            path.push(index);
            current = parent;
            node = parent_node;
        }
        path.reverse();
        Ok(path)
    }

    /// Resolve a path produced by [`FilterTree::path`].
    pub fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(self.root, |current, index| {
            self.get(current)?.children.get(*index).copied()
        })
    }

    /// Whether `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    // === Structure ===

    /// Append a new node under a group.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        let len = self.children(parent)?.len();
        self.insert_child(parent, len, kind)
    }

    /// Insert a new node under a group at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> Result<NodeId> {
        self.require_group(parent)?;
        let len = self.node(parent)?.children.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }

        tracing::debug!("Adding {} under node {} at {}", kind.label(), parent, index);
        let id = self.alloc(kind, Some(parent));
        self.node_mut(parent)?.children.insert(index, id);
        self.emit(TreeEvent::NodesInserted {
            parent: self.path(parent)?,
            indices: vec![index],
            nodes: vec![id],
        });
        Ok(id)
    }

    /// Detach and destroy `child` of `parent`, returning its predicate.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<Predicate> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.remove(child)
    }

    /// Detach and destroy a node and its subtree, returning its predicate.
    pub fn remove(&mut self, id: NodeId) -> Result<Predicate> {
        let removed = self.filter_of(id)?;
        if id == self.root {
            return Err(TreeError::CannotDetachRoot);
        }
        self.detach(id)?;
        self.free(id);
        tracing::debug!("Removed node {}", id);
        Ok(removed)
    }

    /// Move `node` to the end of `new_parent`'s children.
    pub fn set_parent(&mut self, node: NodeId, new_parent: NodeId) -> Result<()> {
        self.check_move(node, new_parent)?;
        self.detach(node)?;
        let index = self.node(new_parent)?.children.len();
        self.attach(new_parent, index, &[node])
    }

    /// Move `nodes` under `parent` so they start at `index`.
    ///
    /// The nodes are first detached from wherever they are; `index` refers
    /// to the parent's child list after that and is clamped to its length.
    /// Every child previously at or after `index` follows the moved nodes,
    /// so all other children keep their relative order.
    pub fn move_children_to_index(
        &mut self,
        parent: NodeId,
        nodes: &[NodeId],
        index: usize,
    ) -> Result<()> {
        self.require_group(parent)?;
        let mut moving: Vec<NodeId> = Vec::with_capacity(nodes.len());
        for &node in nodes {
            self.check_move(node, parent)?;
            if !moving.contains(&node) {
                moving.push(node);
            }
        }

        // Deepest first, so every removal path is still live when emitted
        let mut detach_order: Vec<(usize, NodeId)> = Vec::with_capacity(moving.len());
        for &node in &moving {
            detach_order.push((self.path(node)?.len(), node));
        }
        detach_order.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, node) in detach_order {
            self.detach(node)?;
        }
        let len = self.node(parent)?.children.len();
        self.attach(parent, index.min(len), &moving)
    }

    fn require_group(&self, id: NodeId) -> Result<()> {
        if self.node(id)?.kind.is_group() {
            Ok(())
        } else {
            Err(TreeError::NotAGroup(id))
        }
    }

    fn check_move(&self, node: NodeId, parent: NodeId) -> Result<()> {
        self.node(node)?;
        self.require_group(parent)?;
        if node == self.root {
            return Err(TreeError::CannotDetachRoot);
        }
        if self.is_ancestor_or_self(node, parent) {
            return Err(TreeError::WouldCreateCycle { node, parent });
        }
        Ok(())
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.base + self.nodes.len());
        self.nodes.push(Some(FilterNode::new(kind, parent)));
        self.live += 1;
        id
    }

    /// Unlink a node from its parent, leaving the subtree alive.
    fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node(id)?.parent.ok_or(TreeError::CannotDetachRoot)?;
        let parent_path = self.path(parent)?;

        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings
            .iter()
            .position(|child| *child == id)
            .ok_or(TreeError::NotAChild { parent, child: id })?;
        siblings.remove(index);
        self.node_mut(id)?.parent = None;

        self.emit(TreeEvent::NodesRemoved {
            parent: parent_path,
            indices: vec![index],
            nodes: vec![id],
        });
        Ok(())
    }

    /// Link detached nodes under `parent` starting at `index`.
    fn attach(&mut self, parent: NodeId, index: usize, nodes: &[NodeId]) -> Result<()> {
        let children = &mut self.node_mut(parent)?.children;
        let trailing = children.split_off(index);
        children.extend_from_slice(nodes);
        children.extend(trailing);
        for &node in nodes {
            self.node_mut(node)?.parent = Some(parent);
        }

        self.emit(TreeEvent::NodesInserted {
            parent: self.path(parent)?,
            indices: (index..index + nodes.len()).collect(),
            nodes: nodes.to_vec(),
        });
        Ok(())
    }

    /// Drop a node and all of its descendants from the arena.
    pub(crate) fn free(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let slot = next.0.checked_sub(self.base);
            if let Some(node) = slot
                .and_then(|slot| self.nodes.get_mut(slot))
                .and_then(Option::take)
            {
                self.live -= 1;
                pending.extend(node.children);
            }
        }
    }

    /// Drop every node and start a fresh arena after the last issued id.
    pub(crate) fn reset_arena(&mut self) {
        self.base += self.nodes.len();
        self.nodes.clear();
        self.live = 0;
    }

    // === Field edits ===

    fn changed(&self, id: NodeId) -> Result<()> {
        let path = self.path(id)?;
        self.emit(TreeEvent::NodeChanged { path, node: id });
        Ok(())
    }

    fn edit_kind(
        &mut self,
        id: NodeId,
        expected: &'static str,
        change: impl FnOnce(&mut NodeKind) -> bool,
    ) -> Result<()> {
        let node = self.node_mut(id)?;
        if !node.kind.is_editable() {
            return Err(TreeError::NotEditable(id));
        }
        if !change(&mut node.kind) {
            return Err(TreeError::WrongKind { node: id, expected });
        }
        self.changed(id)
    }

    /// Negate or un-negate a node.
    ///
    /// Comparisons flip their operator to its complement so the tree never
    /// grows a NOT wrapper; groups and other leaves keep the flag and apply
    /// it when the predicate is derived.
    pub fn set_negate(&mut self, id: NodeId, negate: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        if !node.kind.is_editable() {
            return Err(TreeError::NotEditable(id));
        }
        if node.negate == negate {
            return Ok(());
        }
        node.toggle_negate();
        tracing::trace!("Node {} negate set to {}", id, negate);
        self.changed(id)
    }

    /// Choose how a group combines its children.
    pub fn set_mode(&mut self, id: NodeId, mode: GroupMode) -> Result<()> {
        self.edit_kind(id, "group", |kind| match kind {
            NodeKind::Group(current) => {
                *current = mode;
                true
            }
            _ => false,
        })
    }

    /// Set the effective operator of a comparison.
    pub fn set_operator(&mut self, id: NodeId, op: CompareOp) -> Result<()> {
        self.edit_kind(id, "comparison", |kind| match kind {
            NodeKind::Compare(cmp) => {
                cmp.op = op;
                true
            }
            _ => false,
        })
    }

    /// Replace a comparison's threshold; the measure may change with it.
    pub fn set_threshold(&mut self, id: NodeId, threshold: Threshold) -> Result<()> {
        self.edit_kind(id, "comparison", |kind| match kind {
            NodeKind::Compare(cmp) => {
                cmp.threshold = threshold;
                true
            }
            _ => false,
        })
    }

    /// Parse user-entered text as the comparison's new threshold.
    ///
    /// Rejected input leaves the node unchanged and reports why.
    pub fn set_threshold_text(
        &mut self,
        id: NodeId,
        text: &str,
    ) -> std::result::Result<Threshold, EditError> {
        let measure = match &self.node(id)?.kind {
            NodeKind::Compare(cmp) => cmp.measure(),
            NodeKind::Unsupported(_) => return Err(TreeError::NotEditable(id).into()),
            _ => {
                return Err(TreeError::WrongKind {
                    node: id,
                    expected: "comparison",
                }
                .into())
            }
        };

        match measure.parse_value(text) {
            Ok(threshold) => {
                self.set_threshold(id, threshold)?;
                Ok(threshold)
            }
            Err(err) => {
                tracing::warn!(
                    "Rejected {} value '{}' for node {}: {}",
                    measure.subject().to_lowercase(),
                    text,
                    id,
                    err
                );
                Err(err.into())
            }
        }
    }

    pub fn set_pattern(&mut self, id: NodeId, pattern: impl Into<String>) -> Result<()> {
        let pattern = TextPattern::new(pattern);
        self.edit_kind(id, "text pattern", |kind| match kind {
            NodeKind::Text(text) => {
                text.pattern = pattern;
                true
            }
            _ => false,
        })
    }

    pub fn set_text_attribute(&mut self, id: NodeId, attribute: TextAttribute) -> Result<()> {
        self.edit_kind(id, "text pattern", |kind| match kind {
            NodeKind::Text(text) => {
                text.attribute = attribute;
                true
            }
            _ => false,
        })
    }

    pub fn set_tag(&mut self, id: NodeId, tag: TagRef) -> Result<()> {
        self.edit_kind(id, "tag", |kind| match kind {
            NodeKind::Tag(current) => {
                *current = tag;
                true
            }
            _ => false,
        })
    }

    pub fn set_album(&mut self, id: NodeId, album: AlbumRef) -> Result<()> {
        self.edit_kind(id, "album", |kind| match kind {
            NodeKind::Album(current) => {
                *current = album;
                true
            }
            _ => false,
        })
    }

    /// Point a reference node at another smart list.
    ///
    /// When the tree defines a smart list, references that would lead back
    /// to it (directly or through `ctx`) are rejected.
    pub fn set_query(&mut self, id: NodeId, query: QueryRef, ctx: &dyn EvalContext) -> Result<()> {
        if !matches!(self.node(id)?.kind, NodeKind::Query(_)) {
            return self.edit_kind(id, "smart list reference", |_| false);
        }
        if let Some(owner) = &self.owner {
            check_references(owner, &Predicate::InQuery(query.clone()), ctx)?;
        }
        self.edit_kind(id, "smart list reference", |kind| match kind {
            NodeKind::Query(current) => {
                *current = query;
                true
            }
            _ => false,
        })
    }

    pub fn set_constant(&mut self, id: NodeId, value: bool) -> Result<()> {
        self.edit_kind(id, "constant", |kind| match kind {
            NodeKind::Constant(current) => {
                *current = value;
                true
            }
            _ => false,
        })
    }
}
