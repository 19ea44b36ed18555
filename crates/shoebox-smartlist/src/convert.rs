//! Conversion between editable trees and immutable predicates.
//!
//! Import maps every predicate variant onto a node; a `Not` is folded into
//! the negate flag of the node it wraps. Export walks the tree and applies
//! group negation with De Morgan's law, so the stored group mode is never
//! rewritten.

use shoebox_filter::{
    EvalContext, FilterConfig, GroupMode, Predicate, QueryId, QueryRef,
};

use crate::error::{Result, TreeError};
use crate::event::TreeEvent;
use crate::node::{FilterNode, NodeId, NodeKind};
use crate::tree::FilterTree;

impl FilterTree {
    /// Open a predicate for editing.
    ///
    /// A predicate that is not a group is placed under an "all of the
    /// following" root.
    pub fn from_predicate(predicate: &Predicate) -> Result<Self> {
        Self::from_predicate_with_config(predicate, FilterConfig::default())
    }

    pub fn from_predicate_with_config(predicate: &Predicate, config: FilterConfig) -> Result<Self> {
        let mut tree = Self::with_config(config);
        tree.check_depth(predicate)?;
        tree.install_root(predicate);
        Ok(tree)
    }

    /// Open the definition of the smart list `owner` for editing.
    ///
    /// Fails if the definition reaches `owner` again through any chain of
    /// smart list references resolvable in `ctx`.
    pub fn from_predicate_for(
        owner: QueryRef,
        predicate: &Predicate,
        ctx: &dyn EvalContext,
    ) -> Result<Self> {
        check_references(&owner, predicate, ctx)?;
        let config = FilterConfig {
            max_query_depth: ctx.max_query_depth(),
            ..FilterConfig::default()
        };
        let mut tree = Self::from_predicate_with_config(predicate, config)?;
        tree.owner = Some(owner);
        Ok(tree)
    }

    /// Replace the whole tree with an imported predicate.
    ///
    /// Every existing node id becomes invalid.
    pub fn replace(&mut self, predicate: &Predicate, ctx: &dyn EvalContext) -> Result<()> {
        self.check_import(predicate, ctx)?;
        self.install_root(predicate);
        tracing::debug!("Replaced filter tree ({} nodes)", self.node_count());
        self.emit(TreeEvent::StructureChanged { path: Vec::new() });
        Ok(())
    }

    /// Drop every clause, leaving an empty "all of the following" root.
    pub fn clear(&mut self) {
        self.install_root(&Predicate::And(Vec::new()));
        self.emit(TreeEvent::StructureChanged { path: Vec::new() });
    }

    /// Import a predicate as the last child of a group.
    pub fn import_child(
        &mut self,
        parent: NodeId,
        predicate: &Predicate,
        ctx: &dyn EvalContext,
    ) -> Result<NodeId> {
        if !self.node(parent)?.kind().is_group() {
            return Err(TreeError::NotAGroup(parent));
        }
        self.check_import(predicate, ctx)?;

        let id = self.import(Some(parent), predicate);
        let index = match self.get_mut(parent) {
            Some(node) => {
                node.children.push(id);
                node.children.len() - 1
            }
            None => return Err(TreeError::UnknownNode(parent)),
        };
        self.emit(TreeEvent::NodesInserted {
            parent: self.path(parent)?,
            indices: vec![index],
            nodes: vec![id],
        });
        Ok(id)
    }

    /// The predicate the whole tree stands for.
    pub fn filter(&self) -> Predicate {
        self.get(self.root)
            .map_or_else(|| Predicate::And(Vec::new()), |root| self.export(root))
    }

    /// The predicate one subtree stands for.
    pub fn filter_of(&self, id: NodeId) -> Result<Predicate> {
        Ok(self.export(self.node(id)?))
    }

    fn export(&self, node: &FilterNode) -> Predicate {
        if let NodeKind::Group(mode) = node.kind() {
            let children = node
                .children()
                .iter()
                .filter_map(|id| self.get(*id))
                .map(|child| self.export(child));
            return if node.negate() {
                // NOT(ALL xs) == ANY(NOT x), NOT(ANY xs) == ALL(NOT x)
                mode.dual().join(children.map(Predicate::negated).collect())
            } else {
                mode.join(children.collect())
            };
        }

        let leaf = node.kind().predicate();
        match node.kind() {
            // Operator already flipped
            NodeKind::Compare(_) => leaf,
            _ if node.negate() => leaf.negated(),
            _ => leaf,
        }
    }

    fn check_depth(&self, predicate: &Predicate) -> Result<()> {
        let limit = self.config.max_import_depth;
        if within_depth(predicate, limit) {
            Ok(())
        } else {
            tracing::warn!("Refusing to import a predicate nested deeper than {}", limit);
            Err(TreeError::TooDeep(limit))
        }
    }

    fn check_import(&self, predicate: &Predicate, ctx: &dyn EvalContext) -> Result<()> {
        self.check_depth(predicate)?;
        if let Some(owner) = &self.owner {
            check_references(owner, predicate, ctx)?;
        }
        Ok(())
    }

    /// Free the current root and import `predicate` in its place.
    fn install_root(&mut self, predicate: &Predicate) {
        self.reset_arena();
        let top = self.import(None, predicate);
        let top_is_group = self
            .get(top)
            .map_or(false, |node| node.kind().is_group());

        self.root = if top_is_group {
            top
        } else {
            let root = self.alloc(NodeKind::Group(GroupMode::All), None);
            if let Some(node) = self.get_mut(top) {
                node.parent = Some(root);
            }
            if let Some(node) = self.get_mut(root) {
                node.children.push(top);
            }
            root
        };
    }

    /// Build the subtree for `predicate`. Depth must already be checked.
    fn import(&mut self, parent: Option<NodeId>, predicate: &Predicate) -> NodeId {
        let kind = match predicate {
            Predicate::Not(inner) => {
                let id = self.import(parent, inner);
                if let Some(node) = self.get_mut(id) {
                    node.toggle_negate();
                }
                return id;
            }
            Predicate::And(children) | Predicate::Or(children) => {
                let mode = if matches!(predicate, Predicate::And(_)) {
                    GroupMode::All
                } else {
                    GroupMode::Any
                };
                let id = self.alloc(NodeKind::Group(mode), parent);
                let ids: Vec<NodeId> = children
                    .iter()
                    .map(|child| self.import(Some(id), child))
                    .collect();
                if let Some(node) = self.get_mut(id) {
                    node.children = ids;
                }
                return id;
            }
            Predicate::Compare(cmp) => NodeKind::Compare(*cmp),
            Predicate::HasTag(tag) => NodeKind::Tag(tag.clone()),
            Predicate::HasAnyTags => NodeKind::AnyTags,
            Predicate::InAlbum(album) => NodeKind::Album(album.clone()),
            Predicate::InAnyAlbum => NodeKind::AnyAlbum,
            Predicate::InQuery(query) => NodeKind::Query(query.clone()),
            Predicate::Text(text) => NodeKind::Text(text.clone()),
            Predicate::IsDuplicate => NodeKind::Duplicate,
            Predicate::Constant(value) => NodeKind::Constant(*value),
            Predicate::Unsupported(opaque) => NodeKind::Unsupported(opaque.clone()),
        };
        self.alloc(kind, parent)
    }
}

/// Whether `predicate` nests no deeper than `limit` levels.
fn within_depth(predicate: &Predicate, limit: usize) -> bool {
    if limit == 0 {
        return false;
    }
    match predicate {
        Predicate::And(children) | Predicate::Or(children) => children
            .iter()
            .all(|child| within_depth(child, limit - 1)),
        Predicate::Not(inner) => within_depth(inner, limit - 1),
        _ => true,
    }
}

/// Reject `predicate` if it leads back to `owner` through smart list references.
pub(crate) fn check_references(
    owner: &QueryRef,
    predicate: &Predicate,
    ctx: &dyn EvalContext,
) -> Result<()> {
    let mut seen = Vec::new();
    walk_references(owner, predicate, ctx, &mut seen, 0)
}

fn walk_references(
    owner: &QueryRef,
    predicate: &Predicate,
    ctx: &dyn EvalContext,
    seen: &mut Vec<QueryId>,
    depth: usize,
) -> Result<()> {
    for id in predicate.referenced_queries() {
        if id == owner.id {
            tracing::warn!("Smart list '{}' would reference itself", owner.name);
            return Err(TreeError::CyclicQuery(owner.name.clone()));
        }
        if seen.contains(&id) {
            continue;
        }
        if depth >= ctx.max_query_depth() {
            return Err(TreeError::TooDeep(ctx.max_query_depth()));
        }
        seen.push(id);
        if let Some(definition) = ctx.resolve_query(id) {
            walk_references(owner, &definition, ctx, seen, depth + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_filter::{
        CatalogItem, CompareOp, NoContext, SmartListLibrary, TagRef, TextAttribute, Threshold,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    fn bigger_than(bytes: u64) -> Predicate {
        Predicate::compare(CompareOp::GreaterThan, Threshold::ByteSize(bytes))
    }

    fn sized(bytes: u64) -> CatalogItem {
        CatalogItem::new("item.jpg").with_size(bytes)
    }

    #[test]
    fn test_leaf_is_wrapped_in_all_group() {
        let tree = FilterTree::from_predicate(&bigger_than(20)).unwrap();
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.kind(), &NodeKind::Group(GroupMode::All));
        assert_eq!(root.children().len(), 1);
        assert_eq!(tree.filter(), Predicate::And(vec![bigger_than(20)]));
    }

    #[test]
    fn test_group_becomes_root() {
        let p = Predicate::Or(vec![bigger_than(1), Predicate::HasAnyTags]);
        let tree = FilterTree::from_predicate(&p).unwrap();
        assert_eq!(
            tree.node(tree.root()).unwrap().kind(),
            &NodeKind::Group(GroupMode::Any)
        );
        assert_eq!(tree.filter(), p);
    }

    #[test]
    fn test_not_folds_into_negate_flag() {
        let p = Predicate::And(vec![
            Predicate::not(bigger_than(20)),
            Predicate::not(Predicate::HasAnyTags),
            Predicate::not(Predicate::not(Predicate::IsDuplicate)),
        ]);
        let tree = FilterTree::from_predicate(&p).unwrap();
        let children = tree.children(tree.root()).unwrap();

        let compare = tree.node(children[0]).unwrap();
        assert!(compare.negate());
        assert_eq!(
            compare.kind(),
            &NodeKind::Compare(shoebox_filter::Comparison::new(
                CompareOp::AtMost,
                Threshold::ByteSize(20)
            ))
        );
        assert!(tree.node(children[1]).unwrap().negate());
        assert!(!tree.node(children[2]).unwrap().negate());

        assert_eq!(
            tree.filter(),
            Predicate::And(vec![
                Predicate::compare(CompareOp::AtMost, Threshold::ByteSize(20)),
                Predicate::not(Predicate::HasAnyTags),
                Predicate::IsDuplicate,
            ])
        );
    }

    #[test]
    fn test_negated_groups_export_with_de_morgan() {
        let mut tree = FilterTree::new();
        let root = tree.root();
        let tag = TagRef::new(Uuid::new_v4(), "x");
        tree.add_child(root, NodeKind::Tag(tag.clone())).unwrap();
        tree.add_child(root, NodeKind::Duplicate).unwrap();
        tree.set_negate(root, true).unwrap();

        assert_eq!(
            tree.filter(),
            Predicate::Or(vec![
                Predicate::not(Predicate::HasTag(tag.clone())),
                Predicate::not(Predicate::IsDuplicate),
            ])
        );

        tree.set_mode(root, GroupMode::Any).unwrap();
        assert_eq!(
            tree.filter(),
            Predicate::And(vec![
                Predicate::not(Predicate::HasTag(tag)),
                Predicate::not(Predicate::IsDuplicate),
            ])
        );
    }

    #[test]
    fn test_empty_groups_before_and_after_negation() {
        let item = sized(1);
        let mut tree = FilterTree::new();
        let root = tree.root();
        assert!(tree.filter().evaluate(&item, &NoContext));

        tree.set_mode(root, GroupMode::Any).unwrap();
        assert!(!tree.filter().evaluate(&item, &NoContext));

        tree.set_negate(root, true).unwrap();
        assert!(tree.filter().evaluate(&item, &NoContext));

        tree.set_mode(root, GroupMode::All).unwrap();
        assert!(!tree.filter().evaluate(&item, &NoContext));
    }

    #[test]
    fn test_toggling_negate_flips_visible_items() {
        let items = [sized(10), sized(30)];
        let mut tree = FilterTree::from_predicate(&bigger_than(20)).unwrap();
        let node = tree.children(tree.root()).unwrap()[0];

        let visible = |tree: &FilterTree| -> Vec<u64> {
            let filter = tree.filter();
            items
                .iter()
                .filter(|item| filter.evaluate(item, &NoContext))
                .map(|item| item.byte_size)
                .collect()
        };

        assert_eq!(visible(&tree), vec![30]);
        tree.set_negate(node, true).unwrap();
        assert_eq!(visible(&tree), vec![10]);
        tree.set_negate(node, false).unwrap();
        assert_eq!(visible(&tree), vec![30]);
    }

    #[test]
    fn test_negated_constant_exports_flipped_value() {
        let tree = FilterTree::from_predicate(&Predicate::not(Predicate::Constant(true))).unwrap();
        assert_eq!(
            tree.filter(),
            Predicate::And(vec![Predicate::Constant(false)])
        );
    }

    #[test]
    fn test_import_depth_is_bounded() {
        let mut p = Predicate::HasAnyTags;
        for _ in 0..10 {
            p = Predicate::And(vec![p]);
        }
        let config = FilterConfig {
            max_import_depth: 5,
            ..FilterConfig::default()
        };
        assert_eq!(
            FilterTree::from_predicate_with_config(&p, config).unwrap_err(),
            TreeError::TooDeep(5)
        );
        assert!(FilterTree::from_predicate(&p).is_ok());
    }

    #[test]
    fn test_definition_reaching_owner_is_rejected() {
        let mut library = SmartListLibrary::new();
        let owner = QueryRef::new(Uuid::new_v4(), "Owner");
        let middle = library.define("Middle", Predicate::InQuery(owner.clone()));
        library.insert(owner.clone(), Predicate::InQuery(middle.clone()));

        let err = FilterTree::from_predicate_for(
            owner.clone(),
            &Predicate::Or(vec![bigger_than(1), Predicate::InQuery(middle)]),
            &library,
        )
        .unwrap_err();
        assert_eq!(err, TreeError::CyclicQuery("Owner".into()));

        let direct = FilterTree::from_predicate_for(
            owner.clone(),
            &Predicate::not(Predicate::InQuery(owner)),
            &NoContext,
        );
        assert!(matches!(direct, Err(TreeError::CyclicQuery(_))));
    }

    #[test]
    fn test_cycle_elsewhere_is_not_owner_problem() {
        let mut library = SmartListLibrary::new();
        let a = QueryRef::new(Uuid::new_v4(), "A");
        let b = QueryRef::new(Uuid::new_v4(), "B");
        library.insert(a.clone(), Predicate::InQuery(b.clone()));
        library.insert(b.clone(), Predicate::InQuery(a.clone()));

        let owner = QueryRef::new(Uuid::new_v4(), "Owner");
        let tree = FilterTree::from_predicate_for(owner.clone(), &Predicate::InQuery(a), &library)
            .unwrap();
        assert_eq!(tree.owner(), Some(&owner));
    }

    #[test]
    fn test_replace_emits_structure_change_and_invalidates_ids() {
        let mut tree = FilterTree::from_predicate(&bigger_than(1)).unwrap();
        let old_root = tree.root();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        tree.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let p = Predicate::Or(vec![Predicate::IsDuplicate, Predicate::InAnyAlbum]);
        tree.replace(&p, &NoContext).unwrap();

        assert!(!tree.contains(old_root));
        assert_eq!(tree.filter(), p);
        assert_eq!(tree.node_count(), 3);
        assert_eq!(
            *events.borrow(),
            vec![TreeEvent::StructureChanged { path: vec![] }]
        );

        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.filter(), Predicate::And(vec![]));
    }

    #[test]
    fn test_replacing_compacts_the_arena() {
        let p = Predicate::Or(vec![Predicate::IsDuplicate, Predicate::InAnyAlbum]);
        let mut tree = FilterTree::from_predicate(&p).unwrap();
        let mut stale = vec![tree.root()];
        for _ in 0..10 {
            tree.replace(&p, &NoContext).unwrap();
            stale.push(tree.root());
        }
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.node_count(), 3);

        // Old ids never alias the new nodes
        let current = stale.pop().unwrap();
        assert!(tree.contains(current));
        for id in stale {
            assert!(!tree.contains(id));
        }

        tree.clear();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_import_child_appends_subtree() {
        let mut tree = FilterTree::from_predicate(&Predicate::HasAnyTags).unwrap();
        let root = tree.root();
        let pasted = Predicate::not(Predicate::Or(vec![
            Predicate::text(TextAttribute::Caption, "sunset"),
            Predicate::InAnyAlbum,
        ]));
        let id = tree.import_child(root, &pasted, &NoContext).unwrap();

        assert_eq!(tree.path(id).unwrap(), vec![1]);
        assert!(tree.node(id).unwrap().negate());
        assert_eq!(tree.children(id).unwrap().len(), 2);

        let leaf = tree.children(root).unwrap()[0];
        assert_eq!(
            tree.import_child(leaf, &pasted, &NoContext),
            Err(TreeError::NotAGroup(leaf))
        );
    }
}
