//! Evaluation collaborators.
//!
//! Predicates that cannot be decided from the item alone (smart list
//! references, duplicate detection, opaque rules) ask an `EvalContext`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::FilterConfig;
use crate::item::{CatalogItem, ItemId, QueryId, QueryRef};
use crate::predicate::Predicate;

/// Lookups a predicate needs beyond the item itself.
pub trait EvalContext {
    /// Resolve a smart list reference to its definition.
    fn resolve_query(&self, id: QueryId) -> Option<Arc<Predicate>>;

    /// Result of the external duplicate detection for this item.
    fn is_duplicate(&self, item: &CatalogItem) -> bool;

    /// Evaluate a rule kind this build does not understand.
    fn evaluate_opaque(&self, kind: &str, body: &serde_json::Value, item: &CatalogItem) -> bool {
        let _ = (kind, body, item);
        false
    }

    /// How many smart list references may be followed in one evaluation.
    fn max_query_depth(&self) -> usize {
        FilterConfig::default().max_query_depth
    }
}

/// Context with no smart lists and no duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl EvalContext for NoContext {
    fn resolve_query(&self, _id: QueryId) -> Option<Arc<Predicate>> {
        None
    }

    fn is_duplicate(&self, _item: &CatalogItem) -> bool {
        false
    }
}

/// In-memory registry of saved smart lists and duplicate flags.
#[derive(Debug, Clone, Default)]
pub struct SmartListLibrary {
    queries: HashMap<QueryId, (QueryRef, Arc<Predicate>)>,
    duplicates: HashSet<ItemId>,
    config: FilterConfig,
}

impl SmartListLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FilterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Save a new smart list under a fresh id.
    pub fn define(&mut self, name: impl Into<String>, definition: Predicate) -> QueryRef {
        let query = QueryRef::new(uuid::Uuid::new_v4(), name);
        self.insert(query.clone(), definition);
        query
    }

    /// Insert or replace a smart list definition.
    pub fn insert(&mut self, query: QueryRef, definition: Predicate) {
        self.queries
            .insert(query.id, (query, Arc::new(definition)));
    }

    pub fn remove(&mut self, id: QueryId) -> Option<Predicate> {
        self.queries
            .remove(&id)
            .map(|(_, definition)| Arc::unwrap_or_clone(definition))
    }

    pub fn get(&self, id: QueryId) -> Option<&Predicate> {
        self.queries.get(&id).map(|(_, definition)| definition.as_ref())
    }

    pub fn query_ref(&self, id: QueryId) -> Option<&QueryRef> {
        self.queries.get(&id).map(|(query, _)| query)
    }

    pub fn queries(&self) -> impl Iterator<Item = &QueryRef> {
        self.queries.values().map(|(query, _)| query)
    }

    /// Replace the duplicate set with a freshly computed one.
    pub fn set_duplicates(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.duplicates = ids.into_iter().collect();
    }

    pub fn mark_duplicate(&mut self, id: ItemId) {
        self.duplicates.insert(id);
    }
}

impl EvalContext for SmartListLibrary {
    fn resolve_query(&self, id: QueryId) -> Option<Arc<Predicate>> {
        self.queries.get(&id).map(|(_, definition)| definition.clone())
    }

    fn is_duplicate(&self, item: &CatalogItem) -> bool {
        self.duplicates.contains(&item.id)
    }

    fn max_query_depth(&self) -> usize {
        self.config.max_query_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_come_from_the_library() {
        let mut library = SmartListLibrary::new();
        let item = CatalogItem::new("copy.jpg");
        assert!(!Predicate::IsDuplicate.evaluate(&item, &library));

        library.mark_duplicate(item.id);
        assert!(Predicate::IsDuplicate.evaluate(&item, &library));

        library.set_duplicates([]);
        assert!(!Predicate::IsDuplicate.evaluate(&item, &library));
    }

    #[test]
    fn test_define_and_remove() {
        let mut library = SmartListLibrary::new();
        let q = library.define("Everything", Predicate::Constant(true));
        assert_eq!(library.query_ref(q.id), Some(&q));
        assert_eq!(library.get(q.id), Some(&Predicate::Constant(true)));
        assert_eq!(library.remove(q.id), Some(Predicate::Constant(true)));
        assert!(library.resolve_query(q.id).is_none());
    }

    #[test]
    fn test_depth_bound_comes_from_config() {
        let mut library = SmartListLibrary::with_config(FilterConfig {
            max_query_depth: 1,
            ..FilterConfig::default()
        });
        let inner = library.define("Inner", Predicate::Constant(true));
        let outer = library.define("Outer", Predicate::InQuery(inner.clone()));
        let item = CatalogItem::new("a.jpg");

        assert!(Predicate::InQuery(inner).evaluate(&item, &library));
        assert!(!Predicate::InQuery(outer).evaluate(&item, &library));
    }

    #[test]
    fn test_opaque_rules_are_unmatched_by_default() {
        let item = CatalogItem::new("a.jpg");
        let opaque = Predicate::Unsupported(crate::predicate::Opaque::new(
            "face_detected",
            serde_json::json!({"kind": "face_detected"}),
        ));
        assert!(!opaque.evaluate(&item, &NoContext));
    }
}
