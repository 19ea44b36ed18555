//! Live filtered and sorted view over a catalog.
//!
//! A `SortedProjection` materializes `sort(filter(source, predicate), order)`
//! and keeps it exact after every catalog change batch, reporting each
//! change to its listeners as index-based [`ViewEvent`]s. Changing the
//! predicate, the order or the evaluation context recomputes from scratch
//! and emits a single [`ViewEvent::Reset`]; consumers should drop any
//! selection they hold over the projection when they see one.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use shoebox_filter::{
    CatalogItem, EvalContext, ItemId, ListenerId, Listeners, NoContext, Predicate,
};

use crate::catalog::{Catalog, CatalogChange, ItemUpdate};
use crate::order::ItemOrder;
use crate::sync;

/// Change notification for a projection.
///
/// Indices in `Removed` refer to the list just before the change; indices
/// in `Inserted` and ranges in `Updated` refer to the list just after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// The whole list was recomputed
    Reset,
    Inserted { indices: Vec<usize> },
    Removed { indices: Vec<usize> },
    /// Items replaced in place, as contiguous ranges
    Updated { ranges: Vec<Range<usize>> },
}

struct State {
    source: HashMap<ItemId, Arc<CatalogItem>>,
    predicate: Option<Predicate>,
    order: Box<dyn ItemOrder>,
    ctx: Rc<dyn EvalContext>,
    visible: Vec<Arc<CatalogItem>>,
    frozen: bool,
    /// Something changed while frozen
    stale: bool,
    /// Count of emitted resets
    resets: u64,
}

/// Collapse a batch to the last version of each id, keeping first-seen order.
fn latest_per_id(items: impl IntoIterator<Item = Arc<CatalogItem>>) -> Vec<Arc<CatalogItem>> {
    let mut latest: Vec<Arc<CatalogItem>> = Vec::new();
    let mut slots: HashMap<ItemId, usize> = HashMap::new();
    for item in items {
        match slots.get(&item.id).copied() {
            Some(slot) => latest[slot] = item,
            None => {
                slots.insert(item.id, latest.len());
                latest.push(item);
            }
        }
    }
    latest
}

impl State {
    fn matches(&self, item: &CatalogItem) -> bool {
        self.predicate
            .as_ref()
            .map_or(true, |predicate| predicate.evaluate(item, &*self.ctx))
    }

    fn recompute(&mut self) {
        let mut visible: Vec<Arc<CatalogItem>> = self
            .source
            .values()
            .filter(|item| self.matches(item))
            .cloned()
            .collect();
        visible.sort_by(|a, b| self.order.compare(a, b));
        tracing::debug!(
            "Recomputed projection: {} of {} items visible",
            visible.len(),
            self.source.len()
        );
        self.visible = visible;
    }

    /// Recompute now, or remember to once thawed.
    fn invalidate(&mut self) -> Vec<ViewEvent> {
        if self.frozen {
            self.stale = true;
            return Vec::new();
        }
        self.recompute();
        self.resets += 1;
        vec![ViewEvent::Reset]
    }

    fn insert_visible(&mut self, items: Vec<Arc<CatalogItem>>) -> Option<ViewEvent> {
        if items.is_empty() {
            return None;
        }
        let order = &self.order;
        let indices =
            sync::insert_sorted_batch(&mut self.visible, items, |a, b| order.compare(a, b));
        Some(ViewEvent::Inserted { indices })
    }

    fn remove_visible(&mut self, doomed: &HashSet<ItemId>) -> Option<ViewEvent> {
        if doomed.is_empty() {
            return None;
        }
        let indices = sync::capture_removals(&self.visible, |item| doomed.contains(&item.id));
        if indices.is_empty() {
            return None;
        }
        sync::remove_indices(&mut self.visible, &indices);
        Some(ViewEvent::Removed { indices })
    }

    /// Keep the source current without touching the visible list.
    fn absorb(&mut self, change: &CatalogChange) {
        match change {
            CatalogChange::Added(items) => {
                for item in items {
                    self.source.insert(item.id, item.clone());
                }
            }
            CatalogChange::Removed(ids) => {
                for id in ids {
                    self.source.remove(id);
                }
            }
            CatalogChange::Updated(updates) => {
                for update in updates {
                    self.source.insert(update.item.id, update.item.clone());
                }
            }
        }
    }

    fn added(&mut self, items: &[Arc<CatalogItem>]) -> Vec<ViewEvent> {
        let (known, fresh): (Vec<_>, Vec<_>) = latest_per_id(items.iter().cloned())
            .into_iter()
            .partition(|item| self.source.contains_key(&item.id));

        let mut incoming = Vec::new();
        for item in fresh {
            self.source.insert(item.id, item.clone());
            if self.matches(&item) {
                incoming.push(item);
            }
        }

        let mut events: Vec<ViewEvent> = self.insert_visible(incoming).into_iter().collect();
        if !known.is_empty() {
            tracing::trace!("{} added items were already present", known.len());
            events.extend(self.updated(known));
        }
        events
    }

    fn removed(&mut self, ids: &[ItemId]) -> Vec<ViewEvent> {
        let doomed: HashSet<ItemId> = ids
            .iter()
            .filter(|id| self.source.remove(*id).is_some())
            .copied()
            .collect();
        self.remove_visible(&doomed).into_iter().collect()
    }

    fn updated(&mut self, items: Vec<Arc<CatalogItem>>) -> Vec<ViewEvent> {
        let latest = latest_per_id(items);

        let positions: HashMap<ItemId, usize> = self
            .visible
            .iter()
            .enumerate()
            .map(|(index, item)| (item.id, index))
            .collect();

        let mut doomed = HashSet::new();
        let mut incoming = Vec::new();
        let mut in_place = Vec::new();
        for item in latest {
            self.source.insert(item.id, item.clone());
            let now_matches = self.matches(&item);
            match positions.get(&item.id) {
                Some(index) => {
                    let unmoved = self.order.compare(&self.visible[*index], &item).is_eq();
                    if now_matches && unmoved {
                        in_place.push(item);
                    } else {
                        doomed.insert(item.id);
                        if now_matches {
                            incoming.push(item);
                        }
                    }
                }
                None if now_matches => incoming.push(item),
                None => {}
            }
        }

        let mut events = Vec::new();
        events.extend(self.remove_visible(&doomed));
        events.extend(self.insert_visible(incoming));

        if !in_place.is_empty() {
            let replacements: HashMap<ItemId, Arc<CatalogItem>> =
                in_place.into_iter().map(|item| (item.id, item)).collect();
            let mut touched = Vec::with_capacity(replacements.len());
            for (index, slot) in self.visible.iter_mut().enumerate() {
                if let Some(item) = replacements.get(&slot.id) {
                    *slot = item.clone();
                    touched.push(index);
                }
            }
            events.push(ViewEvent::Updated {
                ranges: sync::coalesce_ranges(touched),
            });
        }
        events
    }
}

/// A live, index-addressable, filtered and sorted view.
///
/// All methods take `&self` so a projection can be shared (`Rc`) between
/// the catalog subscription that feeds it and the code that reads it.
/// Listeners are called after the projection has settled, so they may read
/// or reconfigure it from inside the callback.
pub struct SortedProjection {
    state: RefCell<State>,
    listeners: Listeners<ViewEvent>,
}

impl SortedProjection {
    /// Create an empty projection with no predicate and no evaluation context.
    pub fn new(order: impl ItemOrder + 'static) -> Self {
        Self::with_context(order, Rc::new(NoContext))
    }

    /// Create an empty projection that evaluates through `ctx`.
    pub fn with_context(order: impl ItemOrder + 'static, ctx: Rc<dyn EvalContext>) -> Self {
        Self {
            state: RefCell::new(State {
                source: HashMap::new(),
                predicate: None,
                order: Box::new(order),
                ctx,
                visible: Vec::new(),
                frozen: false,
                stale: false,
                resets: 0,
            }),
            listeners: Listeners::new(),
        }
    }

    fn dispatch(&self, events: Vec<ViewEvent>) {
        let resets = self.state.borrow().resets;
        for event in events {
            // A listener reset the view; the rest of this batch is stale
            if self.state.borrow().resets != resets {
                tracing::trace!("Dropping {:?} after a reset during dispatch", event);
                break;
            }
            self.listeners.emit(&event);
        }
    }

    // === Reading ===

    /// Number of visible items.
    pub fn len(&self) -> usize {
        self.state.borrow().visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().visible.is_empty()
    }

    /// Visible item at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<CatalogItem>> {
        self.state.borrow().visible.get(index).cloned()
    }

    /// All visible items, in order.
    pub fn items(&self) -> Vec<Arc<CatalogItem>> {
        self.state.borrow().visible.clone()
    }

    /// Number of source items, visible or not.
    pub fn source_len(&self) -> usize {
        self.state.borrow().source.len()
    }

    pub fn predicate(&self) -> Option<Predicate> {
        self.state.borrow().predicate.clone()
    }

    // === Configuration ===

    /// Replace the predicate (`None` shows everything).
    pub fn set_predicate(&self, predicate: Option<Predicate>) {
        let events = {
            let mut state = self.state.borrow_mut();
            state.predicate = predicate;
            state.invalidate()
        };
        self.dispatch(events);
    }

    pub fn set_order(&self, order: impl ItemOrder + 'static) {
        let events = {
            let mut state = self.state.borrow_mut();
            state.order = Box::new(order);
            state.invalidate()
        };
        self.dispatch(events);
    }

    pub fn set_context(&self, ctx: Rc<dyn EvalContext>) {
        let events = {
            let mut state = self.state.borrow_mut();
            state.ctx = ctx;
            state.invalidate()
        };
        self.dispatch(events);
    }

    /// Reapply the predicate after something it depends on changed outside
    /// the catalog (duplicate results, a referenced smart list).
    pub fn refresh(&self) {
        let events = self.state.borrow_mut().invalidate();
        self.dispatch(events);
    }

    /// Replace the whole source with a catalog snapshot.
    pub fn reset_source(&self, items: impl IntoIterator<Item = Arc<CatalogItem>>) {
        let events = {
            let mut state = self.state.borrow_mut();
            state.source = items.into_iter().map(|item| (item.id, item)).collect();
            state.invalidate()
        };
        self.dispatch(events);
    }

    // === Freezing ===

    /// Suspend updates. The visible list stays as it is until `unfreeze`.
    pub fn freeze(&self) {
        let mut state = self.state.borrow_mut();
        if !state.frozen {
            tracing::debug!("Freezing projection");
            state.frozen = true;
        }
    }

    /// Resume updates, catching up with a single recompute if anything
    /// changed meanwhile. Returns whether a catch-up happened.
    pub fn unfreeze(&self) -> bool {
        let events = {
            let mut state = self.state.borrow_mut();
            if !state.frozen {
                return false;
            }
            state.frozen = false;
            if !state.stale {
                tracing::debug!("Thawed projection, nothing pending");
                return false;
            }
            state.stale = false;
            tracing::debug!("Thawed projection, catching up");
            state.invalidate()
        };
        self.dispatch(events);
        true
    }

    pub fn is_frozen(&self) -> bool {
        self.state.borrow().frozen
    }

    // === Catalog changes ===

    /// Apply one catalog change batch.
    pub fn apply(&self, change: &CatalogChange) {
        let events = {
            let mut state = self.state.borrow_mut();
            if state.frozen {
                // Visible list catches up on thaw
                state.absorb(change);
                state.stale = true;
                Vec::new()
            } else {
                match change {
                    CatalogChange::Added(items) => state.added(items),
                    CatalogChange::Removed(ids) => state.removed(ids),
                    CatalogChange::Updated(updates) => {
                        tracing::trace!(
                            "Updating {} items ({:?})",
                            updates.len(),
                            updates
                                .iter()
                                .flat_map(|update| update.changed.iter())
                                .collect::<HashSet<_>>()
                        );
                        let items = updates
                            .iter()
                            .map(|ItemUpdate { item, .. }| item.clone())
                            .collect();
                        state.updated(items)
                    }
                }
            }
        };
        self.dispatch(events);
    }

    // === Listeners ===

    pub fn subscribe(&self, listener: impl Fn(&ViewEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

impl fmt::Debug for SortedProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SortedProjection")
            .field("visible", &state.visible.len())
            .field("source", &state.source.len())
            .field("predicate", &state.predicate)
            .field("frozen", &state.frozen)
            .field("stale", &state.stale)
            .finish()
    }
}

/// Load `catalog` into `projection` and keep it fed with change batches.
///
/// The subscription holds the projection weakly; once the last `Rc` is
/// dropped, later batches are ignored.
pub fn bind(catalog: &dyn Catalog, projection: &Rc<SortedProjection>) -> ListenerId {
    projection.reset_source(catalog.snapshot());
    let weak = Rc::downgrade(projection);
    catalog.subscribe(Box::new(move |change: &CatalogChange| {
        if let Some(projection) = weak.upgrade() {
            projection.apply(change);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::order::{SortKey, SortOrder};
    use shoebox_filter::{CompareOp, Threshold};
    use std::cell::RefCell;

    fn by_size() -> SortOrder {
        SortOrder::ascending(SortKey::ByteSize)
    }

    fn names(projection: &SortedProjection) -> Vec<String> {
        projection.items().iter().map(|item| item.name.clone()).collect()
    }

    fn recorded(projection: &SortedProjection) -> Rc<RefCell<Vec<ViewEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        projection.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    fn bigger_than(size: u64) -> Predicate {
        Predicate::compare(CompareOp::GreaterThan, Threshold::ByteSize(size))
    }

    #[test]
    fn test_negating_the_predicate_swaps_the_visible_items() {
        let a = CatalogItem::new("A").with_size(10);
        let b = CatalogItem::new("B").with_size(30);
        let projection = SortedProjection::new(by_size());
        projection.reset_source([Arc::new(a), Arc::new(b)]);

        projection.set_predicate(Some(bigger_than(20)));
        assert_eq!(names(&projection), vec!["B"]);

        projection.set_predicate(Some(bigger_than(20).negated()));
        assert_eq!(names(&projection), vec!["A"]);
    }

    #[test]
    fn test_predicate_change_emits_one_reset() {
        let projection = SortedProjection::new(by_size());
        projection.reset_source([Arc::new(CatalogItem::new("a").with_size(5))]);
        let events = recorded(&projection);

        projection.set_predicate(Some(bigger_than(1)));
        projection.set_order(SortOrder::descending(SortKey::Name));
        assert_eq!(*events.borrow(), vec![ViewEvent::Reset, ViewEvent::Reset]);
    }

    #[test]
    fn test_added_items_land_in_order() {
        let projection = SortedProjection::new(by_size());
        projection.set_predicate(Some(bigger_than(20)));
        projection.reset_source([
            Arc::new(CatalogItem::new("b").with_size(30)),
            Arc::new(CatalogItem::new("d").with_size(50)),
        ]);
        let events = recorded(&projection);

        projection.apply(&CatalogChange::Added(vec![
            Arc::new(CatalogItem::new("c").with_size(40)),
            Arc::new(CatalogItem::new("small").with_size(1)),
            Arc::new(CatalogItem::new("a").with_size(21)),
        ]));

        assert_eq!(names(&projection), vec!["a", "b", "c", "d"]);
        assert_eq!(
            *events.borrow(),
            vec![ViewEvent::Inserted {
                indices: vec![0, 2]
            }]
        );
        assert_eq!(projection.source_len(), 5);
    }

    #[test]
    fn test_removed_items_report_pre_removal_indices() {
        let items: Vec<Arc<CatalogItem>> = (1..=4)
            .map(|n| Arc::new(CatalogItem::new(format!("{}", n)).with_size(n)))
            .collect();
        let projection = SortedProjection::new(by_size());
        projection.reset_source(items.clone());
        let events = recorded(&projection);

        let unknown = CatalogItem::new("x").id;
        projection.apply(&CatalogChange::Removed(vec![items[3].id, items[1].id, unknown]));

        assert_eq!(names(&projection), vec!["1", "3"]);
        assert_eq!(
            *events.borrow(),
            vec![ViewEvent::Removed {
                indices: vec![1, 3]
            }]
        );
    }

    #[test]
    fn test_updates_move_leave_and_join() {
        let a = CatalogItem::new("a").with_size(25);
        let b = CatalogItem::new("b").with_size(30);
        let c = CatalogItem::new("c").with_size(40);
        let d = CatalogItem::new("d").with_size(5);
        let projection = SortedProjection::new(by_size());
        projection.set_predicate(Some(bigger_than(20)));
        projection.reset_source([a.clone(), b.clone(), c.clone(), d.clone()].map(Arc::new));
        assert_eq!(names(&projection), vec!["a", "b", "c"]);
        let events = recorded(&projection);

        let update = |item: CatalogItem| ItemUpdate {
            item: Arc::new(item),
            changed: Vec::new(),
        };
        projection.apply(&CatalogChange::Updated(vec![
            // Same size: stays where it is
            update(b.clone().with_caption("sunset")),
            // Too small now
            update(a.clone().with_size(1)),
            // Moves past c
            update(b.clone().with_size(45).with_caption("later")),
            // Joins
            update(d.clone().with_size(35)),
        ]));

        assert_eq!(names(&projection), vec!["d", "c", "b"]);
        assert_eq!(
            *events.borrow(),
            vec![
                ViewEvent::Removed {
                    indices: vec![0, 1]
                },
                ViewEvent::Inserted {
                    indices: vec![0, 2]
                },
            ]
        );
        assert_eq!(projection.get(2).unwrap().caption, "later");
    }

    #[test]
    fn test_unmoved_updates_are_coalesced() {
        let items: Vec<CatalogItem> = (1..=5)
            .map(|n| CatalogItem::new(format!("{}", n)).with_size(n))
            .collect();
        let projection = SortedProjection::new(by_size());
        projection.reset_source(items.iter().cloned().map(Arc::new));
        let events = recorded(&projection);

        let updates = [0, 1, 3]
            .iter()
            .map(|i| ItemUpdate {
                item: Arc::new(items[*i].clone().with_rating(4)),
                changed: vec![crate::catalog::ItemField::Rating],
            })
            .collect();
        projection.apply(&CatalogChange::Updated(updates));

        assert_eq!(
            *events.borrow(),
            vec![ViewEvent::Updated {
                ranges: vec![0..2, 3..4]
            }]
        );
        assert_eq!(projection.get(3).unwrap().rating, 4);
    }

    #[test]
    fn test_adding_a_known_item_is_an_update() {
        let a = CatalogItem::new("a").with_size(10);
        let projection = SortedProjection::new(by_size());
        projection.reset_source([Arc::new(a.clone())]);

        projection.apply(&CatalogChange::Added(vec![Arc::new(a.clone().with_size(20))]));
        assert_eq!(projection.len(), 1);
        assert_eq!(projection.source_len(), 1);
        assert_eq!(projection.get(0).unwrap().byte_size, 20);
    }

    #[test]
    fn test_repeated_id_in_one_batch_lands_once() {
        let a = CatalogItem::new("a").with_size(10);
        let projection = SortedProjection::new(by_size());
        let events = recorded(&projection);

        projection.apply(&CatalogChange::Added(vec![
            Arc::new(a.clone()),
            Arc::new(CatalogItem::new("b").with_size(15)),
            Arc::new(a.clone().with_size(20)),
        ]));

        assert_eq!(projection.source_len(), 2);
        assert_eq!(names(&projection), vec!["b", "a"]);
        assert_eq!(projection.get(1).unwrap().byte_size, 20);
        assert_eq!(
            *events.borrow(),
            vec![ViewEvent::Inserted {
                indices: vec![0, 1]
            }]
        );
    }

    #[test]
    fn test_reset_from_a_listener_ends_the_batch() {
        let items: Vec<CatalogItem> = [10, 20, 30]
            .iter()
            .map(|n| CatalogItem::new(format!("{}", n)).with_size(*n))
            .collect();
        let projection = Rc::new(SortedProjection::new(by_size()));
        projection.reset_source(items.iter().cloned().map(Arc::new));
        let events = recorded(&projection);

        let handle = Rc::downgrade(&projection);
        projection.subscribe(move |event| {
            if let (ViewEvent::Removed { .. }, Some(projection)) = (event, handle.upgrade()) {
                projection.set_predicate(Some(bigger_than(15)));
            }
        });

        // Moving the smallest item to the end is a removal then an insertion
        projection.apply(&CatalogChange::Updated(vec![ItemUpdate {
            item: Arc::new(items[0].clone().with_size(40)),
            changed: vec![crate::catalog::ItemField::ByteSize],
        }]));

        assert_eq!(
            *events.borrow(),
            vec![
                ViewEvent::Removed { indices: vec![0] },
                ViewEvent::Reset
            ]
        );
        assert_eq!(names(&projection), vec!["20", "30", "10"]);
    }

    #[test]
    fn test_freeze_defers_to_one_catch_up() {
        let projection = SortedProjection::new(by_size());
        projection.reset_source([Arc::new(CatalogItem::new("a").with_size(10))]);
        let events = recorded(&projection);

        projection.freeze();
        projection.set_predicate(Some(bigger_than(20)));
        projection.apply(&CatalogChange::Added(vec![Arc::new(
            CatalogItem::new("b").with_size(30),
        )]));
        projection.set_predicate(Some(bigger_than(5)));

        // Nothing moves while frozen
        assert!(events.borrow().is_empty());
        assert_eq!(names(&projection), vec!["a"]);

        assert!(projection.unfreeze());
        assert_eq!(*events.borrow(), vec![ViewEvent::Reset]);
        assert_eq!(names(&projection), vec!["a", "b"]);

        projection.freeze();
        assert!(!projection.unfreeze());
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_listeners_can_read_the_projection() {
        let projection = Rc::new(SortedProjection::new(by_size()));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let reader = Rc::downgrade(&projection);
        let sink = seen.clone();
        projection.subscribe(move |_| {
            if let Some(projection) = reader.upgrade() {
                sink.borrow_mut().push(projection.len());
            }
        });

        projection.apply(&CatalogChange::Added(vec![Arc::new(CatalogItem::new("a"))]));
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_bind_follows_the_catalog() {
        let a = CatalogItem::new("a").with_size(30);
        let mut catalog = InMemoryCatalog::with_items([a.clone()]).unwrap();
        let projection = Rc::new(SortedProjection::new(by_size()));
        projection.set_predicate(Some(bigger_than(20)));
        bind(&catalog, &projection);
        assert_eq!(names(&projection), vec!["a"]);

        catalog.add([CatalogItem::new("b").with_size(40)]).unwrap();
        catalog.update([a.clone().with_size(10)]).unwrap();
        assert_eq!(names(&projection), vec!["b"]);

        // Dropped projections are ignored
        drop(projection);
        catalog.remove(&[a.id]).unwrap();
    }
}
