//! Catalog collaborator: item snapshots and change batches.

use std::collections::HashSet;
use std::sync::Arc;

use shoebox_filter::{CatalogItem, ItemId, ListenerId, Listeners};

use crate::error::{CatalogError, Result};

/// Attribute groups a catalog reports as changed in an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Name,
    Caption,
    Path,
    ByteSize,
    Dimensions,
    ImportId,
    Rating,
    DateTaken,
    Tags,
    Albums,
}

impl ItemField {
    /// Fields that differ between two versions of an item.
    pub fn diff(old: &CatalogItem, new: &CatalogItem) -> Vec<ItemField> {
        let checks = [
            (ItemField::Name, old.name != new.name),
            (ItemField::Caption, old.caption != new.caption),
            (ItemField::Path, old.path != new.path),
            (ItemField::ByteSize, old.byte_size != new.byte_size),
            (
                ItemField::Dimensions,
                old.width != new.width || old.height != new.height,
            ),
            (ItemField::ImportId, old.import_id != new.import_id),
            (ItemField::Rating, old.rating != new.rating),
            (ItemField::DateTaken, old.date_taken != new.date_taken),
            (ItemField::Tags, old.tags != new.tags),
            (ItemField::Albums, old.albums != new.albums),
        ];
        checks
            .into_iter()
            .filter_map(|(field, changed)| changed.then_some(field))
            .collect()
    }
}

/// New version of an item plus the fields that changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub item: Arc<CatalogItem>,
    pub changed: Vec<ItemField>,
}

/// A batch of catalog changes, delivered after the catalog has applied it.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogChange {
    Added(Vec<Arc<CatalogItem>>),
    Removed(Vec<ItemId>),
    Updated(Vec<ItemUpdate>),
}

/// Source of catalog items.
pub trait Catalog {
    /// Every item currently in the catalog.
    fn snapshot(&self) -> Vec<Arc<CatalogItem>>;

    /// Register for change batches.
    fn subscribe(&self, listener: Box<dyn Fn(&CatalogChange)>) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId) -> bool;
}

/// Catalog held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: Vec<Arc<CatalogItem>>,
    listeners: Listeners<CatalogChange>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from items without notifying anyone.
    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.add(items)?;
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Arc<CatalogItem>> {
        self.items.iter().find(|item| item.id == id)
    }

    fn position(&self, id: ItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or(CatalogError::UnknownItem(id))
    }

    /// Add new items. Fails without changes if any id is already present.
    pub fn add(&mut self, items: impl IntoIterator<Item = CatalogItem>) -> Result<()> {
        let items: Vec<Arc<CatalogItem>> = items.into_iter().map(Arc::new).collect();
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id) || self.get(item.id).is_some() {
                return Err(CatalogError::DuplicateItem(item.id));
            }
        }
        if items.is_empty() {
            return Ok(());
        }

        tracing::debug!("Adding {} items to catalog", items.len());
        self.items.extend(items.iter().cloned());
        self.listeners.emit(&CatalogChange::Added(items));
        Ok(())
    }

    /// Remove items by id. Fails without changes if any id is unknown.
    pub fn remove(&mut self, ids: &[ItemId]) -> Result<()> {
        for id in ids {
            self.position(*id)?;
        }
        if ids.is_empty() {
            return Ok(());
        }

        tracing::debug!("Removing {} items from catalog", ids.len());
        self.items.retain(|item| !ids.contains(&item.id));
        self.listeners.emit(&CatalogChange::Removed(ids.to_vec()));
        Ok(())
    }

    /// Replace stored items with new versions (matched by id).
    ///
    /// Items whose fields are unchanged are not reported.
    pub fn update(&mut self, items: impl IntoIterator<Item = CatalogItem>) -> Result<()> {
        let items: Vec<CatalogItem> = items.into_iter().collect();
        let mut positions = Vec::with_capacity(items.len());
        for item in &items {
            positions.push(self.position(item.id)?);
        }

        let mut updates = Vec::new();
        for (position, item) in positions.into_iter().zip(items) {
            let changed = ItemField::diff(&self.items[position], &item);
            if changed.is_empty() {
                continue;
            }
            let item = Arc::new(item);
            self.items[position] = item.clone();
            updates.push(ItemUpdate { item, changed });
        }

        if !updates.is_empty() {
            tracing::debug!("Updated {} catalog items", updates.len());
            self.listeners.emit(&CatalogChange::Updated(updates));
        }
        Ok(())
    }
}

impl Catalog for InMemoryCatalog {
    fn snapshot(&self) -> Vec<Arc<CatalogItem>> {
        self.items.clone()
    }

    fn subscribe(&self, listener: Box<dyn Fn(&CatalogChange)>) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
