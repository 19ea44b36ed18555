//! Catalog item model.
//!
//! A `CatalogItem` is the unit every predicate is evaluated against. Items
//! are owned by the catalog; filters and views only ever read them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Globally unique item identifier (UUID v4).
pub type ItemId = Uuid;

/// A unique tag identifier.
pub type TagId = Uuid;

/// A unique album identifier.
pub type AlbumId = Uuid;

/// A unique smart list (named query) identifier.
pub type QueryId = Uuid;

/// A reference to a tag (id for evaluation, name for display).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRef {
    pub id: TagId,
    pub name: String,
}

impl TagRef {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A reference to an album.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: AlbumId,
    pub name: String,
}

impl AlbumRef {
    pub fn new(id: AlbumId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A reference to a saved smart list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryRef {
    pub id: QueryId,
    pub name: String,
}

impl QueryRef {
    pub fn new(id: QueryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A photo or video in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,

    // Text attributes
    pub name: String,
    pub caption: String,
    pub path: String,

    // Measurements
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,

    /// Monotonic sequence number assigned by the import that added the item.
    pub import_id: u64,
    /// Star rating, 0 (unrated) to 5.
    pub rating: u8,
    pub date_taken: DateTime<Utc>,

    // Membership
    pub tags: BTreeSet<TagId>,
    pub albums: BTreeSet<AlbumId>,
}

impl CatalogItem {
    /// Create an item with the given name and neutral attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            caption: String::new(),
            path: String::new(),
            byte_size: 0,
            width: 0,
            height: 0,
            import_id: 0,
            rating: 0,
            date_taken: DateTime::<Utc>::UNIX_EPOCH,
            tags: BTreeSet::new(),
            albums: BTreeSet::new(),
        }
    }

    /// Pixel count in millions.
    pub fn megapixels(&self) -> f64 {
        (self.width as f64 * self.height as f64) / 1_000_000.0
    }

    /// Calendar day the item was taken on.
    pub fn day_taken(&self) -> NaiveDate {
        self.date_taken.date_naive()
    }

    pub fn has_tag(&self, tag: &TagId) -> bool {
        self.tags.contains(tag)
    }

    pub fn in_album(&self, album: &AlbumId) -> bool {
        self.albums.contains(album)
    }

    // Builder helpers, used heavily by embedding code and tests.

    pub fn with_size(mut self, byte_size: u64) -> Self {
        self.byte_size = byte_size;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_import_id(mut self, import_id: u64) -> Self {
        self.import_id = import_id;
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_date_taken(mut self, date_taken: DateTime<Utc>) -> Self {
        self.date_taken = date_taken;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_tag(mut self, tag: TagId) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_album(mut self, album: AlbumId) -> Self {
        self.albums.insert(album);
        self
    }
}
