//! shoebox-view: live filtered and sorted catalog views.
//!
//! - **Catalog**: the item source a view follows, with snapshot and change
//!   batches ([`InMemoryCatalog`] is a complete in-memory implementation)
//! - **Sync**: helpers that keep a sorted list current without a full resort
//! - **Projection**: [`SortedProjection`], which stays exactly equal to the
//!   sorted, filtered catalog after every change and reports index-based
//!   events
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use shoebox_filter::{CatalogItem, CompareOp, Predicate, Threshold};
//! use shoebox_view::{bind, InMemoryCatalog, SortKey, SortOrder, SortedProjection};
//!
//! let mut catalog = InMemoryCatalog::new();
//! let view = Rc::new(SortedProjection::new(SortOrder::ascending(SortKey::ByteSize)));
//! view.set_predicate(Some(Predicate::compare(
//!     CompareOp::GreaterThan,
//!     Threshold::ByteSize(20),
//! )));
//! bind(&catalog, &view);
//!
//! catalog
//!     .add([CatalogItem::new("a").with_size(10), CatalogItem::new("b").with_size(30)])
//!     .unwrap();
//! assert_eq!(view.len(), 1);
//! assert_eq!(view.get(0).unwrap().name, "b");
//! ```

pub mod catalog;
pub mod error;
pub mod order;
pub mod projection;
pub mod sync;

pub use catalog::{Catalog, CatalogChange, InMemoryCatalog, ItemField, ItemUpdate};
pub use error::{CatalogError, Result};
pub use order::{ItemOrder, SortKey, SortOrder};
pub use projection::{bind, SortedProjection, ViewEvent};
