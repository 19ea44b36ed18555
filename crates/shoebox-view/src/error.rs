//! Error types for shoebox-view

use shoebox_filter::ItemId;
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog mutation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// An item with this id is already in the catalog
    #[error("Item {0} is already in the catalog")]
    DuplicateItem(ItemId),

    /// No item with this id is in the catalog
    #[error("Item {0} is not in the catalog")]
    UnknownItem(ItemId),
}
