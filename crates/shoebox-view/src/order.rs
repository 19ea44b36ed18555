//! Orderings for projections.

use std::cmp::Ordering;
use std::fmt;

use shoebox_filter::CatalogItem;

/// A total order over catalog items.
///
/// Implementations must be consistent: `compare(a, b) == Equal` only when
/// the two items may appear in either order.
pub trait ItemOrder {
    fn compare(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering;
}

impl<F> ItemOrder for F
where
    F: Fn(&CatalogItem, &CatalogItem) -> Ordering,
{
    fn compare(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        self(a, b)
    }
}

/// Attribute a built-in ordering sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    #[default]
    DateTaken,
    Name,
    ByteSize,
    ImportId,
    Rating,
}

/// Built-in ordering: one attribute, ascending or descending, ties by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub key: SortKey,
    pub descending: bool,
}

impl SortOrder {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            descending: false,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            descending: true,
        }
    }
}

impl ItemOrder for SortOrder {
    fn compare(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        let by_key = match self.key {
            SortKey::DateTaken => a.date_taken.cmp(&b.date_taken),
            SortKey::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            SortKey::ByteSize => a.byte_size.cmp(&b.byte_size),
            SortKey::ImportId => a.import_id.cmp(&b.import_id),
            SortKey::Rating => a.rating.cmp(&b.rating),
        };
        let by_key = if self.descending {
            by_key.reverse()
        } else {
            by_key
        };
        // Id tie-break keeps the order total in both directions
        by_key.then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self.key {
            SortKey::DateTaken => "date taken",
            SortKey::Name => "name",
            SortKey::ByteSize => "file size",
            SortKey::ImportId => "import",
            SortKey::Rating => "rating",
        };
        let direction = if self.descending { "descending" } else { "ascending" };
        write!(f, "{} ({})", key, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SortKey::ByteSize)]
    #[case(SortKey::ImportId)]
    #[case(SortKey::Rating)]
    fn equal_keys_fall_back_to_id(#[case] key: SortKey) {
        let a = CatalogItem::new("a");
        let b = CatalogItem::new("b");
        let expected = a.id.cmp(&b.id);
        assert_eq!(SortOrder::ascending(key).compare(&a, &b), expected);
        assert_eq!(SortOrder::descending(key).compare(&a, &b), expected);
    }

    #[test]
    fn test_descending_reverses_the_key() {
        let small = CatalogItem::new("small").with_size(1);
        let big = CatalogItem::new("big").with_size(2);
        let order = SortOrder::descending(SortKey::ByteSize);
        assert_eq!(order.compare(&big, &small), Ordering::Less);
        assert_eq!(order.compare(&small, &big), Ordering::Greater);
    }

    #[test]
    fn test_names_sort_case_insensitively() {
        let lower = CatalogItem::new("apple.jpg");
        let upper = CatalogItem::new("Banana.jpg");
        let order = SortOrder::ascending(SortKey::Name);
        assert_eq!(order.compare(&lower, &upper), Ordering::Less);
    }

    #[test]
    fn test_closures_are_orders() {
        let by_rating = |a: &CatalogItem, b: &CatalogItem| b.rating.cmp(&a.rating);
        let good = CatalogItem::new("a").with_rating(5);
        let bad = CatalogItem::new("b").with_rating(1);
        assert_eq!(by_rating.compare(&good, &bad), Ordering::Less);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SortOrder::descending(SortKey::DateTaken).to_string(),
            "date taken (descending)"
        );
    }
}
