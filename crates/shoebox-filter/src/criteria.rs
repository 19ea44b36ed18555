//! Criteria composer.
//!
//! Merges the independent constraints of a browse/search panel into one
//! predicate. Each constraint is optional; unset constraints contribute
//! nothing and the rest are AND-chained with [`combine`] in a fixed order:
//!
//! 1. album scope
//! 2. tag set ([`Criteria::build_tag_filter`])
//! 3. free text
//! 4. date taken
//! 5. rating
//! 6. byte size
//! 7. megapixels
//! 8. width
//! 9. height
//! 10. import id
//! 11. duplicates only
//!
//! Ranges use an inclusive lower bound and an exclusive upper bound. For
//! discrete attributes a lower bound of `N` with an upper bound of `N + 1`
//! collapses into a single `Exactly(N)` comparison.

use chrono::NaiveDate;

use crate::item::{AlbumRef, TagRef};
use crate::operator::{CompareOp, Threshold, ThresholdError};
use crate::pattern::TextAttribute;
use crate::predicate::{combine, either, GroupMode, Predicate};

/// Raw value presentation widgets use for "no bound".
pub const UNSET: i64 = -1;

/// Optional lower (inclusive) and upper (exclusive) bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    pub lower: Option<T>,
    pub higher: Option<T>,
}

impl<T> Default for Range<T> {
    fn default() -> Self {
        Self {
            lower: None,
            higher: None,
        }
    }
}

impl<T> Range<T> {
    pub fn new(lower: Option<T>, higher: Option<T>) -> Self {
        Self { lower, higher }
    }

    pub fn at_least(lower: T) -> Self {
        Self::new(Some(lower), None)
    }

    pub fn below(higher: T) -> Self {
        Self::new(None, Some(higher))
    }

    pub fn between(lower: T, higher: T) -> Self {
        Self::new(Some(lower), Some(higher))
    }

    pub fn is_unset(&self) -> bool {
        self.lower.is_none() && self.higher.is_none()
    }
}

impl<T: TryFrom<i64>> Range<T> {
    /// Build from raw widget values where any negative value (conventionally
    /// [`UNSET`]) means the bound is not set.
    ///
    /// A bound too large for `T` is rejected rather than dropped.
    pub fn from_sentinel(lower: i64, higher: i64) -> Result<Self, ThresholdError> {
        fn bound<T: TryFrom<i64>>(raw: i64) -> Result<Option<T>, ThresholdError> {
            if raw < 0 {
                return Ok(None);
            }
            T::try_from(raw)
                .map(Some)
                .map_err(|_| ThresholdError::OutOfRange {
                    input: raw.to_string(),
                    min: "0".into(),
                    max: format!("{}::MAX", std::any::type_name::<T>()),
                })
        }
        Ok(Self::new(bound(lower)?, bound(higher)?))
    }
}

/// Attribute values with a well-defined successor.
pub trait Discrete: Copy + PartialEq {
    fn successor(self) -> Option<Self>;
}

impl Discrete for u8 {
    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }
}

impl Discrete for u32 {
    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }
}

impl Discrete for u64 {
    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }
}

impl Discrete for NaiveDate {
    fn successor(self) -> Option<Self> {
        self.succ_opt()
    }
}

fn discrete_range<T: Discrete>(
    range: &Range<T>,
    threshold: impl Fn(T) -> Threshold,
) -> Option<Predicate> {
    match (range.lower, range.higher) {
        (Some(lower), Some(higher)) if lower.successor() == Some(higher) => {
            Some(Predicate::compare(CompareOp::Exactly, threshold(lower)))
        }
        (lower, higher) => combine(
            lower.map(|v| Predicate::compare(CompareOp::AtLeast, threshold(v))),
            higher.map(|v| Predicate::compare(CompareOp::LessThan, threshold(v))),
        ),
    }
}

fn continuous_range(range: &Range<f64>, threshold: impl Fn(f64) -> Threshold) -> Option<Predicate> {
    combine(
        range
            .lower
            .map(|v| Predicate::compare(CompareOp::AtLeast, threshold(v))),
        range
            .higher
            .map(|v| Predicate::compare(CompareOp::LessThan, threshold(v))),
    )
}

/// The constraint fields of a browse panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    /// Restrict to one album
    pub album: Option<AlbumRef>,

    /// Tags to filter by (empty: no tag constraint)
    pub tags: Vec<TagRef>,
    /// Whether items need all tags or any of them
    pub tag_mode: GroupMode,
    /// Invert the whole tag constraint
    pub negate_tags: bool,

    /// Free text (empty: no text constraint)
    pub text: String,
    /// Attribute the free text is matched against
    pub text_attribute: TextAttribute,

    pub date_taken: Range<NaiveDate>,
    pub rating: Range<u8>,
    pub byte_size: Range<u64>,
    pub megapixels: Range<f64>,
    pub width: Range<u32>,
    pub height: Range<u32>,
    pub import_id: Range<u64>,

    /// Only show items flagged by duplicate detection
    pub duplicates_only: bool,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `build_filter` would produce no constraint.
    pub fn is_empty(&self) -> bool {
        self.album.is_none()
            && self.tags.is_empty()
            && self.text.is_empty()
            && self.date_taken.is_unset()
            && self.rating.is_unset()
            && self.byte_size.is_unset()
            && self.megapixels.is_unset()
            && self.width.is_unset()
            && self.height.is_unset()
            && self.import_id.is_unset()
            && !self.duplicates_only
    }

    /// Reset every constraint.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Fold the tag set into one predicate.
    ///
    /// `All` AND-chains the tags, `Any` OR-chains them; an empty set is no
    /// constraint in either mode. Negation wraps the finished expression.
    pub fn build_tag_filter(&self) -> Option<Predicate> {
        let fold: fn(Option<Predicate>, Option<Predicate>) -> Option<Predicate> =
            match self.tag_mode {
                GroupMode::All => combine,
                GroupMode::Any => either,
            };
        let tags = self
            .tags
            .iter()
            .map(|tag| Some(Predicate::HasTag(tag.clone())))
            .fold(None, fold);

        if self.negate_tags {
            tags.map(Predicate::not)
        } else {
            tags
        }
    }

    /// Combine every set constraint; `None` when nothing is set.
    pub fn build_filter(&self) -> Option<Predicate> {
        let text = (!self.text.is_empty())
            .then(|| Predicate::text(self.text_attribute, self.text.as_str()));

        let parts = [
            self.album.clone().map(Predicate::InAlbum),
            self.build_tag_filter(),
            text,
            discrete_range(&self.date_taken, Threshold::DateTaken),
            discrete_range(&self.rating, Threshold::Rating),
            discrete_range(&self.byte_size, Threshold::ByteSize),
            continuous_range(&self.megapixels, Threshold::Megapixels),
            discrete_range(&self.width, Threshold::Width),
            discrete_range(&self.height, Threshold::Height),
            discrete_range(&self.import_id, Threshold::ImportId),
            self.duplicates_only.then_some(Predicate::IsDuplicate),
        ];

        let filter = parts.into_iter().fold(None, combine);
        tracing::trace!("Built criteria filter: {:?}", filter);
        filter
    }
}
