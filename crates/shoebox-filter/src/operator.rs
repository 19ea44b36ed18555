//! Comparison operators and thresholds for atomic predicates.
//!
//! Every comparison family shares one six-valued operator set so that
//! negation can be expressed by flipping the operator instead of wrapping
//! the predicate. Each family brings its own wording: byte sizes are
//! "bigger"/"smaller", widths "wider"/"thinner", and so on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::item::CatalogItem;

/// Comparison operator applied as `item_value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `<` (SMALLER_THAN, THINNER_THAN, SHORTER_THAN)
    LessThan,
    /// `<=` (UP_TO)
    AtMost,
    /// `==` (EXACT)
    Exactly,
    /// `!=`
    NotExactly,
    /// `>=` (AT_LEAST)
    AtLeast,
    /// `>` (BIGGER_THAN, WIDER_THAN, TALLER_THAN)
    GreaterThan,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::LessThan,
        CompareOp::AtMost,
        CompareOp::Exactly,
        CompareOp::NotExactly,
        CompareOp::AtLeast,
        CompareOp::GreaterThan,
    ];

    /// The operator whose result is the exact logical complement of this one.
    pub fn complement(self) -> Self {
        match self {
            CompareOp::LessThan => CompareOp::AtLeast,
            CompareOp::AtLeast => CompareOp::LessThan,
            CompareOp::AtMost => CompareOp::GreaterThan,
            CompareOp::GreaterThan => CompareOp::AtMost,
            CompareOp::Exactly => CompareOp::NotExactly,
            CompareOp::NotExactly => CompareOp::Exactly,
        }
    }

    /// Apply the operator to the ordering of an item value against a threshold.
    pub fn test(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::LessThan => ordering == Ordering::Less,
            CompareOp::AtMost => ordering != Ordering::Greater,
            CompareOp::Exactly => ordering == Ordering::Equal,
            CompareOp::NotExactly => ordering != Ordering::Equal,
            CompareOp::AtLeast => ordering != Ordering::Less,
            CompareOp::GreaterThan => ordering == Ordering::Greater,
        }
    }
}

/// The measured attribute a comparison targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    ByteSize,
    Megapixels,
    Width,
    Height,
    ImportId,
    Rating,
    DateTaken,
}

impl Measure {
    pub const ALL: [Measure; 7] = [
        Measure::ByteSize,
        Measure::Megapixels,
        Measure::Width,
        Measure::Height,
        Measure::ImportId,
        Measure::Rating,
        Measure::DateTaken,
    ];

    /// Noun used at the start of a generated title.
    pub fn subject(self) -> &'static str {
        match self {
            Measure::ByteSize => "File size",
            Measure::Megapixels => "Resolution",
            Measure::Width => "Image",
            Measure::Height => "Image",
            Measure::ImportId => "Import",
            Measure::Rating => "Rating",
            Measure::DateTaken => "Date taken",
        }
    }

    /// Natural-language wording of an operator within this family.
    pub fn phrase(self, op: CompareOp) -> &'static str {
        use CompareOp::*;
        match self {
            Measure::ByteSize | Measure::Megapixels => match op {
                GreaterThan => "bigger than",
                LessThan => "smaller than",
                AtMost => "no bigger than",
                AtLeast => "no smaller than",
                Exactly => "exactly",
                NotExactly => "other than",
            },
            Measure::Width => match op {
                GreaterThan => "wider than",
                LessThan => "thinner than",
                AtMost => "no wider than",
                AtLeast => "no thinner than",
                Exactly => "exactly as wide as",
                NotExactly => "not as wide as",
            },
            Measure::Height => match op {
                GreaterThan => "taller than",
                LessThan => "shorter than",
                AtMost => "no taller than",
                AtLeast => "no shorter than",
                Exactly => "exactly as tall as",
                NotExactly => "not as tall as",
            },
            Measure::ImportId | Measure::Rating => match op {
                AtMost => "up to",
                Exactly => "exactly",
                AtLeast => "at least",
                GreaterThan => "more than",
                LessThan => "less than",
                NotExactly => "other than",
            },
            Measure::DateTaken => match op {
                AtMost => "on or before",
                LessThan => "before",
                Exactly => "on",
                NotExactly => "not on",
                AtLeast => "on or after",
                GreaterThan => "after",
            },
        }
    }

    /// Parse user-entered text into a threshold for this measure.
    pub fn parse_value(self, input: &str) -> Result<Threshold, ThresholdError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ThresholdError::Empty);
        }
        let invalid = || ThresholdError::NotANumber(text.to_string());
        match self {
            Measure::ByteSize => parse_byte_size(text).map(Threshold::ByteSize),
            Measure::Megapixels => {
                let value: f64 = text.parse().map_err(|_| invalid())?;
                if !value.is_finite() || value < 0.0 {
                    return Err(ThresholdError::OutOfRange {
                        input: text.to_string(),
                        min: "0".into(),
                        max: "unbounded".into(),
                    });
                }
                Ok(Threshold::Megapixels(value))
            }
            Measure::Width => text.parse().map(Threshold::Width).map_err(|_| invalid()),
            Measure::Height => text.parse().map(Threshold::Height).map_err(|_| invalid()),
            Measure::ImportId => text.parse().map(Threshold::ImportId).map_err(|_| invalid()),
            Measure::Rating => {
                let value: u8 = text.parse().map_err(|_| invalid())?;
                if value > MAX_RATING {
                    return Err(ThresholdError::OutOfRange {
                        input: text.to_string(),
                        min: "0".into(),
                        max: MAX_RATING.to_string(),
                    });
                }
                Ok(Threshold::Rating(value))
            }
            Measure::DateTaken => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Threshold::DateTaken)
                .map_err(|_| ThresholdError::InvalidDate(text.to_string())),
        }
    }
}

/// Highest star rating an item can carry.
pub const MAX_RATING: u8 = 5;

/// Rejected threshold input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("A value is required")]
    Empty,

    #[error("'{0}' is not a valid number")]
    NotANumber(String),

    #[error("'{input}' is out of range ({min} to {max})")]
    OutOfRange {
        input: String,
        min: String,
        max: String,
    },

    #[error("'{0}' is not a date (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Threshold value tagged with the attribute it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "measure", content = "value", rename_all = "snake_case")]
pub enum Threshold {
    ByteSize(u64),
    Megapixels(f64),
    Width(u32),
    Height(u32),
    ImportId(u64),
    Rating(u8),
    DateTaken(NaiveDate),
}

impl Threshold {
    pub fn measure(&self) -> Measure {
        match self {
            Threshold::ByteSize(_) => Measure::ByteSize,
            Threshold::Megapixels(_) => Measure::Megapixels,
            Threshold::Width(_) => Measure::Width,
            Threshold::Height(_) => Measure::Height,
            Threshold::ImportId(_) => Measure::ImportId,
            Threshold::Rating(_) => Measure::Rating,
            Threshold::DateTaken(_) => Measure::DateTaken,
        }
    }

    /// Ordering of the item's attribute relative to this threshold.
    pub fn compare_item(&self, item: &CatalogItem) -> Ordering {
        match self {
            Threshold::ByteSize(t) => item.byte_size.cmp(t),
            Threshold::Megapixels(t) => item.megapixels().total_cmp(t),
            Threshold::Width(t) => item.width.cmp(t),
            Threshold::Height(t) => item.height.cmp(t),
            Threshold::ImportId(t) => item.import_id.cmp(t),
            Threshold::Rating(t) => item.rating.cmp(t),
            Threshold::DateTaken(t) => item.day_taken().cmp(t),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::ByteSize(bytes) => f.write_str(&format_byte_size(*bytes)),
            Threshold::Megapixels(mp) => write!(f, "{:.1} MP", mp),
            Threshold::Width(px) | Threshold::Height(px) => write!(f, "{} px", px),
            Threshold::ImportId(id) => write!(f, "#{}", id),
            Threshold::Rating(stars) => write!(f, "{} stars", stars),
            Threshold::DateTaken(day) => write!(f, "{}", day.format("%Y-%m-%d")),
        }
    }
}

/// An atomic comparison: attribute, operator and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: CompareOp,
    pub threshold: Threshold,
}

impl Comparison {
    pub fn new(op: CompareOp, threshold: Threshold) -> Self {
        Self { op, threshold }
    }

    pub fn measure(&self) -> Measure {
        self.threshold.measure()
    }

    pub fn evaluate(&self, item: &CatalogItem) -> bool {
        self.op.test(self.threshold.compare_item(item))
    }

    /// The same comparison with its operator flipped to the complement.
    pub fn negated(&self) -> Self {
        Self {
            op: self.op.complement(),
            threshold: self.threshold,
        }
    }
}

const UNITS: [(&str, u64); 4] = [
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
    ("B", 1),
];

/// Render a byte count with a binary unit, e.g. `1.5 MB`.
pub fn format_byte_size(bytes: u64) -> String {
    for (unit, scale) in UNITS {
        if bytes >= scale && scale > 1 {
            return format!("{:.1} {}", bytes as f64 / scale as f64, unit);
        }
    }
    format!("{} B", bytes)
}

/// Parse `123`, `800 KB`, `1.5mb` or `2 GB` into bytes.
fn parse_byte_size(text: &str) -> Result<u64, ThresholdError> {
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number = number.trim();
    let unit = unit.trim().to_ascii_uppercase();

    let scale = if unit.is_empty() {
        1
    } else {
        UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| ThresholdError::NotANumber(text.to_string()))?
    };

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(scale)
            .ok_or_else(|| ThresholdError::OutOfRange {
                input: text.to_string(),
                min: "0 B".into(),
                max: format_byte_size(u64::MAX),
            });
    }
    let value: f64 = number
        .parse()
        .map_err(|_| ThresholdError::NotANumber(text.to_string()))?;
    let bytes = value * scale as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(ThresholdError::OutOfRange {
            input: text.to_string(),
            min: "0 B".into(),
            max: format_byte_size(u64::MAX),
        });
    }
    Ok(bytes.round() as u64)
}
