//! shoebox-filter: predicates over photo catalog items.
//!
//! This crate provides the filtering model shared by the smart list editor
//! and the live catalog views:
//!
//! - **Predicates**: an immutable tree of comparisons, membership tests,
//!   text patterns and AND/OR/NOT combinators, evaluated per item
//! - **Criteria**: independent browse-panel constraints merged into one predicate
//! - **Codec**: JSON persistence that keeps unknown rule kinds intact
//! - **Listeners**: snapshot-dispatch notification registry
//!
//! # Examples
//!
//! ```
//! use shoebox_filter::{CatalogItem, CompareOp, NoContext, Predicate, Threshold};
//!
//! let big = Predicate::compare(CompareOp::GreaterThan, Threshold::ByteSize(20));
//! let item = CatalogItem::new("a.jpg").with_size(30);
//! assert!(big.evaluate(&item, &NoContext));
//! assert!(!big.negated().evaluate(&item, &NoContext));
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod criteria;
pub mod error;
pub mod item;
pub mod notify;
pub mod operator;
pub mod pattern;
pub mod predicate;

pub use config::FilterConfig;
pub use context::{EvalContext, NoContext, SmartListLibrary};
pub use criteria::{Criteria, Discrete, Range, UNSET};
pub use error::{CodecError, ConfigError, FilterError, Result};
pub use item::{AlbumId, AlbumRef, CatalogItem, ItemId, QueryId, QueryRef, TagId, TagRef};
pub use notify::{ListenerId, Listeners};
pub use operator::{format_byte_size, CompareOp, Comparison, Measure, Threshold, ThresholdError, MAX_RATING};
pub use pattern::{TextAttribute, TextMatch, TextPattern};
pub use predicate::{combine, either, GroupMode, Opaque, Predicate};
