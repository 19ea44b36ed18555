//! shoebox-smartlist: editable smart list definitions.
//!
//! A [`FilterTree`] is the mutable, user-facing form of a
//! [`Predicate`](shoebox_filter::Predicate). It supports structural edits
//! (add, remove, reparent, reorder), negation that keeps the tree flat and
//! the titles readable, validated value edits, and lossless conversion back
//! to a predicate. Every change is reported to the tree's listeners as a
//! [`TreeEvent`].
//!
//! # Examples
//!
//! ```
//! use shoebox_filter::{CatalogItem, CompareOp, Comparison, NoContext, Threshold};
//! use shoebox_smartlist::{FilterTree, NodeKind};
//!
//! let mut tree = FilterTree::new();
//! let big = tree
//!     .add_child(
//!         tree.root(),
//!         NodeKind::Compare(Comparison::new(CompareOp::GreaterThan, Threshold::ByteSize(20))),
//!     )
//!     .unwrap();
//! tree.set_negate(big, true).unwrap();
//!
//! assert_eq!(tree.title(big).unwrap(), "File size must be no bigger than 20 B");
//! let small = CatalogItem::new("a.jpg").with_size(10);
//! assert!(tree.filter().evaluate(&small, &NoContext));
//! ```

mod convert;
pub mod error;
pub mod event;
pub mod node;
pub mod title;
pub mod tree;

pub use error::{EditError, Result, TreeError};
pub use event::{TreeEvent, TreePath};
pub use node::{FilterNode, NodeId, NodeKind};
pub use title::describe;
pub use tree::FilterTree;
