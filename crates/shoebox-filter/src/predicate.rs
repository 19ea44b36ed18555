//! Immutable predicate trees over catalog items.
//!
//! `Predicate` is a closed sum type: every leaf kind and combinator is a
//! variant, and evaluation is an exhaustive match. The absence of a
//! constraint is expressed as `None` wherever an `Option<Predicate>` is
//! expected; `combine` treats `None` as the identity of AND.

use serde::{Deserialize, Serialize};

use crate::context::EvalContext;
use crate::item::{AlbumRef, CatalogItem, QueryId, QueryRef, TagRef};
use crate::operator::{CompareOp, Comparison, Threshold};
use crate::pattern::{TextAttribute, TextMatch};

/// A boolean rule evaluated against one catalog item.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Attribute comparison (size, megapixels, dimensions, import id, rating, date).
    Compare(Comparison),

    /// Item carries this exact tag.
    HasTag(TagRef),
    /// Item carries at least one tag.
    HasAnyTags,

    /// Item is a member of this album.
    InAlbum(AlbumRef),
    /// Item is a member of at least one album.
    InAnyAlbum,

    /// Item matches the saved smart list.
    InQuery(QueryRef),

    /// Case-insensitive pattern test against a text attribute.
    Text(TextMatch),

    /// Item was flagged by duplicate detection.
    IsDuplicate,

    /// Always true or always false.
    Constant(bool),

    /// All children match (empty: true).
    And(Vec<Predicate>),
    /// At least one child matches (empty: false).
    Or(Vec<Predicate>),
    /// Logical negation.
    Not(Box<Predicate>),

    /// A rule this build does not understand, kept verbatim.
    Unsupported(Opaque),
}

/// Opaque placeholder for a predicate kind unknown to this build.
#[derive(Debug, Clone, PartialEq)]
pub struct Opaque {
    pub kind: String,
    pub body: serde_json::Value,
}

impl Opaque {
    pub fn new(kind: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    /// Every child must match.
    #[default]
    All,
    /// At least one child must match.
    Any,
}

impl GroupMode {
    /// The mode a negated group behaves as under De Morgan's law.
    pub fn dual(self) -> Self {
        match self {
            GroupMode::All => GroupMode::Any,
            GroupMode::Any => GroupMode::All,
        }
    }

    /// Build the combinator for this mode over `children`.
    pub fn join(self, children: Vec<Predicate>) -> Predicate {
        match self {
            GroupMode::All => Predicate::And(children),
            GroupMode::Any => Predicate::Or(children),
        }
    }
}

/// AND two optional constraints, treating `None` as "no constraint".
pub fn combine(a: Option<Predicate>, b: Option<Predicate>) -> Option<Predicate> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => Some(Predicate::And(vec![a, b])),
    }
}

/// OR two optional constraints, treating `None` as "no constraint".
///
/// Used to fold lists of alternatives: an empty fold stays `None` instead of
/// collapsing into a vacuous `false`.
pub fn either(a: Option<Predicate>, b: Option<Predicate>) -> Option<Predicate> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => Some(Predicate::Or(vec![a, b])),
    }
}

impl Predicate {
    pub fn compare(op: CompareOp, threshold: Threshold) -> Self {
        Predicate::Compare(Comparison::new(op, threshold))
    }

    pub fn text(attribute: TextAttribute, pattern: impl Into<String>) -> Self {
        Predicate::Text(TextMatch::new(attribute, pattern))
    }

    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    /// Logical complement in canonical form.
    ///
    /// Comparisons flip their operator, constants flip their value and a
    /// double negation unwraps; everything else gains a `Not`.
    pub fn negated(self) -> Self {
        match self {
            Predicate::Compare(cmp) => Predicate::Compare(cmp.negated()),
            Predicate::Constant(value) => Predicate::Constant(!value),
            Predicate::Not(inner) => *inner,
            other => Predicate::not(other),
        }
    }

    /// Evaluate against an item. Total for every tree.
    pub fn evaluate(&self, item: &CatalogItem, ctx: &dyn EvalContext) -> bool {
        let mut visiting = Vec::new();
        self.eval_inner(item, ctx, &mut visiting)
    }

    fn eval_inner(
        &self,
        item: &CatalogItem,
        ctx: &dyn EvalContext,
        visiting: &mut Vec<QueryId>,
    ) -> bool {
        match self {
            Predicate::Compare(cmp) => cmp.evaluate(item),
            Predicate::HasTag(tag) => item.has_tag(&tag.id),
            Predicate::HasAnyTags => !item.tags.is_empty(),
            Predicate::InAlbum(album) => item.in_album(&album.id),
            Predicate::InAnyAlbum => !item.albums.is_empty(),
            Predicate::InQuery(query) => eval_query(query, item, ctx, visiting),
            Predicate::Text(text) => text.evaluate(item),
            Predicate::IsDuplicate => ctx.is_duplicate(item),
            Predicate::Constant(value) => *value,
            Predicate::And(children) => children
                .iter()
                .all(|child| child.eval_inner(item, ctx, visiting)),
            Predicate::Or(children) => children
                .iter()
                .any(|child| child.eval_inner(item, ctx, visiting)),
            Predicate::Not(inner) => !inner.eval_inner(item, ctx, visiting),
            Predicate::Unsupported(opaque) => {
                ctx.evaluate_opaque(&opaque.kind, &opaque.body, item)
            }
        }
    }

    /// Ids of every smart list referenced directly by this tree.
    pub fn referenced_queries(&self) -> Vec<QueryId> {
        let mut out = Vec::new();
        self.collect_queries(&mut out);
        out
    }

    fn collect_queries(&self, out: &mut Vec<QueryId>) {
        match self {
            Predicate::InQuery(query) => {
                if !out.contains(&query.id) {
                    out.push(query.id);
                }
            }
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().for_each(|c| c.collect_queries(out))
            }
            Predicate::Not(inner) => inner.collect_queries(out),
            _ => {}
        }
    }
}

fn eval_query(
    query: &QueryRef,
    item: &CatalogItem,
    ctx: &dyn EvalContext,
    visiting: &mut Vec<QueryId>,
) -> bool {
    if visiting.contains(&query.id) {
        tracing::warn!(
            "Smart list '{}' references itself; treating the reference as unmatched",
            query.name
        );
        return false;
    }
    if visiting.len() >= ctx.max_query_depth() {
        tracing::warn!(
            "Smart list '{}' nests deeper than {} levels; treating the reference as unmatched",
            query.name,
            ctx.max_query_depth()
        );
        return false;
    }
    let Some(definition) = ctx.resolve_query(query.id) else {
        tracing::debug!("Smart list '{}' is not defined", query.name);
        return false;
    };

    visiting.push(query.id);
    let matched = definition.eval_inner(item, ctx, visiting);
    visiting.pop();
    matched
}
