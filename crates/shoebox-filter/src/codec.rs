//! JSON persistence codec for predicates.
//!
//! Each node is an object tagged by `kind`:
//!
//! ```text
//! {"kind": "and", "children": [ ... ]}
//! {"kind": "not", "child": { ... }}
//! {"kind": "compare", "op": "greater_than", "threshold": {"measure": "byte_size", "value": 1024}}
//! {"kind": "has_tag", "tag": {"id": "...", "name": "family"}}
//! ```
//!
//! Nodes whose `kind` this build does not know decode to
//! `Predicate::Unsupported` and re-encode byte-for-byte. A known kind with a
//! malformed body is an error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::CodecError;
use crate::item::{AlbumRef, QueryRef, TagRef};
use crate::operator::{CompareOp, Comparison, Threshold};
use crate::pattern::{TextAttribute, TextMatch, TextPattern};
use crate::predicate::{Opaque, Predicate};

/// Leaf kinds understood by this build.
pub const LEAF_KINDS: &[&str] = &[
    "compare",
    "has_tag",
    "has_any_tags",
    "in_album",
    "in_any_album",
    "in_query",
    "text",
    "is_duplicate",
    "constant",
];

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LeafWire {
    Compare { op: CompareOp, threshold: Threshold },
    HasTag { tag: TagRef },
    HasAnyTags,
    InAlbum { album: AlbumRef },
    InAnyAlbum,
    InQuery { query: QueryRef },
    Text { attribute: TextAttribute, pattern: TextPattern },
    IsDuplicate,
    Constant { value: bool },
}

impl LeafWire {
    fn from_predicate(predicate: &Predicate) -> Option<Self> {
        let wire = match predicate {
            Predicate::Compare(cmp) => LeafWire::Compare {
                op: cmp.op,
                threshold: cmp.threshold,
            },
            Predicate::HasTag(tag) => LeafWire::HasTag { tag: tag.clone() },
            Predicate::HasAnyTags => LeafWire::HasAnyTags,
            Predicate::InAlbum(album) => LeafWire::InAlbum {
                album: album.clone(),
            },
            Predicate::InAnyAlbum => LeafWire::InAnyAlbum,
            Predicate::InQuery(query) => LeafWire::InQuery {
                query: query.clone(),
            },
            Predicate::Text(text) => LeafWire::Text {
                attribute: text.attribute,
                pattern: text.pattern.clone(),
            },
            Predicate::IsDuplicate => LeafWire::IsDuplicate,
            Predicate::Constant(value) => LeafWire::Constant { value: *value },
            Predicate::And(_) | Predicate::Or(_) | Predicate::Not(_) | Predicate::Unsupported(_) => {
                return None
            }
        };
        Some(wire)
    }

    fn into_predicate(self) -> Predicate {
        match self {
            LeafWire::Compare { op, threshold } => Predicate::Compare(Comparison::new(op, threshold)),
            LeafWire::HasTag { tag } => Predicate::HasTag(tag),
            LeafWire::HasAnyTags => Predicate::HasAnyTags,
            LeafWire::InAlbum { album } => Predicate::InAlbum(album),
            LeafWire::InAnyAlbum => Predicate::InAnyAlbum,
            LeafWire::InQuery { query } => Predicate::InQuery(query),
            LeafWire::Text { attribute, pattern } => {
                Predicate::Text(TextMatch { attribute, pattern })
            }
            LeafWire::IsDuplicate => Predicate::IsDuplicate,
            LeafWire::Constant { value } => Predicate::Constant(value),
        }
    }
}

/// Encode a predicate tree as a JSON value.
pub fn encode(predicate: &Predicate) -> Result<Value, CodecError> {
    match predicate {
        Predicate::And(children) => Ok(json!({
            "kind": "and",
            "children": children.iter().map(encode).collect::<Result<Vec<_>, _>>()?,
        })),
        Predicate::Or(children) => Ok(json!({
            "kind": "or",
            "children": children.iter().map(encode).collect::<Result<Vec<_>, _>>()?,
        })),
        Predicate::Not(inner) => Ok(json!({
            "kind": "not",
            "child": encode(inner)?,
        })),
        Predicate::Unsupported(opaque) => Ok(opaque.body.clone()),
        leaf => {
            let wire = LeafWire::from_predicate(leaf).ok_or_else(|| CodecError::Malformed {
                kind: "leaf".into(),
                message: format!("{:?} is not a leaf", leaf),
            })?;
            Ok(serde_json::to_value(wire)?)
        }
    }
}

/// Decode a JSON value into a predicate tree.
pub fn decode(value: &Value) -> Result<Predicate, CodecError> {
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::MissingKind(truncate(value.to_string())))?;

    match kind {
        "and" | "or" => {
            let children = value
                .get("children")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(kind, "missing 'children' array"))?
                .iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if kind == "and" {
                Predicate::And(children)
            } else {
                Predicate::Or(children)
            })
        }
        "not" => {
            let child = value
                .get("child")
                .ok_or_else(|| malformed(kind, "missing 'child'"))?;
            Ok(Predicate::not(decode(child)?))
        }
        known if LEAF_KINDS.contains(&known) => LeafWire::deserialize(value)
            .map(LeafWire::into_predicate)
            .map_err(|e| malformed(known, &e.to_string())),
        unknown => {
            tracing::warn!(
                "Keeping unsupported predicate kind '{}' as an opaque rule",
                unknown
            );
            Ok(Predicate::Unsupported(Opaque::new(unknown, value.clone())))
        }
    }
}

/// Encode to a JSON string.
pub fn encode_str(predicate: &Predicate) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&encode(predicate)?)?)
}

/// Decode from a JSON string.
pub fn decode_str(input: &str) -> Result<Predicate, CodecError> {
    let value: Value = serde_json::from_str(input)?;
    decode(&value)
}

fn malformed(kind: &str, message: &str) -> CodecError {
    CodecError::Malformed {
        kind: kind.to_string(),
        message: message.to_string(),
    }
}

fn truncate(mut text: String) -> String {
    const LIMIT: usize = 80;
    if text.len() > LIMIT {
        let mut cut = LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push('…');
    }
    text
}
