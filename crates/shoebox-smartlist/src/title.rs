//! Natural-language titles for tree nodes.

use shoebox_filter::GroupMode;

use crate::error::Result;
use crate::node::{FilterNode, NodeId, NodeKind};
use crate::tree::FilterTree;

/// Title shown for one node, e.g. `File size must be bigger than 2.0 MB`.
pub fn describe(node: &FilterNode) -> String {
    let negate = node.negate();
    let must = if negate { "must not" } else { "must" };

    match node.kind() {
        NodeKind::Group(mode) => match (mode, negate) {
            (GroupMode::All, false) => "all of the following",
            (GroupMode::Any, false) => "any of the following",
            (GroupMode::All, true) => "not all of the following",
            (GroupMode::Any, true) => "none of the following",
        }
        .to_string(),
        // Negation is already in the operator
        NodeKind::Compare(cmp) => {
            let measure = cmp.measure();
            let phrase = measure.phrase(cmp.op);
            let (verb, phrase) = match phrase.strip_prefix("not ") {
                Some(rest) => ("must not be", rest),
                None => ("must be", phrase),
            };
            format!("{} {} {} {}", measure.subject(), verb, phrase, cmp.threshold)
        }
        NodeKind::Tag(tag) => format!("{} have tag '{}'", must, tag.name),
        NodeKind::AnyTags if negate => "must not have any tags".to_string(),
        NodeKind::AnyTags => "must have tags".to_string(),
        NodeKind::Album(album) => format!("{} be in album '{}'", must, album.name),
        NodeKind::AnyAlbum if negate => "must not be in any album".to_string(),
        NodeKind::AnyAlbum => "must be in an album".to_string(),
        NodeKind::Query(query) => format!("{} match smart list '{}'", must, query.name),
        NodeKind::Text(text) => format!(
            "{} {} contain '{}'",
            text.attribute.label(),
            must,
            text.pattern
        ),
        NodeKind::Duplicate => format!("{} be a duplicate", must),
        NodeKind::Constant(value) if *value != negate => "always matches".to_string(),
        NodeKind::Constant(_) => "never matches".to_string(),
        NodeKind::Unsupported(opaque) => {
            format!("{} match unsupported rule '{}'", must, opaque.kind)
        }
    }
}

impl FilterTree {
    pub fn title(&self, id: NodeId) -> Result<String> {
        Ok(describe(self.node(id)?))
    }

    /// Indented titles of the whole tree, one node per line.
    pub fn outline(&self) -> String {
        let mut output = String::new();
        self.outline_node(self.root(), 0, &mut output);
        output
    }

    fn outline_node(&self, id: NodeId, depth: usize, output: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        output.push_str(&"  ".repeat(depth));
        output.push_str(&describe(node));
        output.push('\n');
        for child in node.children() {
            self.outline_node(*child, depth + 1, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;
    use shoebox_filter::{
        AlbumRef, CompareOp, Comparison, NoContext, Predicate, QueryRef, TagRef, TextAttribute,
        TextMatch, Threshold,
    };
    use uuid::Uuid;

    fn titled(kind: NodeKind, negate: bool) -> String {
        let mut tree = FilterTree::new();
        let id = tree.add_child(tree.root(), kind).unwrap();
        tree.set_negate(id, negate).unwrap();
        tree.title(id).unwrap()
    }

    fn compare(op: CompareOp, threshold: Threshold) -> NodeKind {
        NodeKind::Compare(Comparison::new(op, threshold))
    }

    #[rstest]
    #[case(GroupMode::All, false, "all of the following")]
    #[case(GroupMode::Any, false, "any of the following")]
    #[case(GroupMode::All, true, "not all of the following")]
    #[case(GroupMode::Any, true, "none of the following")]
    fn group_titles(#[case] mode: GroupMode, #[case] negate: bool, #[case] expected: &str) {
        assert_eq!(titled(NodeKind::Group(mode), negate), expected);
    }

    #[rstest]
    #[case(
        compare(CompareOp::GreaterThan, Threshold::ByteSize(2 * 1024 * 1024)),
        false,
        "File size must be bigger than 2.0 MB"
    )]
    #[case(
        compare(CompareOp::GreaterThan, Threshold::ByteSize(20)),
        true,
        "File size must be no bigger than 20 B"
    )]
    #[case(
        compare(CompareOp::LessThan, Threshold::Width(800)),
        false,
        "Image must be thinner than 800 px"
    )]
    #[case(
        compare(CompareOp::GreaterThan, Threshold::Height(600)),
        false,
        "Image must be taller than 600 px"
    )]
    #[case(
        compare(CompareOp::AtLeast, Threshold::Rating(3)),
        false,
        "Rating must be at least 3 stars"
    )]
    #[case(
        compare(CompareOp::AtLeast, Threshold::Rating(3)),
        true,
        "Rating must be less than 3 stars"
    )]
    #[case(
        compare(CompareOp::Exactly, Threshold::ImportId(5)),
        false,
        "Import must be exactly #5"
    )]
    #[case(
        compare(CompareOp::AtLeast, Threshold::Megapixels(12.0)),
        false,
        "Resolution must be no smaller than 12.0 MP"
    )]
    #[case(
        compare(
            CompareOp::Exactly,
            Threshold::DateTaken(NaiveDate::from_ymd_opt(2021, 7, 4).unwrap())
        ),
        true,
        "Date taken must not be on 2021-07-04"
    )]
    #[case(
        compare(CompareOp::NotExactly, Threshold::Width(800)),
        false,
        "Image must not be as wide as 800 px"
    )]
    fn comparison_titles(#[case] kind: NodeKind, #[case] negate: bool, #[case] expected: &str) {
        assert_eq!(titled(kind, negate), expected);
    }

    #[rstest]
    #[case(NodeKind::Tag(TagRef::new(Uuid::nil(), "family")), false, "must have tag 'family'")]
    #[case(NodeKind::Tag(TagRef::new(Uuid::nil(), "family")), true, "must not have tag 'family'")]
    #[case(NodeKind::AnyTags, false, "must have tags")]
    #[case(NodeKind::AnyTags, true, "must not have any tags")]
    #[case(NodeKind::Album(AlbumRef::new(Uuid::nil(), "Trips")), false, "must be in album 'Trips'")]
    #[case(NodeKind::AnyAlbum, true, "must not be in any album")]
    #[case(NodeKind::Query(QueryRef::new(Uuid::nil(), "Best")), true, "must not match smart list 'Best'")]
    #[case(
        NodeKind::Text(TextMatch::new(TextAttribute::Caption, "sun*")),
        false,
        "Caption must contain 'sun*'"
    )]
    #[case(NodeKind::Duplicate, true, "must not be a duplicate")]
    #[case(NodeKind::Constant(true), false, "always matches")]
    #[case(NodeKind::Constant(true), true, "never matches")]
    fn leaf_titles(#[case] kind: NodeKind, #[case] negate: bool, #[case] expected: &str) {
        assert_eq!(titled(kind, negate), expected);
    }

    #[test]
    fn test_outline_indents_children() {
        let p = Predicate::And(vec![
            Predicate::IsDuplicate,
            Predicate::not(Predicate::Or(vec![Predicate::HasAnyTags])),
        ]);
        let tree = FilterTree::from_predicate(&p).unwrap();
        assert_eq!(
            tree.outline(),
            "all of the following\n  must be a duplicate\n  none of the following\n    must have tags\n"
        );
    }

    #[test]
    fn test_title_of_unknown_node_is_an_error() {
        let mut tree = FilterTree::new();
        let id = tree.add_child(tree.root(), NodeKind::AnyTags).unwrap();
        tree.replace(&Predicate::IsDuplicate, &NoContext).unwrap();
        assert!(tree.title(id).is_err());
    }
}
