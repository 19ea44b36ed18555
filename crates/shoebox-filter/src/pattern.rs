//! Case-insensitive text patterns.
//!
//! A plain pattern is a substring test. Patterns containing `*` or `?` are
//! globs matched anywhere in the text; the compiled regex is built on first
//! use and cached on the pattern.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::item::CatalogItem;

/// Text attribute a pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAttribute {
    #[default]
    Name,
    Caption,
    Path,
}

impl TextAttribute {
    pub const ALL: [TextAttribute; 3] = [
        TextAttribute::Name,
        TextAttribute::Caption,
        TextAttribute::Path,
    ];

    pub fn value_of<'a>(&self, item: &'a CatalogItem) -> &'a str {
        match self {
            TextAttribute::Name => &item.name,
            TextAttribute::Caption => &item.caption,
            TextAttribute::Path => &item.path,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TextAttribute::Name => "Name",
            TextAttribute::Caption => "Caption",
            TextAttribute::Path => "Path",
        }
    }
}

/// A user-entered pattern.
#[derive(Clone, Default)]
pub struct TextPattern {
    raw: String,
    lowered: String,
    glob: OnceLock<Option<Regex>>,
}

impl TextPattern {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            lowered: raw.to_lowercase(),
            raw,
            glob: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn has_wildcards(&self) -> bool {
        self.raw.contains(['*', '?'])
    }

    /// Test the pattern against `text`, ignoring case.
    pub fn is_match(&self, text: &str) -> bool {
        if self.raw.is_empty() {
            return true;
        }
        if self.has_wildcards() {
            if let Some(regex) = self.glob.get_or_init(|| compile_glob(&self.raw)) {
                return regex.is_match(text);
            }
        }
        text.to_lowercase().contains(&self.lowered)
    }
}

fn compile_glob(raw: &str) -> Option<Regex> {
    let mut source = String::with_capacity(raw.len() * 2);
    for c in raw.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    match RegexBuilder::new(&source).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::warn!("Falling back to substring match for '{}': {}", raw, err);
            None
        }
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for TextPattern {}

impl fmt::Debug for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextPattern").field(&self.raw).finish()
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for TextPattern {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl Serialize for TextPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TextPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(TextPattern::new)
    }
}

/// A text predicate: attribute plus pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub attribute: TextAttribute,
    pub pattern: TextPattern,
}

impl TextMatch {
    pub fn new(attribute: TextAttribute, pattern: impl Into<String>) -> Self {
        Self {
            attribute,
            pattern: TextPattern::new(pattern),
        }
    }

    pub fn evaluate(&self, item: &CatalogItem) -> bool {
        self.pattern.is_match(self.attribute.value_of(item))
    }
}
