//! Structural cache: the offset-addressed outline of one document version.
//!
//! A cache can come from a host editor (deserialized from its JSON dump, the
//! field aliases accept the usual `position`/`heading`/`listItems` shapes) or
//! from the built-in tree-sitter [`StructureParser`].

mod provider;

pub use provider::StructureParser;

use crate::Span;
use serde::{Deserialize, Serialize};

/// Kind of a top-level structural region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionKind {
    /// ATX or setext heading.
    Heading,
    /// Prose paragraph.
    Paragraph,
    /// A whole list, nested items included.
    List,
    /// Fenced or indented code.
    Code,
    /// Markdown table.
    Table,
    /// Block quote or callout.
    Blockquote,
    /// Frontmatter block.
    Yaml,
    /// `%% ... %%` or HTML comment.
    Comment,
    /// Anything else (thematic breaks, callouts, html, math...).
    #[serde(other)]
    Other,
}

impl RegionKind {
    /// Regions that only feed heading-path state and never become blocks.
    pub const fn is_structural_only(self) -> bool {
        matches!(self, Self::Heading | Self::Yaml | Self::Comment)
    }
}

/// One top-level section of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// What the region contains.
    #[serde(rename = "type", alias = "kind")]
    pub kind: RegionKind,
    /// Where it lies in the text.
    #[serde(alias = "position")]
    pub span: Span,
}

impl Region {
    /// Region of `kind` covering `span`.
    pub const fn new(kind: RegionKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// A list item, ending before any nested sub-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemSpan {
    /// Where the item lies in the text.
    #[serde(alias = "position")]
    pub span: Span,
}

/// A heading with its level and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingEntry {
    /// Heading text without the `#` markers.
    #[serde(alias = "heading")]
    pub title: String,
    /// 1 for `#` through 6 for `######`.
    pub level: usize,
    /// Where the heading line lies in the text.
    #[serde(alias = "position")]
    pub span: Span,
}

/// Regions, list items and headings of a document, all offset-addressed
/// into that exact text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureCache {
    /// Top-level regions.
    #[serde(default)]
    pub sections: Vec<Region>,
    /// Spans of every list item at any depth.
    #[serde(default, alias = "list_items")]
    pub list_items: Vec<ListItemSpan>,
    /// Headings in any order.
    #[serde(default)]
    pub headings: Vec<HeadingEntry>,
}

impl StructureCache {
    /// A cache with no regions is unusable; chunking falls back to a single
    /// whole-document paragraph.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
