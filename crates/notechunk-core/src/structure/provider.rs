use super::{HeadingEntry, ListItemSpan, Region, RegionKind, StructureCache};
use crate::adapter::LineIndex;
use crate::frontmatter::frontmatter_range;
use crate::{Error, Result, Span};
use std::ops::Range;
use tree_sitter::{Node, Parser};
use tracing::{debug, warn};

/// Builds a [`StructureCache`] from raw markdown with tree-sitter.
///
/// Stands in for a host editor's metadata cache: headings with level and
/// title, top-level block regions, and per-item list spans that stop before
/// nested sub-lists.
pub struct StructureParser {
    parser: Parser,
}

impl StructureParser {
    /// Parser with the markdown grammar loaded.
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_md::LANGUAGE.into())
            .map_err(|e| Error::Parse(format!("Failed to set language: {e}")))?;

        Ok(Self { parser })
    }

    /// Outline `text`. Never fails: a document the grammar cannot parse
    /// yields an empty cache, which downstream means whole-document fallback.
    pub fn build(&mut self, text: &str) -> StructureCache {
        let Some(tree) = self.parser.parse(text, None) else {
            warn!("tree-sitter returned no tree; using empty structure cache");
            return StructureCache::default();
        };

        let mut builder = CacheBuilder {
            text,
            lines: LineIndex::new(text),
            frontmatter: frontmatter_range(text),
            cache: StructureCache::default(),
        };

        if let Some(range) = builder.frontmatter.clone() {
            builder.push_region(RegionKind::Yaml, range);
        }

        builder.visit(tree.root_node());

        let mut cache = builder.cache;
        cache.sections.sort_by_key(|r| r.span.start.offset);
        cache.list_items.sort_by_key(|i| i.span.start.offset);
        debug!(
            sections = cache.sections.len(),
            list_items = cache.list_items.len(),
            headings = cache.headings.len(),
            "Built structure cache"
        );
        cache
    }
}

struct CacheBuilder<'a> {
    text: &'a str,
    lines: LineIndex,
    frontmatter: Option<Range<usize>>,
    cache: StructureCache,
}

impl CacheBuilder<'_> {
    fn visit(&mut self, node: Node) {
        if self.inside_frontmatter(&node) {
            return;
        }

        match node.kind() {
            "document" | "section" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.visit(child);
                }
            },
            "atx_heading" | "setext_heading" => self.heading(node),
            "paragraph" => {
                let raw = self.node_text(node).trim();
                let kind = if raw.starts_with("%%") && raw.ends_with("%%") {
                    RegionKind::Comment
                } else {
                    RegionKind::Paragraph
                };
                self.push_region(kind, node.byte_range());
            },
            "fenced_code_block" | "indented_code_block" => {
                self.push_region(RegionKind::Code, node.byte_range());
            },
            "pipe_table" => self.push_region(RegionKind::Table, node.byte_range()),
            "block_quote" => self.push_region(RegionKind::Blockquote, node.byte_range()),
            "list" => {
                self.push_region(RegionKind::List, node.byte_range());
                self.list_items(node);
            },
            "minus_metadata" | "plus_metadata" => {
                self.push_region(RegionKind::Yaml, node.byte_range());
            },
            "html_block" => {
                let kind = if self.node_text(node).trim_start().starts_with("<!--") {
                    RegionKind::Comment
                } else {
                    RegionKind::Other
                };
                self.push_region(kind, node.byte_range());
            },
            _ if node.is_named() => self.push_region(RegionKind::Other, node.byte_range()),
            _ => {},
        }
    }

    fn heading(&mut self, node: Node) {
        let level = heading_level(node);
        let title = self.heading_title(node);
        if let Some(span) = self.trimmed_span(node.byte_range()) {
            self.cache.headings.push(HeadingEntry { title, level, span });
            self.cache.sections.push(Region::new(RegionKind::Heading, span));
        }
    }

    fn heading_title(&self, node: Node) -> String {
        if let Some(content) = node.child_by_field_name("heading_content") {
            return self
                .node_text(content)
                .trim()
                .trim_end_matches('#')
                .trim()
                .to_string();
        }

        let full = self.node_text(node);
        let first_line = full.lines().next().unwrap_or_default();
        first_line.trim_start_matches('#').trim().to_string()
    }

    /// Record every `list_item` under `list`, each span ending where its own
    /// nested list begins.
    fn list_items(&mut self, list: Node) {
        let mut cursor = list.walk();
        for item in list.children(&mut cursor) {
            if item.kind() != "list_item" {
                continue;
            }

            let mut nested = Vec::new();
            let mut item_cursor = item.walk();
            for child in item.children(&mut item_cursor) {
                if child.kind() == "list" {
                    nested.push(child);
                }
            }

            let own_end = nested
                .first()
                .map_or_else(|| item.end_byte(), Node::start_byte);
            if let Some(span) = self.trimmed_span(item.start_byte()..own_end) {
                self.cache.list_items.push(ListItemSpan { span });
            }

            for child in nested {
                self.list_items(child);
            }
        }
    }

    fn push_region(&mut self, kind: RegionKind, range: Range<usize>) {
        if let Some(span) = self.trimmed_span(range) {
            self.cache.sections.push(Region::new(kind, span));
        }
    }

    /// Span for `range` with trailing whitespace removed; `None` if blank.
    fn trimmed_span(&self, range: Range<usize>) -> Option<Span> {
        let start = range.start.min(self.text.len());
        let end = range.end.clamp(start, self.text.len());
        let slice = self.text.get(start..end)?;
        let trimmed_len = slice.trim_end().len();
        if trimmed_len == 0 {
            return None;
        }
        Some(self.lines.span(start, start + trimmed_len))
    }

    /// Leaf regions starting inside the frontmatter belong to the YAML block
    /// (without the metadata extension the grammar reads it as a thematic
    /// break plus a setext heading).
    fn inside_frontmatter(&self, node: &Node) -> bool {
        let container = matches!(node.kind(), "document" | "section");
        self.frontmatter
            .as_ref()
            .is_some_and(|fm| !container && node.start_byte() < fm.end)
    }

    fn node_text(&self, node: Node) -> &str {
        self.text.get(node.byte_range()).unwrap_or_default()
    }
}

fn heading_level(node: Node) -> usize {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "atx_h1_marker" | "setext_h1_underline" => return 1,
            "atx_h2_marker" | "setext_h2_underline" => return 2,
            "atx_h3_marker" => return 3,
            "atx_h4_marker" => return 4,
            "atx_h5_marker" => return 5,
            "atx_h6_marker" => return 6,
            _ => {},
        }
    }
    1
}
