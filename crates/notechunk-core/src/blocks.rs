//! Block parser: slices the original text along normalized regions.

use crate::adapter::{LineIndex, NormalizedCache, malformed};
use crate::filter::filter_blocks;
use crate::frontmatter::frontmatter_range;
use crate::structure::{Region, RegionKind, StructureCache};
use crate::{BlockType, Diagnostic, ParsedBlock, Span};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Bullet (`-`, `*`, `+`) or ordinal (`1.`, `1)`) marker plus its spacing.
///
/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*+]|\d{1,9}[.)])(?:[ \t]+|$)").unwrap());

/// Spaces per nesting level.
const INDENT_WIDTH: usize = 2;
/// Tabs count as one nesting level.
const TAB_WIDTH: usize = 2;

/// Blocks of one document plus everything recovered on the way.
#[derive(Debug, Clone, Default)]
pub struct BlockParse {
    /// Indexable blocks in document order.
    pub blocks: Vec<ParsedBlock>,
    /// Recovered structural problems and fallbacks.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse and filter the blocks of `text`.
///
/// Never fails. Without a usable cache the whole document (minus
/// frontmatter) becomes a single paragraph block. A cache is unusable when
/// it is absent, has no sections, or none of its block regions lie inside
/// the text while some text is left outside its headings and comments (a
/// stale cache from an older version of the note).
pub fn parse_blocks(text: &str, cache: Option<&StructureCache>) -> BlockParse {
    let Some(cache) = cache.filter(|c| !c.is_empty()) else {
        debug!("No usable structure cache; treating document as one paragraph");
        let mut diagnostics = Vec::new();
        if !text.trim().is_empty() {
            diagnostics.push(Diagnostic::info(
                "no usable structure cache; whole document chunked as one paragraph",
                None,
            ));
        }
        return fallback(text, diagnostics);
    };

    let normalized = NormalizedCache::new(text, Some(cache));
    if normalized.regions.is_empty() && has_uncovered_text(text, &normalized.structural) {
        let mut diagnostics = normalized.diagnostics;
        malformed(
            &mut diagnostics,
            "no structure cache region lies inside the text; whole document chunked as one paragraph"
                .to_string(),
            None,
        );
        return fallback(text, diagnostics);
    }

    let mut parser = BlockParser {
        text,
        cache: &normalized,
        diagnostics: normalized.diagnostics.clone(),
        blocks: Vec::new(),
    };
    parser.run();

    let BlockParser {
        blocks, diagnostics, ..
    } = parser;
    debug!(blocks = blocks.len(), "Parsed blocks");
    BlockParse {
        blocks: filter_blocks(blocks),
        diagnostics,
    }
}

fn fallback(text: &str, diagnostics: Vec<Diagnostic>) -> BlockParse {
    BlockParse {
        blocks: filter_blocks(whole_document(text).into_iter().collect()),
        diagnostics,
    }
}

/// Whether non-blank text remains outside the frontmatter and `covered`.
fn has_uncovered_text(text: &str, covered: &[Span]) -> bool {
    let mut ranges: Vec<(usize, usize)> = covered
        .iter()
        .map(|s| (s.start.offset, s.end.offset))
        .chain(frontmatter_range(text).map(|r| (r.start, r.end)))
        .collect();
    ranges.sort_unstable();

    let mut cursor = 0;
    for (start, end) in ranges {
        if text.get(cursor..start).is_some_and(|gap| !gap.trim().is_empty()) {
            return true;
        }
        cursor = cursor.max(end);
    }
    text.get(cursor..).is_some_and(|rest| !rest.trim().is_empty())
}

fn whole_document(text: &str) -> Option<ParsedBlock> {
    let start = frontmatter_range(text).map_or(0, |r| r.end);
    let end = start + text[start..].trim_end().len();
    if text[start..end].trim().is_empty() {
        return None;
    }
    let lines = LineIndex::new(text);
    Some(ParsedBlock::new(
        BlockType::Paragraph,
        &text[start..end],
        lines.span(start, end),
    ))
}

struct BlockParser<'a> {
    text: &'a str,
    cache: &'a NormalizedCache,
    diagnostics: Vec<Diagnostic>,
    blocks: Vec<ParsedBlock>,
}

impl BlockParser<'_> {
    fn run(&mut self) {
        let cache = self.cache;
        let mut headings = cache.headings.cursor();
        for region in &cache.regions {
            let heading_path = headings.path_at(region.span.start.line);
            match region.kind {
                RegionKind::List => self.list(region, &heading_path),
                RegionKind::Code => self.push(BlockType::Code, region.span, heading_path),
                RegionKind::Table => self.push(BlockType::Table, region.span, heading_path),
                RegionKind::Blockquote => self.push(BlockType::Quote, region.span, heading_path),
                RegionKind::Paragraph | RegionKind::Other => {
                    self.push(BlockType::Paragraph, region.span, heading_path);
                },
                RegionKind::Heading | RegionKind::Yaml | RegionKind::Comment => {},
            }
        }
    }

    fn push(&mut self, block_type: BlockType, span: Span, heading_path: Vec<String>) {
        let Some(raw) = self.text.get(span.start.offset..span.end.offset) else {
            return;
        };
        if raw.trim().is_empty() {
            return;
        }
        self.blocks
            .push(ParsedBlock::new(block_type, raw, span).with_heading_path(heading_path));
    }

    fn list(&mut self, region: &Region, heading_path: &[String]) {
        let range = region.span.start.offset..region.span.end.offset;
        let items: Vec<Span> = self
            .cache
            .list_items
            .iter()
            .map(|i| i.span)
            .filter(|s| range.contains(&s.start.offset))
            .collect();

        if items.is_empty() {
            malformed(
                &mut self.diagnostics,
                format!(
                    "list region at offset {} has no list items; kept as paragraph",
                    range.start
                ),
                Some(region.span.start.line),
            );
            self.push(BlockType::Paragraph, region.span, heading_path.to_vec());
            return;
        }

        let source = self.text;
        let mut parents: Vec<Option<String>> = Vec::new();
        let mut counters: Vec<usize> = Vec::new();
        let mut previous_depth: Option<usize> = None;

        for item in items {
            let end = item.end.offset.min(range.end);
            let Some((depth, span)) = self.item_body(item.start.offset, end) else {
                continue;
            };
            let text = &source[span.start.offset..span.end.offset];

            counters.resize(depth + 1, 0);
            if previous_depth.is_none_or(|prev| depth > prev) {
                counters[depth] = 0;
            }
            let item_index = counters[depth];
            counters[depth] += 1;
            previous_depth = Some(depth);

            let parent = depth
                .checked_sub(1)
                .and_then(|d| parents.get(d).cloned().flatten());
            parents.truncate(depth);
            parents.resize(depth, None);
            parents.push(Some(text.trim().to_string()));

            let mut block = ParsedBlock::new(BlockType::ListItem, text, span)
                .with_heading_path(heading_path.to_vec());
            block.list_depth = Some(depth);
            block.parent_item_text = parent;
            block.item_index = Some(item_index);
            self.blocks.push(block);
        }
    }

    /// Depth and marker-free span of the item between `start` and `end`.
    ///
    /// Depth comes from the indentation of the item's whole line, so it does
    /// not matter whether the provider's span includes leading whitespace.
    fn item_body(&self, start: usize, end: usize) -> Option<(usize, Span)> {
        let lines = &self.cache.lines;
        let line_start = lines.line_start(lines.line_of(start));
        let line = self.text.get(line_start..)?;
        let indent: usize = line
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
            .sum();
        let depth = indent / INDENT_WIDTH;

        let raw = self.text.get(start..end)?;
        let leading = raw.len() - raw.trim_start_matches([' ', '\t']).len();
        let after_indent = &raw[leading..];
        let marker = LIST_MARKER.find(after_indent).map_or(0, |m| m.end());

        let body_start = start + leading + marker;
        let body_end = body_start + self.text[body_start..end].trim_end().len();
        Some((depth, lines.span(body_start, body_end)))
    }
}
