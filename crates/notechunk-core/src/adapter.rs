//! Cache adapter: turns a structural cache into a flat, offset-sorted region
//! list with spans validated against the document text, and resolves heading
//! paths for arbitrary lines.
//!
//! Offsets are authoritative. Line numbers supplied by the cache are
//! recomputed from offsets so a provider that counts lines differently cannot
//! skew positions.

use crate::structure::{HeadingEntry, ListItemSpan, Region, StructureCache};
use crate::utils::{ceil_char_boundary, floor_char_boundary};
use crate::{Diagnostic, Error, Position, Span};
use tracing::{debug, warn};

/// Byte offset → 0-based line lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of `text`.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// 0-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Byte offset where `line` begins (clamped to the last line).
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .or_else(|| self.line_starts.last())
            .copied()
            .unwrap_or(0)
    }

    /// Position of `offset` with its line filled in.
    pub fn position(&self, offset: usize) -> Position {
        Position::new(self.line_of(offset), offset)
    }

    /// Span between two byte offsets.
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.position(start), self.position(end))
    }
}

/// Heading paths as a pure function of a pre-sorted heading list.
#[derive(Debug, Clone, Default)]
pub struct HeadingResolver {
    headings: Vec<ResolvedHeading>,
}

#[derive(Debug, Clone)]
struct ResolvedHeading {
    line: usize,
    level: usize,
    title: String,
}

impl HeadingResolver {
    /// Resolve `headings` to lines and sort them into document order.
    pub fn new(headings: &[HeadingEntry], lines: &LineIndex) -> Self {
        let mut resolved: Vec<ResolvedHeading> = headings
            .iter()
            .map(|h| ResolvedHeading {
                line: lines.line_of(h.span.start.offset),
                level: h.level.max(1),
                title: h.title.trim().to_string(),
            })
            .collect();
        resolved.sort_by_key(|h| h.line);
        Self { headings: resolved }
    }

    /// Stack of heading titles in effect at `line`.
    ///
    /// A heading of level L truncates the stack to L-1 entries and pushes its
    /// title, so skipped levels (`#` then `###`) leave no gap.
    pub fn resolve(&self, line: usize) -> Vec<String> {
        let active = self.headings.partition_point(|h| h.line <= line);
        let mut stack = Vec::new();
        for heading in &self.headings[..active] {
            push_heading(&mut stack, heading);
        }
        stack
    }

    /// Forward-only cursor for callers walking the document in order.
    pub const fn cursor(&self) -> HeadingCursor<'_> {
        HeadingCursor {
            resolver: self,
            next: 0,
            stack: Vec::new(),
            last_line: 0,
        }
    }

    /// Number of headings known to the resolver.
    pub fn len(&self) -> usize {
        self.headings.len()
    }

    /// Whether the resolver knows no headings.
    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }
}

fn push_heading(stack: &mut Vec<String>, heading: &ResolvedHeading) {
    stack.truncate(heading.level - 1);
    stack.push(heading.title.clone());
}

/// Amortised O(1) heading-path lookup for monotonically increasing lines.
///
/// A lookup for an earlier line than the previous one rebuilds the stack from
/// the first heading, so out-of-order callers get the same answer as
/// [`HeadingResolver::resolve`] at O(n) cost.
#[derive(Debug)]
pub struct HeadingCursor<'a> {
    resolver: &'a HeadingResolver,
    next: usize,
    stack: Vec<String>,
    last_line: usize,
}

impl HeadingCursor<'_> {
    /// Heading path in effect at `line`.
    pub fn path_at(&mut self, line: usize) -> Vec<String> {
        if line < self.last_line {
            debug!(line, last_line = self.last_line, "Heading cursor rewound");
            self.next = 0;
            self.stack.clear();
        }
        self.last_line = line;

        let headings = &self.resolver.headings;
        while let Some(heading) = headings.get(self.next) {
            if heading.line > line {
                break;
            }
            push_heading(&mut self.stack, heading);
            self.next += 1;
        }
        self.stack.clone()
    }
}

/// A structural cache validated against one document text.
#[derive(Debug, Clone)]
pub struct NormalizedCache {
    /// Block-producing regions in document order, non-overlapping.
    pub regions: Vec<Region>,
    /// List item spans in document order, clamped to the text.
    pub list_items: Vec<ListItemSpan>,
    /// Heading, frontmatter and comment spans that survived clamping.
    pub structural: Vec<Span>,
    /// Heading paths by line.
    pub headings: HeadingResolver,
    /// Offset to line mapping for the text.
    pub lines: LineIndex,
    /// Problems found while normalizing.
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizedCache {
    /// Normalize `cache` against `text`. Never fails; an absent cache yields
    /// an empty region list.
    pub fn new(text: &str, cache: Option<&StructureCache>) -> Self {
        let lines = LineIndex::new(text);
        let mut diagnostics = Vec::new();

        let Some(cache) = cache else {
            return Self {
                regions: Vec::new(),
                list_items: Vec::new(),
                structural: Vec::new(),
                headings: HeadingResolver::default(),
                lines,
                diagnostics,
            };
        };

        let mut sections: Vec<&Region> = cache.sections.iter().collect();
        sections.sort_by_key(|r| r.span.start.offset);

        let mut regions: Vec<Region> = Vec::with_capacity(sections.len());
        let mut structural = Vec::new();
        let mut covered_to = 0usize;
        for region in sections {
            let Some((start, end)) = clamp_range(text, &region.span, &mut diagnostics) else {
                continue;
            };
            if region.kind.is_structural_only() {
                structural.push(lines.span(start, end));
                covered_to = covered_to.max(end);
                continue;
            }

            let start = if start < covered_to {
                malformed(
                    &mut diagnostics,
                    format!(
                        "{:?} region at offset {start} overlaps previous region ending at {covered_to}; clipped",
                        region.kind
                    ),
                    Some(lines.line_of(start)),
                );
                covered_to
            } else {
                start
            };
            if start >= end {
                continue;
            }

            covered_to = end;
            regions.push(Region::new(region.kind, lines.span(start, end)));
        }

        let mut list_items: Vec<ListItemSpan> = cache
            .list_items
            .iter()
            .filter_map(|item| {
                clamp_range(text, &item.span, &mut diagnostics).map(|(start, end)| ListItemSpan {
                    span: lines.span(start, end),
                })
            })
            .collect();
        list_items.sort_by_key(|i| i.span.start.offset);

        let headings = HeadingResolver::new(&cache.headings, &lines);

        debug!(
            regions = regions.len(),
            list_items = list_items.len(),
            headings = headings.len(),
            "Normalized structure cache"
        );

        Self {
            regions,
            list_items,
            structural,
            headings,
            lines,
            diagnostics,
        }
    }
}

/// Clamp a span to the text and to char boundaries. Inverted or out-of-range
/// spans are reported and dropped.
fn clamp_range(text: &str, span: &Span, diagnostics: &mut Vec<Diagnostic>) -> Option<(usize, usize)> {
    let (raw_start, raw_end) = (span.start.offset, span.end.offset);
    if raw_start >= text.len() || raw_start > raw_end {
        malformed(
            diagnostics,
            format!("span {raw_start}..{raw_end} is outside the document or inverted"),
            Some(span.start.line),
        );
        return None;
    }
    if raw_end > text.len() {
        malformed(
            diagnostics,
            format!(
                "span {raw_start}..{raw_end} exceeds document length {}; clamped",
                text.len()
            ),
            Some(span.start.line),
        );
    }
    let start = floor_char_boundary(text, raw_start);
    let end = ceil_char_boundary(text, raw_end.min(text.len()));
    (start < end).then_some((start, end))
}

/// Record a recovered structural inconsistency.
pub(crate) fn malformed(diagnostics: &mut Vec<Diagnostic>, detail: String, line: Option<usize>) {
    let message = Error::MalformedStructure(detail).to_string();
    warn!("{message}");
    diagnostics.push(Diagnostic::warn(message, line));
}
