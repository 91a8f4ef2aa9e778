//! Chunk assembler: the public chunking entry points.

use crate::blocks::{BlockParse, parse_blocks};
use crate::frontmatter::{aliases_from, parse_frontmatter, split_frontmatter, tags_from};
use crate::identity::{ChunkIdAllocator, build_embedding_text, content_hash, extract_block_id, note_hash};
use crate::shaper::shape;
use crate::structure::{StructureCache, StructureParser};
use crate::{
    Chunk, ChunkOptions, ChunkPayloadMeta, ChunkReport, Diagnostic, Error, NoteContext, ParsedBlock,
    Result,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Chunk `markdown` against a caller-supplied structural cache.
///
/// Deterministic for equal inputs. The only error is
/// [`Error::MissingDocumentIdentity`]; malformed markdown or an unusable
/// cache degrade the output instead.
pub fn chunk_note(
    markdown: &str,
    context: &NoteContext,
    options: &ChunkOptions,
    cache: Option<&StructureCache>,
) -> Result<Vec<Chunk>> {
    chunk_note_with_report(markdown, context, options, cache).map(|report| report.chunks)
}

/// [`chunk_note`] plus diagnostics, the note hash and the soft-cap count.
pub fn chunk_note_with_report(
    markdown: &str,
    context: &NoteContext,
    options: &ChunkOptions,
    cache: Option<&StructureCache>,
) -> Result<ChunkReport> {
    let original_id = context.identity().ok_or(Error::MissingDocumentIdentity)?;

    let mut diagnostics = Vec::new();
    let labels = Labels::resolve(markdown, context, &mut diagnostics);

    let BlockParse {
        blocks,
        diagnostics: parse_diagnostics,
    } = parse_blocks(markdown, cache);
    diagnostics.extend(parse_diagnostics);

    let mut blocks = shape(blocks, options);
    let truncated = blocks.len().saturating_sub(options.max_chunks_soft);
    if truncated > 0 {
        debug!(
            total = blocks.len(),
            kept = options.max_chunks_soft,
            "Soft chunk cap reached"
        );
        diagnostics.push(Diagnostic::info(
            format!(
                "{truncated} trailing chunks dropped by max_chunks_soft={}",
                options.max_chunks_soft
            ),
            None,
        ));
        blocks.truncate(options.max_chunks_soft);
    }

    let note_hash = note_hash(markdown);
    let assembler = Assembler {
        original_id,
        context,
        labels: &labels,
        note_hash: &note_hash,
    };

    let mut ids = ChunkIdAllocator::new();
    let mut chunks: Vec<Chunk> = blocks
        .into_iter()
        .enumerate()
        .map(|(index, block)| assembler.chunk(index, block, &mut ids, &mut diagnostics))
        .collect();
    link_neighbours(&mut chunks);

    debug!(
        note = %context.note_path,
        chunks = chunks.len(),
        diagnostics = diagnostics.len(),
        "Chunked note"
    );

    Ok(ChunkReport {
        chunks,
        diagnostics,
        note_hash,
        truncated,
    })
}

/// Chunk `markdown` using the built-in tree-sitter structure provider.
pub fn chunk_markdown(
    markdown: &str,
    context: &NoteContext,
    options: &ChunkOptions,
) -> Result<ChunkReport> {
    let cache = match StructureParser::new() {
        Ok(mut parser) => Some(parser.build(markdown)),
        Err(e) => {
            warn!("Structure parser unavailable, chunking whole document: {e}");
            None
        },
    };
    chunk_note_with_report(markdown, context, options, cache.as_ref())
}

/// Tags and aliases, from the context or else from the frontmatter.
struct Labels {
    tags: Vec<String>,
    aliases: Vec<String>,
}

impl Labels {
    fn resolve(markdown: &str, context: &NoteContext, diagnostics: &mut Vec<Diagnostic>) -> Self {
        let needs_frontmatter = context.tags.is_empty() || context.aliases.is_empty();
        let frontmatter: Cow<'_, Value> = match (&context.frontmatter, needs_frontmatter) {
            (_, false) => Cow::Owned(Value::Null),
            (Some(value), true) => Cow::Borrowed(value),
            (None, true) => Cow::Owned(read_frontmatter(markdown, diagnostics)),
        };

        let pick = |given: &[String], read: fn(&Value) -> Vec<String>| {
            if given.is_empty() {
                read(&frontmatter)
            } else {
                given.to_vec()
            }
        };

        Self {
            tags: pick(&context.tags, tags_from),
            aliases: pick(&context.aliases, aliases_from),
        }
    }
}

fn read_frontmatter(markdown: &str, diagnostics: &mut Vec<Diagnostic>) -> Value {
    let (Some(yaml), _) = split_frontmatter(markdown) else {
        return Value::Null;
    };
    parse_frontmatter(yaml).unwrap_or_else(|e| {
        let message = format!("frontmatter ignored: {e}");
        warn!("{message}");
        diagnostics.push(Diagnostic::warn(message, Some(0)));
        Value::Null
    })
}

struct Assembler<'a> {
    original_id: &'a str,
    context: &'a NoteContext,
    labels: &'a Labels,
    note_hash: &'a str,
}

impl Assembler<'_> {
    fn chunk(
        &self,
        index: usize,
        block: ParsedBlock,
        ids: &mut ChunkIdAllocator,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Chunk {
        let embedding_text = build_embedding_text(
            &block.heading_path,
            block.parent_item_text.as_deref(),
            &block.text,
        );
        let content_hash = content_hash(&embedding_text);
        let candidate = extract_block_id(&block.text).unwrap_or_else(|| content_hash.clone());

        let (chunk_id, collided) = ids.allocate(&candidate);
        if collided {
            let message = format!("duplicate chunk id {candidate}; renamed to {chunk_id}");
            warn!("{message}");
            diagnostics.push(Diagnostic::warn(message, Some(block.span.start.line)));
        }

        let section = block.heading_path.last().cloned().unwrap_or_default();
        let meta = ChunkPayloadMeta {
            original_id: self.original_id.to_string(),
            chunk_id: chunk_id.clone(),
            note_hash: self.note_hash.to_string(),
            content_hash,
            chunk_type: block.block_type,
            chunk_index: index,
            section: section.clone(),
            headings_path: block.heading_path.clone(),
            list_depth: block.list_depth,
            item_index: block.item_index,
            parent_item_text: block.parent_item_text.clone(),
            prev_chunk_id: None,
            next_chunk_id: None,
            document_path: self.context.note_path.clone(),
            tags: self.labels.tags.clone(),
            aliases: self.labels.aliases.clone(),
            created_at_ts: millis(self.context.created_at),
            updated_at_ts: millis(self.context.updated_at),
        };

        Chunk {
            chunk_id,
            chunk_type: block.block_type,
            headings_path: block.heading_path,
            section,
            content_raw: block.text,
            content_for_embedding: embedding_text,
            meta,
            span: block.span,
        }
    }
}

fn millis(at: Option<DateTime<Utc>>) -> i64 {
    at.map_or(0, |t| t.timestamp_millis())
}

fn link_neighbours(chunks: &mut [Chunk]) {
    let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.meta.prev_chunk_id = i.checked_sub(1).map(|p| ids[p].clone());
        chunk.meta.next_chunk_id = ids.get(i + 1).cloned();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::BlockType;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn context() -> NoteContext {
        NoteContext::new("notes/test.md", "20240101120000")
    }

    fn chunk(markdown: &str) -> ChunkReport {
        chunk_markdown(markdown, &context(), &ChunkOptions::default()).expect("Should chunk")
    }

    #[test]
    fn test_missing_identity_is_the_only_error() {
        let mut ctx = context();
        ctx.original_id = None;

        let result = chunk_note("text", &ctx, &ChunkOptions::default(), None);

        assert!(matches!(result, Err(Error::MissingDocumentIdentity)));
    }

    #[test]
    fn test_metadata_and_links() {
        let report = chunk("# Guide\n\n## Setup\n\nInstall it.\n\nRun it.\n");
        let chunks = &report.chunks;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section, "Setup");
        assert_eq!(chunks[0].headings_path, vec!["Guide", "Setup"]);
        assert_eq!(chunks[0].content_for_embedding, "H: Guide > Setup. Install it.");
        assert_eq!(chunks[0].meta.chunk_index, 0);
        assert_eq!(chunks[0].meta.prev_chunk_id, None);
        assert_eq!(chunks[0].meta.next_chunk_id.as_deref(), Some(chunks[1].chunk_id.as_str()));
        assert_eq!(chunks[1].meta.prev_chunk_id.as_deref(), Some(chunks[0].chunk_id.as_str()));
        assert_eq!(chunks[1].meta.next_chunk_id, None);
        assert_eq!(chunks[0].meta.original_id, "20240101120000");
        assert_eq!(chunks[0].meta.document_path, "notes/test.md");
        assert_eq!(chunks[0].meta.note_hash, report.note_hash);
        assert_eq!(chunks[0].chunk_id, chunks[0].meta.content_hash);
    }

    #[test]
    fn test_block_reference_pins_id() {
        let report = chunk("para1 ^(abc123)\n\npara2\n");

        assert_eq!(report.chunks[0].chunk_id, "^(abc123)");
        assert_eq!(report.chunks[0].content_for_embedding, "para1");
        assert_eq!(report.chunks[1].chunk_id.len(), 64);
    }

    #[test]
    fn test_duplicate_content_gets_suffixed_ids() {
        let report = chunk("Same text.\n\nSame text.\n\nSame text.\n");
        let ids: Vec<&str> = report.chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        let base = ids[0];

        assert_eq!(ids, vec![base.to_string(), format!("{base}-2"), format!("{base}-3")]);
        assert!(report.chunks.iter().all(|c| c.meta.content_hash == base));
        assert_eq!(report.diagnostics.len(), 2);
    }

    #[test]
    fn test_labels_fall_back_to_frontmatter() {
        let markdown = "---\ntags: [rust, '#notes']\naliases: Home\n---\nBody text.\n";

        let report = chunk(markdown);
        assert_eq!(report.chunks[0].meta.tags, vec!["rust", "notes"]);
        assert_eq!(report.chunks[0].meta.aliases, vec!["Home"]);

        let ctx = context().with_tags(vec!["explicit".to_string()]);
        let report = chunk_markdown(markdown, &ctx, &ChunkOptions::default()).unwrap();
        assert_eq!(report.chunks[0].meta.tags, vec!["explicit"]);
        assert_eq!(report.chunks[0].meta.aliases, vec!["Home"]);
    }

    #[test]
    fn test_malformed_frontmatter_is_a_diagnostic() {
        let report = chunk("---\ntags: [unclosed\n---\nBody text.\n");

        assert_eq!(report.chunks.len(), 1);
        assert!(report.chunks[0].meta.tags.is_empty());
        assert!(report.diagnostics.iter().any(|d| d.message.starts_with("frontmatter ignored")));
    }

    #[test]
    fn test_timestamps_in_millis() {
        let created = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let ctx = context().with_timestamps(Some(created), None);

        let report = chunk_markdown("Body.", &ctx, &ChunkOptions::default()).unwrap();

        assert_eq!(report.chunks[0].meta.created_at_ts, 1_700_000_000_123);
        assert_eq!(report.chunks[0].meta.updated_at_ts, 0);
    }

    #[test]
    fn test_soft_cap_truncates_in_order() {
        let markdown: String = (0..20).map(|i| format!("Paragraph {i}.\n\n")).collect();
        let options = ChunkOptions {
            max_chunks_soft: 5,
            ..ChunkOptions::default()
        };

        let report = chunk_markdown(&markdown, &context(), &options).unwrap();

        assert_eq!(report.chunks.len(), 5);
        assert_eq!(report.truncated, 15);
        assert_eq!(report.chunks[0].content_raw, "Paragraph 0.");
        assert_eq!(report.chunks[4].content_raw, "Paragraph 4.");
        assert_eq!(report.chunks[4].meta.next_chunk_id, None);
    }

    #[test]
    fn test_list_items_carry_parent_context() {
        let report = chunk("- Fruits with a long description that will not group\n  - apple\n");

        let apple = report
            .chunks
            .iter()
            .find(|c| c.content_raw == "apple")
            .expect("apple chunk");
        assert_eq!(apple.chunk_type, BlockType::ListItem);
        assert_eq!(apple.meta.list_depth, Some(1));
        assert!(apple.content_for_embedding.starts_with("Parent: Fruits"));
    }
}
