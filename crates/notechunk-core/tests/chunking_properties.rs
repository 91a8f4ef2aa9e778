#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

use notechunk_core::structure::{HeadingEntry, ListItemSpan, Region, RegionKind};
use notechunk_core::{
    BlockType, Chunk, ChunkOptions, NoteContext, Position, Span, StructureCache, chunk_markdown,
    chunk_note,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn context() -> NoteContext {
    NoteContext::new("vault/note.md", "20240101120000")
}

fn chunks_with(markdown: &str, options: &ChunkOptions) -> Vec<Chunk> {
    chunk_markdown(markdown, &context(), options)
        .expect("Should chunk")
        .chunks
}

fn chunks(markdown: &str) -> Vec<Chunk> {
    chunks_with(markdown, &ChunkOptions::default())
}

fn raw(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.content_raw.as_str()).collect()
}

#[test]
fn test_embeds_produce_no_chunks() {
    let out = chunks("Normal paragraph.\n\n![[Home#^x]]\n\nAnother paragraph.");

    assert_eq!(raw(&out), vec!["Normal paragraph.", "Another paragraph."]);
}

#[test]
fn test_horizontal_rules_produce_no_chunks() {
    let out = chunks("First part.\n\n---\n\nSecond part.\n\n---\n\nThird part.\n");

    assert_eq!(raw(&out), vec!["First part.", "Second part.", "Third part."]);
}

#[test]
fn test_callouts_produce_no_chunks() {
    let out = chunks("Intro text.\n\n> [!note]\n> Remember the milk.\n\nOutro text.\n");

    assert_eq!(raw(&out), vec!["Intro text.", "Outro text."]);
}

#[test]
fn test_short_list_items_group_long_item_stands_alone() {
    // Given: Five short siblings and one long item under one heading
    let markdown = "# Groceries\n\n- eggs\n- milk\n- rice\n- tea\n- salt\n- a rather long item that should stay alone\n";
    let options = ChunkOptions {
        list_short_char_threshold: 10,
        list_group_min: 3,
        list_group_max: 7,
        ..ChunkOptions::default()
    };

    // When: Chunking
    let out = chunks_with(markdown, &options);

    // Then: One group with five bullet lines plus one standalone item
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].chunk_type, BlockType::ListGroup);
    assert_eq!(out[0].content_raw, "• eggs\n• milk\n• rice\n• tea\n• salt");
    assert_eq!(out[0].content_raw.lines().count(), 5);
    assert_eq!(out[1].chunk_type, BlockType::ListItem);
    assert_eq!(out[1].content_raw, "a rather long item that should stay alone");
    assert_eq!(out[0].section, "Groceries");
}

#[test]
fn test_long_paragraph_splits_with_two_sentence_overlap() {
    let markdown = "Sentence. ".repeat(120);
    let options = ChunkOptions {
        long_paragraph_word_threshold: 10,
        ..ChunkOptions::default()
    };

    let out = chunks_with(&markdown, &options);

    assert!(out.len() >= 2);
    assert!(out.iter().all(|c| c.chunk_type == BlockType::Paragraph));
    for pair in out.windows(2) {
        let words: Vec<&str> = pair[0].content_raw.split(' ').collect();
        let tail = words[words.len() - 2..].join(" ");
        assert!(
            pair[1].content_raw.starts_with(&tail),
            "{:?} does not start with {tail:?}",
            pair[1].content_raw
        );
    }
    let ids: std::collections::HashSet<&str> = out.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids.len(), out.len());
}

#[test]
fn test_block_reference_wins_over_hash() {
    let out = chunks("para1 ^(abc123)\n\npara2\n");

    assert_eq!(out[0].chunk_id, "^(abc123)");
    assert_eq!(out[1].chunk_id.len(), 64);
    assert!(out[1].chunk_id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_soft_cap_keeps_first_blocks_in_order() {
    let markdown: String = (0..200).map(|i| format!("Block number {i}.\n\n")).collect();

    let out = chunks(&markdown);

    assert_eq!(out.len(), 50);
    for (i, chunk) in out.iter().enumerate() {
        assert_eq!(chunk.content_raw, format!("Block number {i}."));
        assert_eq!(chunk.meta.chunk_index, i);
    }
}

#[test]
fn test_heading_insert_changes_ids_below() {
    let before = chunks("Body text.\n");
    let after = chunks("# New heading\n\nBody text.\n");

    assert_ne!(before[0].chunk_id, after[0].chunk_id);
    assert_eq!(before[0].content_raw, after[0].content_raw);
}

#[test]
fn test_cosmetic_whitespace_keeps_ids() {
    let a = chunks("Some   text\nwrapped here.\n");
    let b = chunks("Some text wrapped\nhere.\n");

    assert_eq!(a[0].chunk_id, b[0].chunk_id);
}

#[test]
fn test_external_cache_is_honoured() {
    // Given: A host editor cache with 0-based lines and byte offsets
    let markdown = "# Title\n\nFirst.\n\nSecond.\n";
    let span = |start: usize, end: usize, line: usize| {
        Span::new(Position::new(line, start), Position::new(line, end))
    };
    let cache = StructureCache {
        sections: vec![
            Region::new(RegionKind::Heading, span(0, 7, 0)),
            Region::new(RegionKind::Paragraph, span(9, 15, 2)),
            Region::new(RegionKind::Paragraph, span(17, 24, 4)),
        ],
        list_items: Vec::<ListItemSpan>::new(),
        headings: vec![HeadingEntry {
            title: "Title".to_string(),
            level: 1,
            span: span(0, 7, 0),
        }],
    };

    // When: Chunking against it
    let out = chunk_note(markdown, &context(), &ChunkOptions::default(), Some(&cache)).unwrap();

    // Then: Regions and heading paths come from the cache
    assert_eq!(raw(&out), vec!["First.", "Second."]);
    assert!(out.iter().all(|c| c.headings_path == vec!["Title".to_string()]));
}

#[test]
fn test_stale_cache_still_chunks_document() {
    // Given: A cache whose only region lies past the end of the current text
    let cache = StructureCache {
        sections: vec![Region::new(
            RegionKind::Paragraph,
            Span::new(Position::new(30, 500), Position::new(31, 600)),
        )],
        list_items: Vec::new(),
        headings: Vec::new(),
    };

    // When: Chunking with that cache
    let out = chunk_note("Short doc.\n", &context(), &ChunkOptions::default(), Some(&cache))
        .unwrap();

    // Then: The note is indexed as one paragraph instead of vanishing
    assert_eq!(raw(&out), vec!["Short doc."]);
    assert_eq!(out[0].chunk_type, BlockType::Paragraph);
}

const FRAGMENTS: &[&str] = &[
    "# Heading one",
    "## Sub heading",
    "Plain paragraph text.",
    "Another paragraph with **bold** and [a link](https://example.com).",
    "- item a\n- item b\n- item c",
    "- parent\n  - child one\n  - child two",
    "1. first\n2. second",
    "```rust\nfn main() {}\n```",
    "| a | b |\n|---|---|\n| 1 | 2 |",
    "> quoted line",
    "> [!tip] Callout",
    "---",
    "![[embed.png]]",
    "[[Just a link]]",
    "Pinned paragraph ^pin123",
    "Duplicate text.",
    "Duplicate text.",
    "Sentence one here. Sentence two here. Sentence three here. Sentence four here.",
    "Привет мир. Это тест.",
];

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..16).prop_map(|parts| parts.join("\n\n"))
}

proptest! {
    #[test]
    fn test_chunking_is_deterministic(markdown in document()) {
        let options = ChunkOptions {
            long_paragraph_word_threshold: 6,
            ..ChunkOptions::default()
        };
        let first = chunks_with(&markdown, &options);
        let second = chunks_with(&markdown, &options);

        let ids = |c: &[Chunk]| c.iter().map(|x| x.chunk_id.clone()).collect::<Vec<_>>();
        prop_assert_eq!(ids(&first), ids(&second));
        prop_assert_eq!(raw(&first), raw(&second));
    }

    #[test]
    fn test_chunk_invariants(markdown in document()) {
        let out = chunks(&markdown);

        let unique: std::collections::HashSet<&str> = out.iter().map(|c| c.chunk_id.as_str()).collect();
        prop_assert_eq!(unique.len(), out.len());

        for (i, chunk) in out.iter().enumerate() {
            prop_assert_eq!(chunk.meta.chunk_index, i);
            prop_assert_eq!(&chunk.meta.chunk_id, &chunk.chunk_id);
            prop_assert_eq!(
                chunk.meta.prev_chunk_id.as_deref(),
                i.checked_sub(1).map(|p| out[p].chunk_id.as_str())
            );
            prop_assert_eq!(
                chunk.meta.next_chunk_id.as_deref(),
                out.get(i + 1).map(|n| n.chunk_id.as_str())
            );
            if chunk.chunk_type != BlockType::ListGroup {
                prop_assert_eq!(
                    &markdown[chunk.span.start.offset..chunk.span.end.offset],
                    chunk.content_raw.as_str()
                );
            }
        }
    }

    #[test]
    fn test_arbitrary_cache_never_fails(
        markdown in "[a-zé# \\-\n.>*]{0,120}",
        spans in prop::collection::vec((0usize..200, 0usize..200, 0usize..9), 0..12),
    ) {
        let kinds = [
            RegionKind::Heading,
            RegionKind::Paragraph,
            RegionKind::List,
            RegionKind::Code,
            RegionKind::Table,
            RegionKind::Blockquote,
            RegionKind::Yaml,
            RegionKind::Comment,
            RegionKind::Other,
        ];
        let regions = spans
            .iter()
            .map(|(a, b, k)| Region::new(kinds[*k], Span::new(Position::new(0, *a), Position::new(0, *b))))
            .collect();
        let items = spans
            .iter()
            .map(|(a, b, _)| ListItemSpan { span: Span::new(Position::new(0, *b), Position::new(0, *a + *b)) })
            .collect();
        let cache = StructureCache { sections: regions, list_items: items, headings: vec![] };

        let result = chunk_note(&markdown, &context(), &ChunkOptions::default(), Some(&cache));

        prop_assert!(result.is_ok());
    }
}
