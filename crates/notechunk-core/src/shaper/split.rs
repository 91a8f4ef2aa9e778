use crate::utils::{estimate_tokens, word_count};
use crate::{BlockType, ChunkOptions, ParsedBlock, Position, Span};
use std::ops::Range;
use tracing::debug;

/// Closing characters allowed between sentence punctuation and the gap.
const CLOSERS: [char; 8] = ['"', '\'', '”', '’', ')', ']', '»', '*'];
/// Opening characters allowed between the gap and the next sentence.
const OPENERS: [char; 7] = ['"', '\'', '“', '‘', '(', '«', '*'];

/// Byte ranges of the sentences in `text`, whitespace excluded.
///
/// A boundary follows `.`, `!` or `?` (plus any closing quotes/brackets)
/// when whitespace and then an uppercase letter or a digit come next.
/// `char::is_uppercase` covers Latin and Cyrillic alike.
pub fn split_sentences(text: &str) -> Vec<Range<usize>> {
    let mut sentences = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut start: Option<usize> = None;

    while let Some((i, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, closer)) = chars.peek() {
            if !CLOSERS.contains(&closer) {
                break;
            }
            end = j + closer.len_utf8();
            chars.next();
        }

        let gap = &text[end..];
        let after_gap = gap.trim_start();
        let has_gap = after_gap.len() < gap.len();
        let opens_sentence = after_gap
            .trim_start_matches(OPENERS)
            .chars()
            .next()
            .is_some_and(|next| next.is_uppercase() || next.is_ascii_digit());

        if has_gap && opens_sentence {
            if let Some(s) = start.take() {
                sentences.push(s..end);
            }
        }
    }

    if let Some(s) = start {
        let end = s + text[s..].trim_end().len();
        if end > s {
            sentences.push(s..end);
        }
    }
    sentences
}

/// Halving windows over `total` sentences, each overlapping the previous
/// one by `overlap` sentences.
fn sentence_windows(total: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let remaining = total - start;
        let end = (start + remaining.div_ceil(2))
            .max(start + overlap + 1)
            .min(total);
        windows.push(start..end);
        if end == total {
            break;
        }
        start = end - overlap;
    }
    windows
}

fn is_long(block: &ParsedBlock, options: &ChunkOptions) -> bool {
    block.block_type == BlockType::Paragraph
        && (word_count(&block.text) > options.long_paragraph_word_threshold
            || estimate_tokens(&block.text) > options.long_paragraph_token_ceiling)
}

/// Split every over-long paragraph into overlapping sentence windows.
pub fn split_long_paragraphs(blocks: Vec<ParsedBlock>, options: &ChunkOptions) -> Vec<ParsedBlock> {
    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        if is_long(&block, options) {
            out.extend(split_block(block, options.sentence_overlap));
        } else {
            out.push(block);
        }
    }
    out
}

fn split_block(block: ParsedBlock, overlap: usize) -> Vec<ParsedBlock> {
    let sentences = split_sentences(&block.text);
    if sentences.len() <= overlap + 1 {
        return vec![block];
    }

    let windows = sentence_windows(sentences.len(), overlap);
    debug!(
        sentences = sentences.len(),
        pieces = windows.len(),
        line = block.span.start.line,
        "Split long paragraph"
    );

    windows
        .into_iter()
        .map(|window| {
            let start = sentences[window.start].start;
            let end = sentences[window.end - 1].end;
            ParsedBlock::new(
                BlockType::Paragraph,
                &block.text[start..end],
                Span::new(position_in(&block, start), position_in(&block, end)),
            )
            .with_heading_path(block.heading_path.clone())
        })
        .collect()
}

/// Document position of byte `offset` within `block.text`.
fn position_in(block: &ParsedBlock, offset: usize) -> Position {
    let newlines = block.text[..offset].matches('\n').count();
    Position::new(
        block.span.start.line + newlines,
        block.span.start.offset + offset,
    )
}
