//! Drops blocks that carry no indexable signal.

use crate::{BlockType, ParsedBlock};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static EMBED_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^!\[\[[^\]\n]*\]\]$").unwrap());

/// Thematic break: three or more of the same marker, spaces allowed between.
///
/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap());

/// `> [!type]`, optionally folded with `+`/`-`.
///
/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static CALLOUT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s*\[![A-Za-z0-9_-]+\][+-]?").unwrap());

/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static BLOCK_REF_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\^[A-Za-z0-9_-]+|\^\([A-Za-z0-9_-]+\))$").unwrap());

/// Wikilinks, embeds, markdown links/images and trailing block refs.
///
/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static LINK_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!?\[\[[^\]\n]*\]\]|!?\[[^\]\n]*\]\([^)\n]*\)|(?:^|\s)\^\(?[A-Za-z0-9_-]{3,}\)?\s*$")
        .unwrap()
});

/// Whether a block survives filtering.
pub fn is_indexable(block: &ParsedBlock) -> bool {
    let trimmed = block.text.trim();
    if trimmed.is_empty() {
        return false;
    }

    match block.block_type {
        BlockType::Code | BlockType::Table | BlockType::ListGroup => true,
        BlockType::Quote => !is_callout(trimmed),
        BlockType::Paragraph | BlockType::ListItem => !is_noise(trimmed),
    }
}

/// Keep indexable blocks, preserving order.
pub fn filter_blocks(blocks: Vec<ParsedBlock>) -> Vec<ParsedBlock> {
    let before = blocks.len();
    let kept: Vec<ParsedBlock> = blocks.into_iter().filter(is_indexable).collect();
    if kept.len() != before {
        debug!(dropped = before - kept.len(), kept = kept.len(), "Filtered blocks");
    }
    kept
}

fn is_noise(trimmed: &str) -> bool {
    EMBED_ONLY.is_match(trimmed)
        || HORIZONTAL_RULE.is_match(trimmed)
        || BLOCK_REF_ONLY.is_match(trimmed)
        || is_callout(trimmed)
        || is_link_only(trimmed)
}

/// A quote whose first line is a callout header and whose every line is
/// quoted. Callout bodies are presentation chrome in the notes this targets.
fn is_callout(trimmed: &str) -> bool {
    CALLOUT_HEADER.is_match(trimmed)
        && trimmed
            .lines()
            .map(str::trim_start)
            .filter(|line| !line.is_empty())
            .all(|line| line.starts_with('>'))
}

/// Only links (and punctuation) with no prose of their own.
fn is_link_only(trimmed: &str) -> bool {
    if !LINK_LIKE.is_match(trimmed) {
        return false;
    }
    let rest = LINK_LIKE.replace_all(trimmed, " ");
    !rest.chars().any(char::is_alphanumeric)
}
