//! Embedding text, content hashes and chunk/record identity.

use crate::normalize::normalize_text;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// Trailing author block reference: `^token` or `^(token)`, 3+ id chars.
///
/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static BLOCK_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\^\([A-Za-z0-9_-]{3,}\)|\^[A-Za-z0-9_-]{3,})\s*$").unwrap()
});

/// Lowercase hex sha256 of `text` (64 characters).
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
        // Writing to String never fails
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Explicit block reference at the end of `text`, verbatim (`^(abc123)`).
pub fn extract_block_id(text: &str) -> Option<String> {
    BLOCK_REF
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `text` without its trailing block reference.
pub fn strip_block_id(text: &str) -> &str {
    BLOCK_REF
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| text[..m.start()].trim_end())
}

/// Canonical string embedded and hashed for a block:
/// `"H: a > b. Parent: x. normalized text"`.
pub fn build_embedding_text(
    heading_path: &[String],
    parent_item_text: Option<&str>,
    text: &str,
) -> String {
    let mut out = String::new();

    let headings: Vec<String> = heading_path
        .iter()
        .map(|h| normalize_text(h))
        .filter(|h| !h.is_empty())
        .collect();
    if !headings.is_empty() {
        let _ = write!(out, "H: {}. ", headings.join(" > "));
    }

    if let Some(parent) = parent_item_text.map(normalize_text).filter(|p| !p.is_empty()) {
        let _ = write!(out, "Parent: {parent}. ");
    }

    out.push_str(&normalize_text(strip_block_id(text)));
    out
}

/// Hex sha256 of an embedding text.
pub fn content_hash(embedding_text: &str) -> String {
    sha256_hex(embedding_text)
}

/// Hash of the whole normalized document, frontmatter excluded.
pub fn note_hash(markdown: &str) -> String {
    sha256_hex(&normalize_text(markdown))
}

/// Vector-store record id for a chunk, scoped by document identity.
///
/// The first 16 bytes of `sha256(original_id + "::" + chunk_id)` rendered
/// as a UUID (`8-4-4-4-12`).
pub fn record_id_for(original_id: &str, chunk_id: &str) -> String {
    let digest = sha256_hex(&format!("{original_id}::{chunk_id}"));
    format!(
        "{}-{}-{}-{}-{}",
        &digest[0..8],
        &digest[8..12],
        &digest[12..16],
        &digest[16..20],
        &digest[20..32]
    )
}

/// Hands out run-unique chunk ids; repeats get `-2`, `-3`... in call order.
#[derive(Debug, Default)]
pub struct ChunkIdAllocator {
    seen: HashMap<String, usize>,
}

impl ChunkIdAllocator {
    /// Allocator that has seen no ids yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id to use and whether `candidate` had been seen before.
    pub fn allocate(&mut self, candidate: &str) -> (String, bool) {
        let mut count = self.seen.get(candidate).copied().unwrap_or(0);
        loop {
            count += 1;
            let id = if count == 1 {
                candidate.to_string()
            } else {
                format!("{candidate}-{count}")
            };
            // A suffixed id can itself collide with a later natural id
            // (an author block ref literally named `^abc-2`).
            if count == 1 || !self.seen.contains_key(&id) {
                self.seen.insert(candidate.to_string(), count);
                if count > 1 {
                    self.seen.insert(id.clone(), 1);
                }
                return (id, count > 1);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_block_reference_forms() {
        assert_eq!(extract_block_id("para1 ^(abc123)"), Some("^(abc123)".to_string()));
        assert_eq!(extract_block_id("para ^abc-12_x\n"), Some("^abc-12_x".to_string()));
        assert_eq!(extract_block_id("^solo"), Some("^solo".to_string()));
        assert_eq!(extract_block_id("too short ^ab"), None);
        assert_eq!(extract_block_id("x^abc123"), None);
        assert_eq!(extract_block_id("ref ^abc123 then more"), None);
        assert_eq!(extract_block_id("para2"), None);
    }

    #[test]
    fn test_embedding_text_prefixes() {
        let path = vec!["Guide".to_string(), "[Setup](s.md)".to_string()];

        let text = build_embedding_text(&path, Some("**Parent** item"), "Install  it. ^inst01");

        assert_eq!(text, "H: Guide > Setup (s.md). Parent: Parent item. Install it.");
    }

    #[test]
    fn test_embedding_text_without_context() {
        assert_eq!(build_embedding_text(&[], None, "  plain\ntext "), "plain text");
        assert_eq!(build_embedding_text(&[], Some("   "), "x"), "x");
    }

    #[test]
    fn test_hash_shapes() {
        let hash = content_hash("para2");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let record = record_id_for("20240101", "^(abc123)");
        assert_eq!(record.len(), 36);
        assert_eq!(record.matches('-').count(), 4);
        assert_ne!(record, record_id_for("20240102", "^(abc123)"));
    }

    #[test]
    fn test_note_hash_ignores_cosmetic_whitespace_and_frontmatter() {
        let a = note_hash("---\nupdated: 1\n---\n# T\n\nBody  text\n");
        let b = note_hash("---\nupdated: 2\n---\n# T\nBody text");
        assert_eq!(a, b);
        assert_ne!(a, note_hash("# T\n\nOther text"));
    }

    #[test]
    fn test_collisions_are_suffixed_in_order() {
        let mut ids = ChunkIdAllocator::new();

        assert_eq!(ids.allocate("abc"), ("abc".to_string(), false));
        assert_eq!(ids.allocate("abc"), ("abc-2".to_string(), true));
        assert_eq!(ids.allocate("xyz"), ("xyz".to_string(), false));
        assert_eq!(ids.allocate("abc"), ("abc-3".to_string(), true));
    }

    #[test]
    fn test_suffix_skips_taken_natural_id() {
        let mut ids = ChunkIdAllocator::new();

        ids.allocate("^ref-2");
        ids.allocate("^ref");

        assert_eq!(ids.allocate("^ref").0, "^ref-3");
    }

    proptest! {
        #[test]
        fn test_embedding_text_is_deterministic(
            path in prop::collection::vec("[a-zA-Z ]{0,12}", 0..4),
            parent in prop::option::of("[a-z *_]{0,20}"),
            text in "[a-zA-Z0-9 .,*_\\[\\]()\n]{0,80}",
        ) {
            let first = build_embedding_text(&path, parent.as_deref(), &text);
            let second = build_embedding_text(&path, parent.as_deref(), &text);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(content_hash(&first), content_hash(&second));
        }
    }
}
