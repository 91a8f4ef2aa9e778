//! Text normalization shared by embedding text and note hashing.

use crate::frontmatter::split_frontmatter;
use regex::Regex;
use std::sync::LazyLock;

/// `*text*` with no inner whitespace at either edge.
///
/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static STAR_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").unwrap());

/// `_text_` not embedded in an identifier such as `snake_case_name`.
///
/// SAFETY: Pattern is a compile-time constant.
#[allow(clippy::unwrap_used)]
static UNDERSCORE_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^A-Za-z0-9_])_([^_\s](?:[^_]*[^_\s])?)_([^A-Za-z0-9_]|$)").unwrap()
});

const PAIRED_MARKERS: [&str; 4] = ["**", "__", "~~", "=="];

/// Canonical form of a markdown fragment for embedding and hashing.
///
/// Frontmatter is dropped, `[label](url)` becomes `label (url)`, wikilinks
/// and embeds become their display text, emphasis/highlight/strikethrough
/// markers are removed and whitespace runs collapse to one space.
pub fn normalize_text(text: &str) -> String {
    let (_, body) = split_frontmatter(text);
    let linked = rewrite_links(body);
    let plain = strip_emphasis(&linked);
    collapse_whitespace(&plain)
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_emphasis(text: &str) -> String {
    let mut out = text.to_string();
    for marker in PAIRED_MARKERS {
        if out.contains(marker) {
            out = out.replace(marker, "");
        }
    }
    let out = STAR_EMPHASIS.replace_all(&out, "$1");
    UNDERSCORE_EMPHASIS
        .replace_all(&out, "${1}${2}${3}")
        .into_owned()
}

/// Rewrite markdown links, images, wikilinks and embeds in one byte scan.
///
/// Every marker is ASCII, so untouched text is copied as whole `&str`
/// slices and multi-byte characters pass through intact.
pub fn rewrite_links(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let embed = bytes[i] == b'!' && bytes.get(i + 1) == Some(&b'[');
        let open = if embed { i + 1 } else { i };
        if bytes.get(open) != Some(&b'[') {
            i += 1;
            continue;
        }

        let replacement = if bytes.get(open + 1) == Some(&b'[') {
            find_wikilink(bytes, open).map(|end| (wikilink_display(&input[open + 2..end]), end + 2))
        } else {
            find_markdown_link(bytes, open).map(|(label_end, link_end)| {
                let label = input[open + 1..label_end].trim();
                let url = input[label_end + 2..link_end].trim();
                let rendered = match (label.is_empty(), url.is_empty()) {
                    (_, true) => label.to_string(),
                    (true, false) => url.to_string(),
                    (false, false) => format!("{label} ({url})"),
                };
                (rendered, link_end + 1)
            })
        };

        match replacement {
            Some((rendered, next)) => {
                output.push_str(&input[copied..i]);
                output.push_str(&rendered);
                copied = next;
                i = next;
            },
            None => i = open + 1,
        }
    }

    output.push_str(&input[copied..]);
    output
}

/// `[[target|alias]]` shows `alias`; `[[target]]` shows `target`.
fn wikilink_display(inner: &str) -> String {
    let display = inner.rsplit_once('|').map_or(inner, |(_, alias)| alias);
    display.trim().to_string()
}

/// Index of the first `]` of the closing `]]` for a wikilink opening at `start`.
fn find_wikilink(bytes: &[u8], start: usize) -> Option<usize> {
    let mut idx = start + 2;
    while idx + 1 < bytes.len() {
        match bytes[idx] {
            b'\n' => return None,
            b']' if bytes[idx + 1] == b']' => return Some(idx),
            _ => idx += 1,
        }
    }
    None
}

fn find_markdown_link(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b']' => {
                if idx + 1 < bytes.len() && bytes[idx + 1] == b'(' {
                    if let Some(close_paren) = find_matching_paren(bytes, idx + 2) {
                        return Some((idx, close_paren));
                    }
                }
                return None;
            },
            _ => idx += 1,
        }
    }
    None
}

fn find_matching_paren(bytes: &[u8], mut pos: usize) -> Option<usize> {
    let mut depth = 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
                pos += 1;
            },
            _ => pos += 1,
        }
    }
    None
}
