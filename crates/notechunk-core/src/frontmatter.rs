//! Leading YAML frontmatter: detection, stripping and tag/alias extraction.

use crate::Result;
use serde_json::Value;
use std::ops::Range;

const BOM: char = '\u{feff}';

/// Byte range of a leading `---` … `---` (or `...`) block, closing fence and
/// its line break included.
pub fn frontmatter_range(text: &str) -> Option<Range<usize>> {
    let start = if text.starts_with(BOM) { BOM.len_utf8() } else { 0 };
    let body = &text[start..];

    let first_line_end = body.find('\n')?;
    if body[..first_line_end].trim_end() != "---" {
        return None;
    }

    let mut pos = start + first_line_end + 1;
    while pos <= text.len() {
        let rest = &text[pos..];
        let line_end = rest.find('\n').map_or(text.len(), |i| pos + i);
        let line = text[pos..line_end].trim_end();
        if line == "---" || line == "..." {
            let end = (line_end + 1).min(text.len());
            return Some(0..end);
        }
        if line_end >= text.len() {
            break;
        }
        pos = line_end + 1;
    }
    None
}

/// Split `text` into the YAML body (fences excluded) and the remaining document.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(range) = frontmatter_range(text) else {
        return (None, text);
    };
    let block = &text[range.clone()];
    let yaml = block
        .trim_start_matches(BOM)
        .split_once('\n')
        .map_or("", |(_, rest)| rest);
    let yaml = yaml
        .trim_end()
        .trim_end_matches("---")
        .trim_end_matches("...")
        .trim_end();
    (Some(yaml), &text[range.end..])
}

/// Parse a YAML body into a JSON value (empty body ⇒ `null`).
pub fn parse_frontmatter(yaml: &str) -> Result<Value> {
    if yaml.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Tags from `tags`/`tag`; a leading `#` is dropped.
pub fn tags_from(frontmatter: &Value) -> Vec<String> {
    string_list(frontmatter, &["tags", "tag"])
        .into_iter()
        .map(|t| t.trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Aliases from `aliases`/`alias`.
pub fn aliases_from(frontmatter: &Value) -> Vec<String> {
    string_list(frontmatter, &["aliases", "alias"])
}

/// First present key wins; accepts a sequence, a single string or a
/// comma-separated string.
fn string_list(frontmatter: &Value, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|key| frontmatter.get(*key)) else {
        return Vec::new();
    };
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
