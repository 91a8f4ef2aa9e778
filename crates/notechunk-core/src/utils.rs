//! Utility functions for safe string operations

/// Safely truncate a string at a valid UTF-8 boundary
///
/// # Examples
/// ```
/// use notechunk_core::utils::safe_truncate;
///
/// let text = "Hello 世界";
/// assert_eq!(safe_truncate(text, 5), "Hello");
/// assert_eq!(safe_truncate(text, 8), "Hello "); // Won't cut in middle of 世
/// ```
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    &s[..floor_char_boundary(s, max_bytes)]
}

/// Nearest valid UTF-8 boundary at or before `target_pos`
pub fn floor_char_boundary(s: &str, target_pos: usize) -> usize {
    if target_pos >= s.len() {
        return s.len();
    }
    let mut pos = target_pos;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Nearest valid UTF-8 boundary at or after `target_pos`
pub fn ceil_char_boundary(s: &str, target_pos: usize) -> usize {
    if target_pos >= s.len() {
        return s.len();
    }
    let mut pos = target_pos;
    while pos < s.len() && !s.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

/// Number of whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Rough token estimate: one token per four characters, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_ascii() {
        let text = "Hello, World!";
        assert_eq!(safe_truncate(text, 5), "Hello");
        assert_eq!(safe_truncate(text, 100), "Hello, World!");
        assert_eq!(safe_truncate(text, 0), "");
    }

    #[test]
    fn test_safe_truncate_unicode() {
        let text = "Hello 世界";
        assert_eq!(safe_truncate(text, 6), "Hello ");
        assert_eq!(safe_truncate(text, 7), "Hello "); // Won't cut 世 in half
        assert_eq!(safe_truncate(text, 9), "Hello 世");
    }

    #[test]
    fn test_char_boundaries() {
        let text = "Привет"; // two bytes per char
        assert_eq!(floor_char_boundary(text, 3), 2);
        assert_eq!(ceil_char_boundary(text, 3), 4);
        assert_eq!(floor_char_boundary(text, 0), 0);
        assert_eq!(ceil_char_boundary(text, 100), text.len());
    }

    #[test]
    fn test_word_count_and_tokens() {
        assert_eq!(word_count("  one two\nthree\t four "), 4);
        assert_eq!(word_count(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }
}
