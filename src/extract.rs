//! Best-effort extraction of a code payload from model response text.
//!
//! Model output is prose-shaped even when asked for code only: fences may be
//! missing a closing marker, carry the wrong language tag, or be surrounded by
//! explanation. Extraction therefore degrades gracefully instead of failing —
//! a worst case of "the whole trimmed response" is preferred over losing the
//! file downstream.

use std::sync::LazyLock;

use regex::Regex;

use crate::gemini::ERROR_MARKER;

/// Well-formed fenced block: optional language tag, closing fence on its own line.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:\w+)?[ \t]*\n(.*?)\n```").expect("static fence pattern is valid")
});

/// Looser variant that tolerates a missing newline before the closing fence
/// (or a missing closing fence line entirely, when the input ends with ```).
static LOOSE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:\w+)?(.*?)```").expect("static fence pattern is valid"));

/// Extract the first fenced code block from `text`.
///
/// Returns the empty string for empty input or invoker error sentinels. If no
/// fence is found at all, the whole trimmed input is returned. When the
/// response contains several fenced blocks only the first is used; trailing
/// blocks are ignored by design.
pub fn extract_code_block(text: &str) -> String {
    if text.is_empty() || text.starts_with(ERROR_MARKER) {
        return String::new();
    }

    if let Some(captures) = FENCED_BLOCK.captures(text) {
        return captures[1].trim().to_string();
    }

    if let Some(captures) = LOOSE_BLOCK.captures(text) {
        return captures[1].trim().to_string();
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_block() {
        let text = "Here is the code:\n```rust\nfn main() {}\n```\nHope it helps!";
        assert_eq!(extract_code_block(text), "fn main() {}");
    }

    #[test]
    fn test_extracts_block_without_language_tag() {
        let text = "```\nprint('hello')\n```";
        assert_eq!(extract_code_block(text), "print('hello')");
    }

    #[test]
    fn test_first_block_wins() {
        let text = "```python\nblock_a = 1\n```\n\nAnd another:\n\n```python\nblock_b = 2\n```";
        assert_eq!(extract_code_block(text), "block_a = 1");
    }

    #[test]
    fn test_preserves_internal_newlines() {
        let text = "```go\nfunc a() {}\n\nfunc b() {}\n```";
        assert_eq!(extract_code_block(text), "func a() {}\n\nfunc b() {}");
    }

    #[test]
    fn test_missing_closing_newline_uses_loose_pattern() {
        let text = "```js\nconst x = 1;```";
        assert_eq!(extract_code_block(text), "const x = 1;");
    }

    #[test]
    fn test_no_fence_returns_trimmed_input() {
        let text = "  just some code with no fences\n";
        assert_eq!(extract_code_block(text), "just some code with no fences");
    }

    #[test]
    fn test_empty_input_returns_empty() {
        assert_eq!(extract_code_block(""), "");
    }

    #[test]
    fn test_error_sentinel_returns_empty() {
        assert_eq!(extract_code_block("Error: could not get a response"), "");
    }

    #[test]
    fn test_extraction_is_idempotent_on_fence_free_text() {
        let text = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let once = extract_code_block(text);
        let twice = extract_code_block(&once);
        assert_eq!(once, twice);
    }
}
