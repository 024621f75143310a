//! Reasoning-span filter.
//!
//! Some model families leak internal deliberation wrapped in
//! `<think>...</think>` tags. Nothing inside those tags may ever reach
//! the user, including the unterminated case where the model ran out of
//! tokens mid-thought.

use regex::Regex;
use std::sync::LazyLock;

/// Well-formed `<think>...</think>` spans, case-insensitive, across lines.
static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").unwrap());

/// A `<think>` with no closing tag: everything to end-of-text goes.
static THINK_TAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<think>.*$").unwrap());

/// Runs of three or more newlines left behind by span removal.
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Remove every reasoning span from model output.
///
/// Two passes: well-formed spans first (handles multiple spans), then
/// an unterminated opening marker, which removes everything from the
/// marker to the end of the text. Leftover blank-line runs are
/// collapsed and the boundaries trimmed.
///
/// The function is total and idempotent; text without markers passes
/// through (modulo boundary trimming) unchanged.
pub fn filter_reasoning(text: &str) -> String {
    let closed = THINK_SPAN.replace_all(text, "");
    let open = THINK_TAIL.replace_all(&closed, "");
    let collapsed = BLANK_RUN.replace_all(&open, "\n\n");
    collapsed.trim().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_think_block() {
        let text = "<think>This is internal reasoning</think>\nThe lamp has been turned off.";
        let result = filter_reasoning(text);
        assert_eq!(result, "The lamp has been turned off.");
        assert!(!result.contains("<think>"));
    }

    #[test]
    fn test_multiple_think_blocks() {
        let text =
            "<think>First reasoning</think>\nSome content\n<think>Second reasoning</think>\nMore content";
        let result = filter_reasoning(text);
        assert!(!result.contains("<think>"));
        assert!(!result.contains("</think>"));
        assert!(result.contains("Some content"));
        assert!(result.contains("More content"));
    }

    #[test]
    fn test_multiline_think_block() {
        let text = "<think>\nStep 1: consider the request\nStep 2: pick a tool\n</think>\nDone.";
        let result = filter_reasoning(text);
        assert_eq!(result, "Done.");
    }

    #[test]
    fn test_unterminated_think_removes_to_end() {
        let text = "Here you go.\n<think>the user wants me to keep going but I ran out";
        let result = filter_reasoning(text);
        assert_eq!(result, "Here you go.");
    }

    #[test]
    fn test_unterminated_think_only() {
        let text = "<think>nothing but reasoning here";
        assert_eq!(filter_reasoning(text), "");
    }

    #[test]
    fn test_no_think_blocks() {
        let text = "This is a normal response without any think blocks.";
        assert_eq!(filter_reasoning(text), text);
    }

    #[test]
    fn test_empty_think_block() {
        let text = "<think></think>\nResponse text";
        assert_eq!(filter_reasoning(text), "Response text");
    }

    #[test]
    fn test_case_insensitive_markers() {
        let text = "<THINK>loud reasoning</THINK>\nQuiet reply.";
        assert_eq!(filter_reasoning(text), "Quiet reply.");
    }

    #[test]
    fn test_collapses_blank_runs() {
        let text = "Before\n<think>reasoning</think>\n\n\n\nAfter";
        let result = filter_reasoning(text);
        assert_eq!(result, "Before\n\nAfter");
    }

    #[test]
    fn test_idempotent() {
        let cases = [
            "<think>a</think>\nReply",
            "Reply\n<think>unterminated",
            "Plain reply",
            "",
            "<think>only</think>",
        ];
        for text in cases {
            let once = filter_reasoning(text);
            let twice = filter_reasoning(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", text);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(filter_reasoning(""), "");
        assert_eq!(filter_reasoning("   \n  "), "");
    }
}
