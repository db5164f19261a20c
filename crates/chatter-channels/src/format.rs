//! Telegram-safe text: MarkdownV2 escaping and message chunking.
//!
//! Escape first, chunk second. The chunker knows about escape pairs, so a
//! split never lands between a backslash and the character it escapes.

/// Characters MarkdownV2 reserves outside code blocks.
///
/// The backslash is included: it is the escape character itself, so a
/// literal one must be escaped too.
pub const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\\',
];

/// Chunk size used when a reply is over the single-message limit.
///
/// 96 characters below the hard limit, reserved for formatting overhead.
pub const CHUNK_SIZE: usize = 4000;

const FENCE: &str = "```";

enum Segment<'a> {
    Text(&'a str),
    Code(&'a str),
}

/// Cut `text` into plain-text and fenced-code segments.
///
/// A code block runs from an opening fence to the nearest following fence.
/// An opening fence with no closing fence is plain text.
fn split_code_blocks(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let body_start = open + FENCE.len();
        let Some(close) = rest[body_start..].find(FENCE) else {
            break;
        };
        let end = body_start + close + FENCE.len();
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        segments.push(Segment::Code(&rest[open..end]));
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

/// Backslash-escape every reserved character in `text`.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape reserved characters everywhere except inside fenced code blocks.
///
/// Code blocks are lifted out before escaping and put back verbatim, so
/// their bytes are never altered whatever they contain.
pub fn escape_preserving_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for segment in split_code_blocks(text) {
        match segment {
            Segment::Text(t) => out.push_str(&escape_markdown(t)),
            Segment::Code(c) => out.push_str(c),
        }
    }
    out
}

/// Split `text` into chunks of at most `max_len` characters.
///
/// Splits on line boundaries. A line longer than `max_len` on its own is
/// hard-split every `max_len` characters, one character earlier when the cut
/// would separate an escape pair. Lines are accumulated greedily; order is
/// preserved and no chunk is empty.
pub fn chunk(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut current: Option<String> = None;
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let fits = match current {
            Some(_) => current_len + 1 + line_len <= max_len,
            None => line_len <= max_len,
        };

        if fits {
            match current.as_mut() {
                Some(buf) => {
                    buf.push('\n');
                    buf.push_str(line);
                    current_len += 1 + line_len;
                }
                None => {
                    current = Some(line.to_string());
                    current_len = line_len;
                }
            }
            continue;
        }

        if let Some(buf) = current.take() {
            if !buf.is_empty() {
                chunks.push(buf);
            }
        }

        if line_len > max_len {
            hard_split(line, max_len, &mut chunks);
            current_len = 0;
        } else {
            current = Some(line.to_string());
            current_len = line_len;
        }
    }

    if let Some(buf) = current {
        if !buf.is_empty() {
            chunks.push(buf);
        }
    }

    chunks
}

/// Split one line at fixed character offsets, keeping escape pairs whole.
fn hard_split(line: &str, max_len: usize, out: &mut Vec<String>) {
    let chars: Vec<char> = line.chars().collect();
    let n = chars.len();

    // escapes[i]: chars[i] is a backslash escaping chars[i + 1].
    let mut escapes = vec![false; n];
    let mut i = 0;
    while i < n {
        if chars[i] == '\\' && i + 1 < n {
            escapes[i] = true;
            i += 2;
        } else {
            i += 1;
        }
    }

    let mut start = 0;
    while start < n {
        let mut end = (start + max_len).min(n);
        if end < n && end - start > 1 && escapes[end - 1] {
            end -= 1;
        }
        out.push(chars[start..end].iter().collect());
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_all_reserved() {
        let escaped = escape_markdown("_*[]()~`>#+-=|{}.!");
        assert_eq!(escaped, r"\_\*\[\]\(\)\~\`\>\#\+\-\=\|\{\}\.\!");
    }

    #[test]
    fn test_escape_literal_backslash() {
        assert_eq!(
            escape_preserving_code(r"Match a dot with \. in regex"),
            r"Match a dot with \\\. in regex"
        );
        assert_eq!(escape_markdown(r"C:\tmp"), r"C:\\tmp");
    }

    #[test]
    fn test_escape_backslash_kept_in_code_block() {
        let text = "```\nlet re = r\"\\d+\\.\";\n```";
        assert_eq!(escape_preserving_code(text), text);
    }

    #[test]
    fn test_escape_leaves_plain_text() {
        assert_eq!(escape_markdown("hello world 42"), "hello world 42");
        assert_eq!(escape_markdown("привет, мир"), "привет, мир");
    }

    #[test]
    fn test_escape_preserves_code_block() {
        let text = "Use this:\n```rust\nfn main() { let x = a.b(); }\n```\nDone.";
        let out = escape_preserving_code(text);
        assert_eq!(
            out,
            "Use this:\n```rust\nfn main() { let x = a.b(); }\n```\nDone\\."
        );
    }

    #[test]
    fn test_escape_multiple_code_blocks_non_greedy() {
        let text = "a.```x.y```b.```z!```c!";
        let out = escape_preserving_code(text);
        assert_eq!(out, "a\\.```x.y```b\\.```z!```c\\!");
    }

    #[test]
    fn test_escape_code_block_containing_placeholder_like_text() {
        let text = "__CODE_BLOCK_0__ ```__CODE_BLOCK_0__```";
        let out = escape_preserving_code(text);
        assert_eq!(out, "\\_\\_CODE\\_BLOCK\\_0\\_\\_ ```__CODE_BLOCK_0__```");
    }

    #[test]
    fn test_escape_unterminated_fence_is_text() {
        let out = escape_preserving_code("```oops");
        assert_eq!(out, "\\`\\`\\`oops");
    }

    #[test]
    fn test_chunk_short_text_single_chunk() {
        assert_eq!(chunk("hello", 4096), vec!["hello"]);
    }

    #[test]
    fn test_chunk_empty_text_no_chunks() {
        assert!(chunk("", 10).is_empty());
    }

    #[test]
    fn test_chunk_greedy_on_lines() {
        let chunks = chunk("aaa\nbbb\nccc\nddd", 7);
        assert_eq!(chunks, vec!["aaa\nbbb", "ccc\nddd"]);
    }

    #[test]
    fn test_chunk_line_of_exact_limit() {
        let chunks = chunk("ab\nxxxxx\ncd", 5);
        assert_eq!(chunks, vec!["ab", "xxxxx", "cd"]);
    }

    #[test]
    fn test_chunk_hard_splits_long_line() {
        let chunks = chunk("ab\n0123456789abc\ncd", 5);
        assert_eq!(chunks, vec!["ab", "01234", "56789", "abc", "cd"]);
    }

    #[test]
    fn test_chunk_never_splits_escape_pair() {
        let escaped = escape_preserving_code(&format!("{}.", "a".repeat(CHUNK_SIZE - 1)));
        let chunks = chunk(&escaped, CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(CHUNK_SIZE - 1));
        assert_eq!(chunks[1], "\\.");
    }

    #[test]
    fn test_chunk_splits_after_escaped_backslash() {
        // `\\` is one pair; the cut after it is safe.
        let chunks = chunk(r"ab\\cd", 4);
        assert_eq!(chunks, vec![r"ab\\", "cd"]);
        let chunks = chunk(r"abc\.d", 4);
        assert_eq!(chunks, vec!["abc", r"\.d"]);
    }

    #[test]
    fn test_chunk_counts_characters_not_bytes() {
        let line = "é".repeat(6);
        let chunks = chunk(&line, 4);
        assert_eq!(chunks, vec!["éééé", "éé"]);
    }

    #[test]
    fn test_chunk_keeps_trailing_newline() {
        assert_eq!(chunk("abc\n", 10), vec!["abc\n"]);
    }

    #[test]
    fn test_chunk_large_reply_under_limit() {
        let text = "line of text that is reasonably long\n".repeat(300);
        let chunks = chunk(&text, CHUNK_SIZE);
        assert!(chunks.len() >= 3);
        for c in &chunks {
            assert!(c.chars().count() <= CHUNK_SIZE);
            assert!(!c.is_empty());
        }
        assert_eq!(chunks.join("\n"), text);
    }

    fn text_piece() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 _*.!#()\\-\\n]{0,20}"
    }

    proptest! {
        #[test]
        fn prop_code_blocks_untouched(
            pieces in prop::collection::vec((any::<bool>(), text_piece()), 0..8)
        ) {
            let mut input = String::new();
            let mut expected = String::new();
            for (is_code, body) in &pieces {
                if *is_code {
                    let block = format!("```{body}```");
                    input.push_str(&block);
                    expected.push_str(&block);
                } else {
                    input.push_str(body);
                    expected.push_str(&escape_markdown(body));
                }
            }
            prop_assert_eq!(escape_preserving_code(&input), expected);
        }

        #[test]
        fn prop_chunk_round_trips(
            max_len in 2usize..40,
            lines in prop::collection::vec("[a-z ]{0,39}", 0..30)
        ) {
            let lines: Vec<String> = lines
                .into_iter()
                .map(|l| l.chars().take(max_len - 1).collect())
                .collect();
            let text = lines.join("\n");
            let chunks = chunk(&text, max_len);
            for c in &chunks {
                prop_assert!(c.chars().count() <= max_len);
                prop_assert!(!c.is_empty());
            }
            if !text.is_empty() {
                prop_assert_eq!(chunks.join("\n"), text);
            }
        }

        #[test]
        fn prop_hard_split_obeys_bound(max_len in 1usize..20, line in "[a-z]{0,100}") {
            let chunks = chunk(&line, max_len);
            let n = chunks.len();
            for (i, c) in chunks.iter().enumerate() {
                let len = c.chars().count();
                if i + 1 < n {
                    prop_assert_eq!(len, max_len);
                } else {
                    prop_assert!(len <= max_len);
                }
            }
            prop_assert_eq!(chunks.concat(), line);
        }

        #[test]
        fn prop_hard_split_keeps_escape_pairs(
            max_len in 2usize..20,
            raw in "[a-z.!\\\\]{0,100}"
        ) {
            let line = escape_markdown(&raw);
            let chunks = chunk(&line, max_len);
            for c in &chunks {
                prop_assert!(c.chars().count() <= max_len);
                prop_assert!(!ends_mid_escape(c), "chunk {:?} ends mid-escape", c);
            }
            prop_assert_eq!(chunks.concat(), line);
        }
    }

    /// True when the last backslash of `s` opens an escape pair with nothing after it.
    fn ends_mid_escape(s: &str) -> bool {
        let mut pending = false;
        for c in s.chars() {
            pending = !pending && c == '\\';
        }
        pending
    }
}
