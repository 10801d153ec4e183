//! Fenced code block tokenizer
//!
//! Finds triple-backtick blocks in free-form text. Both markers must start a
//! line, so backticks quoted inside prose never open a block. Matching is
//! non-greedy: a body runs up to the next line starting with a fence, so a
//! fence nested inside a body ends the block early. An opening fence with no closing fence is not
//! matched at all, which lets callers re-run the tokenizer on a growing
//! streamed prefix and only ever see completed blocks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^[ \t]*```[ \t]*([\w+#.-]*)[^\n`]*\n(.*?)^[ \t]*```")
        .expect("fence pattern is valid")
});

/// One fenced block as it appears in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence<'a> {
    /// Language tag as written, possibly empty
    pub language: &'a str,
    /// Raw body between the opening line and the closing fence
    pub body: &'a str,
    /// Byte range of the whole block including both fences
    pub range: Range<usize>,
}

/// Find every completed fence in `text`, in document order
pub fn tokenize(text: &str) -> Vec<Fence<'_>> {
    FENCE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Fence {
                language: caps.get(1).map(|m| m.as_str()).unwrap_or(""),
                body: caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                range: whole.range(),
            })
        })
        .collect()
}

/// Strip leading and trailing blank lines, keeping the first line's indentation
pub fn trim_blank_lines(body: &str) -> &str {
    let trimmed = body.trim_end();
    let mut start = 0;
    for line in trimmed.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    &trimmed[start..]
}
