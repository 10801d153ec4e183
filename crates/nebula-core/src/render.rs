//! Chat-message rendering
//!
//! Turns assistant markdown into HTML for the conversation view. Text is
//! escaped first; fenced blocks and inline code are then cut out so the
//! emphasis and line-break rules never reach inside them.

use crate::preview::escape_html;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static MESSAGE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(\w*)\n?(.*?)```").expect("message fence pattern is valid"));
static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("inline code pattern is valid"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is valid"));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("italic pattern is valid"));
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").expect("placeholder pattern is valid"));

/// Fence tags that get a Preview button
const PREVIEWABLE: &[&str] = &["html", "css", "javascript", "js"];

/// Drop the placeholder delimiters so input text can never forge one
fn strip_sentinels(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{E000}' | '\u{E001}'))
        .collect()
}

fn placeholder(index: usize) -> String {
    format!("\u{E000}{}\u{E001}", index)
}

fn code_block(lang: &str, code: &str) -> String {
    let label = if lang.is_empty() { "code" } else { lang };
    let preview = if PREVIEWABLE.contains(&lang.to_ascii_lowercase().as_str()) {
        format!(
            r#"<button class="code-action-btn" data-action="preview" data-lang="{}">Preview</button>"#,
            lang
        )
    } else {
        String::new()
    };

    format!(
        concat!(
            r#"<pre data-lang="{label}"><div class="code-actions">"#,
            r#"<button class="code-action-btn" data-action="copy" data-lang="{lang}">Copy</button>"#,
            "{preview}",
            r#"<button class="code-action-btn" data-action="expand" data-lang="{lang}">Expand</button>"#,
            "</div><code>{code}</code></pre>"
        ),
        label = label,
        lang = lang,
        preview = preview,
        code = code.trim()
    )
}

/// Render one assistant message as HTML
pub fn render_message(text: &str) -> String {
    let mut protected: Vec<String> = Vec::new();
    let escaped = escape_html(&strip_sentinels(text));

    let without_blocks = MESSAGE_FENCE.replace_all(&escaped, |caps: &Captures| {
        protected.push(code_block(&caps[1], &caps[2]));
        placeholder(protected.len() - 1)
    });
    let without_code = INLINE_CODE.replace_all(&without_blocks, |caps: &Captures| {
        protected.push(format!("<code>{}</code>", &caps[1]));
        placeholder(protected.len() - 1)
    });

    let bold = BOLD.replace_all(&without_code, "<strong>$1</strong>");
    let italic = ITALIC.replace_all(&bold, "<em>$1</em>");
    let broken = italic.replace('\n', "<br>");

    PLACEHOLDER
        .replace_all(&broken, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| protected.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}
