//! Cleanup of server-provided update text.
//!
//! Checkin changelogs arrive as HTML fragments with `<br>` line breaks and
//! parenthesised help links. Downstream consumers (release notes, terminal
//! output) want plain text.

use std::sync::LazyLock;

use regex::Regex;

static BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static PAREN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(https?://[^)\s]*\)?").expect("valid regex"));

/// Convert an HTML changelog to plain text.
///
/// Source newlines are dropped, `<br>` becomes a newline, all other tags
/// are stripped, and `(https://...)` links are removed.
pub fn clean_description(html: &str) -> String {
    let text = html.replace(['\r', '\n'], "");
    let text = BREAK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = PAREN_LINK.replace_all(&text, "");
    text.trim().to_owned()
}

/// Normalise an update title.
pub fn tidy_title(title: &str) -> String {
    title.trim().to_owned()
}

/// Reduce `raw` to a release-tag-safe identifier: `[A-Za-z0-9._-]`, other
/// characters become `-`, runs of `-` collapse, and leading/trailing
/// separators are trimmed.
pub fn sanitize_tag(raw: &str) -> String {
    let mut tag = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && tag.ends_with('-') {
            continue;
        }
        tag.push(c);
    }
    tag.trim_matches(|c| matches!(c, '-' | '.')).to_owned()
}
