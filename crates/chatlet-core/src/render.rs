//! Markdown-subset renderer producing safe HTML fragments.
//!
//! Message text (user or model) is transformed in a fixed order: escaping
//! first, then re-introduction of the allowed markup. The order matters:
//! no raw input can inject tags because every `<`, `>` and `&` is escaped
//! before any element is emitted.
//!
//! The transform is re-applied to the whole accumulated text on each token
//! arrival rather than patched incrementally; O(total length) per token is
//! fine at conversational message sizes.

use std::sync::LazyLock;

use regex::Regex;

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid code regex"));
// URLs run until whitespace or the start of already-emitted markup.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<]+").expect("valid url regex"));

/// Renders message text to an HTML fragment.
///
/// Supported subset: `**bold**`, `` `inline code` ``, bare http(s) URLs
/// (opened in a new context with no referrer/opener leak), and newlines.
/// Everything else is plain text.
pub fn render_message(text: &str) -> String {
    let escaped = escape_html(text);
    let bolded = BOLD_RE.replace_all(&escaped, "<strong>$1</strong>");
    let coded = CODE_RE.replace_all(&bolded, "<code>$1</code>");
    let linked = URL_RE.replace_all(&coded, |caps: &regex::Captures<'_>| {
        let url = &caps[0];
        // The href lands in attribute position, so a raw quote would close
        // it; percent-encode quotes there. The visible link text is plain
        // text content and stays as matched.
        let href = url.replace('"', "%22");
        format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{url}</a>"#)
    });
    linked.replace('\n', "<br>")
}

/// Escapes the HTML-significant characters for text content.
///
/// Quotes are left alone here; the one place user text reaches attribute
/// position (the anchor `href`) encodes quotes where the anchor is emitted.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
