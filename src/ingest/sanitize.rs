// src/ingest/sanitize.rs
//! Markup stripping for feed summaries.
//!
//! Feed descriptions arrive as HTML fragments of any quality. The stripper is a
//! single forward scan: it never backtracks, tolerates unterminated tags, and
//! drops `<script>`/`<style>` bodies and comments.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Upper bound for `NormalizedItem::summary`, in chars.
pub const SUMMARY_MAX_CHARS: usize = 320;

/// Elements whose content is removed along with the tags.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Plain text from an HTML fragment: markup removed, entities decoded,
/// whitespace collapsed and trimmed.
pub fn sanitize(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    // 1) Tags, comments, script/style bodies. Escaped markup (`&lt;T&gt;`) is text.
    let stripped = strip_markup(html);

    // 2) Entities, exactly one level
    let decoded = html_escape::decode_html_entities(&stripped);

    // 3) Collapse whitespace (incl. NBSP)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// `sanitize` followed by a hard cap of `max` chars.
pub fn summarize(html: &str, max: usize) -> String {
    let text = sanitize(html);
    if text.chars().count() <= max {
        return text;
    }
    let cut: String = text.chars().take(max).collect();
    cut.trim_end().to_string()
}

fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if !opens_tag(tail) {
            out.push('<');
            rest = &tail[1..];
            continue;
        }

        // A removed tag still separates words.
        out.push(' ');

        if let Some(body) = tail.strip_prefix("<!--") {
            rest = body.find("-->").map(|p| &body[p + 3..]).unwrap_or("");
            continue;
        }

        let end = tail.find('>').map(|p| p + 1).unwrap_or(tail.len());
        let name = element_name(&tail[1..end]);
        rest = &tail[end..];

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !tail[..end].ends_with("/>") {
            rest = skip_raw_text(rest, &name);
        }
    }

    out.push_str(rest);
    out
}

/// `<` only starts markup when followed by a letter, `/`, `!` or `?`.
fn opens_tag(tail: &str) -> bool {
    matches!(
        tail.as_bytes().get(1),
        Some(&b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?')
    )
}

/// Lower-cased element name of an opening tag; empty for closing tags and
/// declarations.
fn element_name(tag_inner: &str) -> String {
    tag_inner
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Skip up to and including `</name ...>`; an unclosed element swallows the
/// rest of the input.
fn skip_raw_text<'a>(rest: &'a str, name: &str) -> &'a str {
    // ASCII lowercasing keeps byte offsets aligned with `rest`.
    let lower = rest.to_ascii_lowercase();
    let close = format!("</{name}");
    match lower.find(&close) {
        Some(p) => {
            let after = &rest[p..];
            after.find('>').map(|q| &after[q + 1..]).unwrap_or("")
        }
        None => "",
    }
}
