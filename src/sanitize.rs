// src/sanitize.rs
//! Text sanitizer shared by every extraction path: entity decoding,
//! control-character removal and whitespace normalization.

use once_cell::sync::OnceCell;
use regex::Regex;

/// How whitespace is treated after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Whitespace {
    /// Collapse every run of whitespace (newlines included) to one space.
    #[default]
    Inline,
    /// Keep line structure; only horizontal runs are collapsed.
    Layout,
}

/// Sanitize untrusted text. Never panics; empty input yields an empty string.
pub fn sanitize(raw: &str, mode: Whitespace) -> String {
    if raw.is_empty() {
        return String::new();
    }

    // Decode + strip until nothing changes, so double-encoded input
    // (`&amp;amp;`) is fully resolved and a second pass is a no-op.
    let mut out = strip_controls(raw);
    loop {
        let next = strip_controls(&html_escape::decode_html_entities(&out));
        if next == out {
            break;
        }
        out = next;
    }

    match mode {
        Whitespace::Inline => collapse_inline(&out),
        Whitespace::Layout => collapse_layout(&out),
    }
}

/// Inline-mode shorthand (paragraph/heading content, extracted fields).
pub fn sanitize_inline(raw: &str) -> String {
    sanitize(raw, Whitespace::Inline)
}

/// Layout-mode shorthand (text that is structured afterwards).
pub fn sanitize_layout(raw: &str) -> String {
    sanitize(raw, Whitespace::Layout)
}

fn is_stripped_control(c: char) -> bool {
    (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r')) || c == '\u{FEFF}'
}

fn strip_controls(s: &str) -> String {
    s.chars().filter(|c| !is_stripped_control(*c)).collect()
}

fn collapse_inline(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split(char::is_whitespace).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn collapse_layout(s: &str) -> String {
    static RE_BLANKS: OnceCell<Regex> = OnceCell::new();
    let re_blanks = RE_BLANKS.get_or_init(|| Regex::new(r"\n{3,}").unwrap());

    let unified = s.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = unified.split('\n').map(collapse_inline).collect();
    let joined = lines.join("\n");
    re_blanks.replace_all(&joined, "\n\n").trim().to_string()
}
