// src/structure/mod.rs
//! Flat decoded text → hierarchical document (title, headings, paragraphs).
//!
//! Upstream decoders do not keep reliable paragraph breaks or layout metadata,
//! so structure is inferred line by line: a line is a heading when it is
//! short, unterminated and carries a marker from [`rules::HEADING_RULES`];
//! everything else accumulates into paragraphs that break on sentence
//! punctuation or length. Misclassifying unusual lines is accepted.

pub mod rules;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

use crate::sanitize::{sanitize_inline, sanitize_layout};
use crate::telemetry::ensure_metrics_described;

pub const DEFAULT_HEADING_MAX_CHARS: usize = 100;
pub const DEFAULT_PARAGRAPH_FLUSH_CHARS: usize = 500;
pub const DEFAULT_TITLE_MAX_CHARS: usize = 50;

/// A line ending in one of these is never a heading.
pub const HEADING_DISQUALIFIERS: &[char] = &['。', '，', '；', '.', ','];
/// A body line ending in one of these closes the current paragraph.
pub const SENTENCE_TERMINATORS: &[char] = &['。', '，', '；', '.', ',', '！', '？', '!', '?', ';'];
/// Skipped when looking for a sentence terminator at the end of a line.
const TRAILING_CLOSERS: &[char] = &['"', '\'', '”', '’', '」', '』', ')', '）', ']', '》'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructurerConfig {
    /// Heading candidates must be strictly shorter than this (chars).
    pub heading_max_chars: usize,
    /// Paragraph buffer flushes once it grows past this (chars).
    pub paragraph_flush_chars: usize,
    /// Fallback title is the first line cut to this many chars.
    pub title_max_chars: usize,
}

impl Default for StructurerConfig {
    fn default() -> Self {
        Self {
            heading_max_chars: DEFAULT_HEADING_MAX_CHARS,
            paragraph_flush_chars: DEFAULT_PARAGRAPH_FLUSH_CHARS,
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Block::Heading { text, .. } | Block::Paragraph { text } => text.as_str(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuredDocument {
    pub title: String,
    pub body: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

impl StructuredDocument {
    pub fn headings(&self) -> impl Iterator<Item = (u8, &str)> {
        self.body.iter().filter_map(|b| match b {
            Block::Heading { level, text } => Some((*level, text.as_str())),
            Block::Paragraph { .. } => None,
        })
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.body.iter().filter_map(|b| match b {
            Block::Paragraph { text } => Some(text.as_str()),
            Block::Heading { .. } => None,
        })
    }

    /// Render as the normalized content body (`<h1>`..`<h3>`, `<p>`).
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.body {
            let _ = match block {
                Block::Heading { level, text } => writeln!(
                    out,
                    "<h{level}>{}</h{level}>",
                    html_escape::encode_text(text)
                ),
                Block::Paragraph { text } => {
                    writeln!(out, "<p>{}</p>", html_escape::encode_text(text))
                }
            };
        }
        out
    }
}

/// Text handed over by the file-decoding step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DecodedText {
    pub text: String,
    #[serde(default)]
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Heading(u8),
    Body,
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}')
}

fn ends_sentence(line: &str) -> bool {
    line.trim_end_matches(TRAILING_CLOSERS)
        .chars()
        .next_back()
        .is_some_and(|c| SENTENCE_TERMINATORS.contains(&c))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim_end().to_string()
}

#[derive(Default)]
struct ParagraphBuffer {
    text: String,
    chars: usize,
}

impl ParagraphBuffer {
    /// Space-joined, except where either side of the join is CJK.
    fn push(&mut self, line: &str) {
        if let (Some(prev), Some(next)) = (self.text.chars().next_back(), line.chars().next()) {
            if !(is_cjk(prev) || is_cjk(next)) {
                self.text.push(' ');
                self.chars += 1;
            }
        }
        self.text.push_str(line);
        self.chars += line.chars().count();
    }

    fn flush_into(&mut self, body: &mut Vec<Block>) {
        if !self.text.is_empty() {
            body.push(Block::Paragraph {
                text: std::mem::take(&mut self.text),
            });
        }
        self.chars = 0;
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentStructurer {
    config: StructurerConfig,
}

impl DocumentStructurer {
    pub fn new(config: StructurerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StructurerConfig {
        &self.config
    }

    /// Classify one already-sanitized line.
    pub fn classify(&self, line: &str) -> LineClass {
        let Some(last) = line.chars().next_back() else {
            return LineClass::Body;
        };
        if line.chars().count() >= self.config.heading_max_chars
            || HEADING_DISQUALIFIERS.contains(&last)
        {
            return LineClass::Body;
        }
        match rules::match_rule(line) {
            Some(rule) => LineClass::Heading(rule.level),
            None => LineClass::Body,
        }
    }

    /// Never fails: unclassifiable input comes back as paragraphs only.
    pub fn structure(&self, raw: &str) -> StructuredDocument {
        ensure_metrics_described();

        let layout = sanitize_layout(raw);
        let mut body = Vec::new();
        let mut buf = ParagraphBuffer::default();
        let mut first_line: Option<String> = None;
        let mut top_heading: Option<String> = None;

        for line in layout.lines().map(sanitize_inline).filter(|l| !l.is_empty()) {
            if first_line.is_none() {
                first_line = Some(line.clone());
            }
            match self.classify(&line) {
                LineClass::Heading(level) => {
                    buf.flush_into(&mut body);
                    if level == 1 && top_heading.is_none() {
                        top_heading = Some(line.clone());
                    }
                    body.push(Block::Heading { level, text: line });
                }
                LineClass::Body => {
                    let terminated = ends_sentence(&line);
                    buf.push(&line);
                    if terminated || buf.chars > self.config.paragraph_flush_chars {
                        buf.flush_into(&mut body);
                    }
                }
            }
        }
        buf.flush_into(&mut body);

        let title = top_heading
            .or_else(|| first_line.map(|l| truncate_chars(&l, self.config.title_max_chars)))
            .unwrap_or_default();

        counter!("structure_documents_total").increment(1);
        debug!(
            target: "structure",
            blocks = body.len(),
            headings = body.iter().filter(|b| matches!(b, Block::Heading { .. })).count(),
            input_chars = raw.len(),
            "document structured"
        );

        StructuredDocument {
            title,
            body,
            page_count: None,
        }
    }

    pub fn structure_decoded(&self, decoded: DecodedText) -> StructuredDocument {
        StructuredDocument {
            page_count: decoded.page_count,
            ..self.structure(&decoded.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(raw: &str) -> StructuredDocument {
        DocumentStructurer::default().structure(raw)
    }

    #[test]
    fn numbered_heading_then_paragraph() {
        let doc = structure("1. Introduction\nThis is the intro text.");
        assert_eq!(
            doc.body,
            vec![
                Block::Heading {
                    level: 3,
                    text: "1. Introduction".into()
                },
                Block::Paragraph {
                    text: "This is the intro text.".into()
                },
            ]
        );
        assert_eq!(doc.title, "1. Introduction");
    }

    #[test]
    fn long_unterminated_body_flushes_on_length() {
        let line = "a".repeat(49);
        let raw = vec![line.as_str(); 12].join("\n");
        let doc = structure(&raw);
        let paras: Vec<_> = doc.paragraphs().collect();
        assert_eq!(paras.len(), 2);
        // 11 lines + 10 joins crosses 500 chars.
        assert_eq!(paras[0].chars().count(), 11 * 49 + 10);
        assert_eq!(paras[1], line);
        assert!(doc.headings().next().is_none());
    }

    #[test]
    fn sentence_terminator_breaks_paragraphs() {
        let doc = structure("First line continues\nhere.\nSecond paragraph (quoted.)\nThird");
        let paras: Vec<_> = doc.paragraphs().collect();
        assert_eq!(
            paras,
            vec![
                "First line continues here.",
                "Second paragraph (quoted.)",
                "Third"
            ]
        );
    }

    #[test]
    fn comma_terminated_lines_close_paragraphs() {
        let doc = structure("First clause ends here,\nsecond clause follows.\n近年来，数据量快速增长，\n需要新的处理方法");
        let paras: Vec<_> = doc.paragraphs().collect();
        assert_eq!(
            paras,
            vec![
                "First clause ends here,",
                "second clause follows.",
                "近年来，数据量快速增长，",
                "需要新的处理方法"
            ]
        );
    }

    #[test]
    fn cjk_lines_join_without_space() {
        let doc = structure("第一章 总则\n本文介绍了\n新的方法。\nmixed 中文\nend");
        assert_eq!(doc.title, "第一章 总则");
        let paras: Vec<_> = doc.paragraphs().collect();
        assert_eq!(paras, vec!["本文介绍了新的方法。", "mixed 中文end"]);
    }

    #[test]
    fn title_falls_back_to_truncated_first_line() {
        let first = format!("{} tail", "x".repeat(60));
        let doc = structure(&format!("{first}\n1.2 Background\nBody."));
        assert_eq!(doc.title, "x".repeat(50));
        assert_eq!(doc.headings().collect::<Vec<_>>(), vec![(2, "1.2 Background")]);
    }

    #[test]
    fn first_level_one_heading_is_title_even_if_later() {
        let doc = structure("Preface words\nChapter 1 Origins\nChapter 2 Growth");
        assert_eq!(doc.title, "Chapter 1 Origins");
    }

    #[test]
    fn heading_disqualified_by_terminator_or_length() {
        let s = DocumentStructurer::default();
        assert_eq!(s.classify("1. Introduction"), LineClass::Heading(3));
        assert_eq!(s.classify("1. We begin here."), LineClass::Body);
        assert_eq!(s.classify("Abstract,"), LineClass::Body);
        let long = format!("Introduction {}", "y".repeat(100));
        assert_eq!(s.classify(&long), LineClass::Body);
        assert_eq!(s.classify("Just prose"), LineClass::Body);
    }

    #[test]
    fn heading_length_threshold_is_configurable() {
        let s = DocumentStructurer::new(StructurerConfig {
            heading_max_chars: 10,
            ..Default::default()
        });
        assert_eq!(s.classify("Abstract"), LineClass::Heading(2));
        assert_eq!(s.classify("Abstract xy"), LineClass::Body);
    }

    #[test]
    fn every_nonempty_line_lands_in_one_block_in_order() {
        let raw = "Abstract\n\n  Some text\n\u{0007}\nIntroduction\nMore.\n";
        let doc = structure(raw);
        let texts: Vec<_> = doc.body.iter().map(Block::text).collect();
        assert_eq!(texts, vec!["Abstract", "Some text", "Introduction", "More."]);
    }

    #[test]
    fn empty_and_blank_input() {
        for raw in ["", "   \n\n\t", "\u{0000}\u{0001}"] {
            let doc = structure(raw);
            assert_eq!(doc.title, "");
            assert!(doc.body.is_empty());
        }
    }

    #[test]
    fn decoded_text_carries_page_count() {
        let doc = DocumentStructurer::default().structure_decoded(DecodedText {
            text: "Hello there.".into(),
            page_count: Some(4),
        });
        assert_eq!(doc.page_count, Some(4));
        assert_eq!(doc.title, "Hello there.");
    }

    #[test]
    fn html_rendering_escapes_text() {
        let doc = structure("Introduction\nA < B & C.");
        assert_eq!(doc.to_html(), "<h2>Introduction</h2>\n<p>A &lt; B &amp; C.</p>\n");
    }

    #[test]
    fn blocks_serialize_with_type_tag() {
        let doc = structure("Abstract\nBody.");
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["body"][0]["type"], "heading");
        assert_eq!(v["body"][0]["level"], 2);
        assert_eq!(v["body"][1]["type"], "paragraph");
        assert!(v.get("page_count").is_none());
    }
}
