// src/acquire/post.rs
//! Normalized post model, derived formatted text, thread reconstruction.

use chrono::{DateTime, NaiveDateTime};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashSet;

/// Engagement counts; unavailable values are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PostMetrics {
    pub likes: u64,
    pub reshares: u64,
    pub replies: u64,
}

/// A post in the application's content model. `text` is sanitized plain
/// text; `formatted_text()` is derived from it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPost {
    pub id: String,
    pub author: String,
    pub author_handle: String,
    pub text: String,
    pub timestamp_raw: Option<String>,
    /// Unix seconds, when the raw timestamp is in a recognized format.
    pub published_at: Option<i64>,
    pub source_url: String,
    pub provider_used: String,
    pub media: Vec<String>,
    pub metrics: PostMetrics,
    /// Same author's reply chain, oldest first.
    pub thread: Vec<NormalizedPost>,
}

impl NormalizedPost {
    /// `text` as HTML with mentions, hashtags and URLs wrapped in anchors.
    pub fn formatted_text(&self) -> String {
        format_text(&self.text)
    }
}

impl Serialize for NormalizedPost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("NormalizedPost", 12)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("author", &self.author)?;
        s.serialize_field("author_handle", &self.author_handle)?;
        s.serialize_field("text", &self.text)?;
        s.serialize_field("formatted_text", &self.formatted_text())?;
        s.serialize_field("timestamp_raw", &self.timestamp_raw)?;
        s.serialize_field("published_at", &self.published_at)?;
        s.serialize_field("source_url", &self.source_url)?;
        s.serialize_field("provider_used", &self.provider_used)?;
        s.serialize_field("media", &self.media)?;
        s.serialize_field("metrics", &self.metrics)?;
        s.serialize_field("thread", &self.thread)?;
        s.end()
    }
}

/// Escape `text` for HTML and wrap linkable spans.
pub fn format_text(text: &str) -> String {
    static RE_SPANS: OnceCell<Regex> = OnceCell::new();
    let re = RE_SPANS.get_or_init(|| {
        Regex::new(r#"(https?://[^\s<>"]+)|(@[A-Za-z0-9_]{1,15})|(#[\p{L}\p{N}_]+)"#).unwrap()
    });

    let mut out = String::with_capacity(text.len() + 32);
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        // Mentions/hashtags glued to a word (emails, anchors in URLs) stay plain.
        let glued = text[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '/');
        let href = if let Some(url) = caps.get(1) {
            let url = url.as_str().trim_end_matches(['.', ',', ')', '!', '?', ';', ':']);
            Some((url.to_string(), url.len()))
        } else if glued {
            None
        } else if let Some(mention) = caps.get(2) {
            let handle = &mention.as_str()[1..];
            Some((format!("https://x.com/{handle}"), mention.len()))
        } else {
            caps.get(3).map(|tag| {
                let name = &tag.as_str()[1..];
                (format!("https://x.com/hashtag/{name}"), tag.len())
            })
        };

        let Some((href, span_len)) = href else { continue };
        let span_end = m.start() + span_len;
        out.push_str(&html_escape::encode_text(&text[last..m.start()]));
        out.push_str("<a href=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(&href));
        out.push_str("\">");
        out.push_str(&html_escape::encode_text(&text[m.start()..span_end]));
        out.push_str("</a>");
        last = span_end;
    }
    out.push_str(&html_escape::encode_text(&text[last..]));
    out
}

/// Build the thread: markup order, author's own replies only, root and
/// repeated ids removed (first occurrence wins).
pub fn reconstruct_thread(
    root_id: &str,
    author_handle: &str,
    candidates: Vec<NormalizedPost>,
) -> Vec<NormalizedPost> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(root_id.to_string());
    candidates
        .into_iter()
        .filter(|p| p.author_handle.eq_ignore_ascii_case(author_handle))
        .filter(|p| !p.id.is_empty() && seen.insert(p.id.clone()))
        .collect()
}

/// Parse the timestamp shapes providers emit into unix seconds.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    // JSON status endpoints: "Wed Oct 10 20:19:24 +0000 2018"
    if let Ok(dt) = DateTime::parse_from_str(s, "%a %b %d %H:%M:%S %z %Y") {
        return Some(dt.timestamp());
    }
    // Mirror front-ends: "Jan 5, 2024 · 3:04 PM UTC"
    let cleaned = s.replace('·', " ");
    let cleaned = cleaned.trim_end_matches("UTC").trim();
    NaiveDateTime::parse_from_str(cleaned, "%b %d, %Y %I:%M %p")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}
