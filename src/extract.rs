// src/extract.rs
//! Named-field extraction from semi-structured markup.
//!
//! Every field is matched on its own; a field that does not match is `None`
//! and never prevents the others from being extracted. Fragments are cleaned
//! (tags stripped with link text kept, then sanitized) before a field's
//! optional post-processing step runs.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeMap;

use crate::error::ProviderError;
use crate::sanitize::{sanitize, Whitespace};

/// Post-processing applied to a cleaned fragment. `None` drops the field.
pub type PostProcess = fn(&str) -> Option<String>;

/// One named field: a regex whose first capture group holds the fragment.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub pattern: Regex,
    pub whitespace: Whitespace,
    pub post: Option<PostProcess>,
}

impl FieldSpec {
    /// Panics on an invalid pattern; specs are built from static literals.
    pub fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            whitespace: Whitespace::Inline,
            post: None,
        }
    }

    /// Keep newlines in the cleaned fragment.
    pub fn layout(mut self) -> Self {
        self.whitespace = Whitespace::Layout;
        self
    }

    pub fn with_post(mut self, post: PostProcess) -> Self {
        self.post = Some(post);
        self
    }

    fn apply(&self, markup: &str) -> Option<String> {
        let caps = self.pattern.captures(markup)?;
        let raw = caps.get(1).or_else(|| caps.get(0))?.as_str();
        let cleaned = sanitize(&strip_tags(raw), self.whitespace);
        let value = match self.post {
            Some(post) => post(&cleaned)?,
            None => cleaned,
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Result of running a spec table over one fragment of markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    fields: BTreeMap<&'static str, Option<String>>,
}

impl ExtractedFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_deref())
    }

    /// Owned copy of a field, if present.
    pub fn take(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    /// Numeric view of a field; absent or unparsable counts are 0.
    pub fn count(&self, name: &str) -> u64 {
        self.get(name).map(parse_count).unwrap_or(0)
    }

    /// Required field; absence is an extraction failure for the provider.
    pub fn require(&self, name: &'static str) -> Result<String, ProviderError> {
        self.take(name).ok_or(ProviderError::MissingField(name))
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Run every spec against `markup`. Never fails: unmatched fields are `None`.
pub fn extract(markup: &str, specs: &[FieldSpec]) -> ExtractedFields {
    let fields = specs
        .iter()
        .map(|spec| (spec.name, spec.apply(markup)))
        .collect();
    ExtractedFields { fields }
}

/// Remove markup tags, keeping inner text. `<br>` and block ends become
/// newlines; script/style bodies are dropped entirely.
pub fn strip_tags(s: &str) -> String {
    static RE_SCRIPT: OnceCell<Regex> = OnceCell::new();
    static RE_STYLE: OnceCell<Regex> = OnceCell::new();
    static RE_BREAK: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_script = RE_SCRIPT.get_or_init(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
    let re_style = RE_STYLE.get_or_init(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
    let re_break =
        RE_BREAK.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>").unwrap());
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z!][^>]*>").unwrap());

    let out = re_script.replace_all(s, "");
    let out = re_style.replace_all(&out, "");
    let out = re_break.replace_all(&out, "\n");
    re_tags.replace_all(&out, "").into_owned()
}

/// Parse a displayed count: `1,234`, `12 345`, `1.2K`, `3M`. Anything else is 0.
pub fn parse_count(raw: &str) -> u64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| {
            !matches!(c, ',' | '_' | '\'' | '\u{00A0}' | '\u{202F}') && !c.is_whitespace()
        })
        .collect();
    if cleaned.is_empty() {
        return 0;
    }

    let (number, multiplier) = match cleaned.chars().last() {
        Some('K' | 'k') => (&cleaned[..cleaned.len() - 1], 1_000f64),
        Some('M' | 'm') => (&cleaned[..cleaned.len() - 1], 1_000_000f64),
        Some('B' | 'b') => (&cleaned[..cleaned.len() - 1], 1_000_000_000f64),
        _ => (cleaned.as_str(), 1f64),
    };

    if multiplier == 1f64 {
        // Plain integer; a lone '.' here is a locale thousands separator.
        return number.replace('.', "").parse::<u64>().unwrap_or(0);
    }
    match number.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => (v * multiplier).round() as u64,
        _ => 0,
    }
}

/// Collect media URLs matched by any of `patterns`, in document order,
/// first occurrence wins. Relative URLs are resolved against `base`.
pub fn extract_media(markup: &str, patterns: &[Regex], base: Option<&str>) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = Vec::new();
    for re in patterns {
        for caps in re.captures_iter(markup) {
            if let Some(m) = caps.get(1) {
                if let Some(url) = normalize_media_url(m.as_str(), base) {
                    hits.push((m.start(), url));
                }
            }
        }
    }
    hits.sort_by_key(|(pos, _)| *pos);

    let mut out: Vec<String> = Vec::with_capacity(hits.len());
    for (_, url) in hits {
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}

/// Normalize one media reference to an absolute `https://` (or `http://`) URL.
pub fn normalize_media_url(raw: &str, base: Option<&str>) -> Option<String> {
    let url = sanitize(raw, Whitespace::Inline);
    if url.is_empty() {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("javascript:") {
        return None;
    }
    if let Some(rest) = url.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if lower.starts_with("https://") || lower.starts_with("http://") {
        return Some(url);
    }
    if url.starts_with('/') {
        let base = base?.trim_end_matches('/');
        return Some(format!("{base}{url}"));
    }
    None
}
