// src/acquire/target.rs
//! Caller input validation: post URLs and translation requests.
//! Anything rejected here is terminal; no provider is contacted.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;

use crate::error::AcquireError;
use crate::sanitize::sanitize_inline;

/// A post identified by author handle and numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostTarget {
    pub handle: String,
    pub id: String,
}

impl PostTarget {
    /// Recognized shapes: primary domain or known mirrors, optional
    /// `www.`/`mobile.`/`m.` subdomain, `/<handle>/status/<digits>`.
    pub fn parse(url: &str) -> Result<Self, AcquireError> {
        static RE_POST: OnceCell<Regex> = OnceCell::new();
        let re = RE_POST.get_or_init(|| {
            Regex::new(
                r"(?i)^(?:https?://)?(?:www\.|mobile\.|m\.)?(?:twitter\.com|x\.com|fxtwitter\.com|vxtwitter\.com|fixupx\.com|xcancel\.com|nitter\.[a-z0-9.-]+)/([A-Za-z0-9_]{1,15})/status(?:es)?/(\d{1,25})(?:[/?#].*)?$",
            )
            .unwrap()
        });

        let trimmed = url.trim();
        let caps = re
            .captures(trimmed)
            .ok_or_else(|| AcquireError::InvalidTarget(format!("unrecognized post URL: {trimmed}")))?;
        Ok(Self {
            handle: caps[1].to_string(),
            id: caps[2].to_string(),
        })
    }

    /// Canonical link stored on normalized posts.
    pub fn canonical_url(&self) -> String {
        format!("https://x.com/{}/status/{}", self.handle, self.id)
    }

    /// Path shared by the JSON endpoints and the mirror front-ends.
    pub fn path(&self) -> String {
        format!("/{}/status/{}", self.handle, self.id)
    }
}

/// A validated translation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source: String,
    pub target: String,
}

impl TranslationRequest {
    pub fn new(
        text: &str,
        source: &str,
        target: &str,
        max_chars: usize,
    ) -> Result<Self, AcquireError> {
        let text = sanitize_inline(text);
        if text.is_empty() {
            return Err(AcquireError::InvalidTarget("empty text".to_string()));
        }
        if is_dot_segment(&text) {
            return Err(AcquireError::InvalidTarget(format!(
                "text {text:?} cannot be sent as a URL path segment"
            )));
        }
        let len = text.chars().count();
        if len > max_chars {
            return Err(AcquireError::InvalidTarget(format!(
                "text too long: {len} > {max_chars} characters"
            )));
        }
        let source = normalize_lang(source, true)?;
        let target = normalize_lang(target, false)?;
        Ok(Self {
            text,
            source,
            target,
        })
    }
}

/// `.` and `..` are resolved away by URL normalization, even when
/// percent-encoded, so they never reach a mirror intact.
pub(crate) fn is_dot_segment(text: &str) -> bool {
    matches!(text, "." | "..")
}

fn normalize_lang(code: &str, allow_auto: bool) -> Result<String, AcquireError> {
    static RE_LANG: OnceCell<Regex> = OnceCell::new();
    let re = RE_LANG.get_or_init(|| Regex::new(r"^[a-z]{2,3}(?:[-_][a-z]{2,4})?$").unwrap());

    let c = code.trim().to_ascii_lowercase();
    let c = if c.is_empty() && allow_auto { "auto".to_string() } else { c };
    if c == "auto" {
        if allow_auto {
            return Ok(c);
        }
        return Err(AcquireError::InvalidTarget(
            "target language cannot be auto".to_string(),
        ));
    }
    if !re.is_match(&c) {
        return Err(AcquireError::InvalidTarget(format!(
            "unsupported language code: {code}"
        )));
    }
    // Regional suffixes are conventionally upper-case (zh-TW, pt-BR).
    Ok(match c.split_once(['-', '_']) {
        Some((lang, region)) => format!("{lang}-{}", region.to_ascii_uppercase()),
        None => c,
    })
}
