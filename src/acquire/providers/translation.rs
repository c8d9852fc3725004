// src/acquire/providers/translation.rs
//! Translation mirrors (Lingva API shape):
//! `GET {base}/api/v1/{source}/{target}/{text}` → `{"translation": "..."}`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::acquire::http::{get_text, label_of};
use crate::acquire::target::{is_dot_segment, TranslationRequest};
use crate::error::ProviderError;
use crate::fallback::Provider;
use crate::sanitize::sanitize_inline;

#[derive(Debug, Deserialize)]
struct TranslationBody {
    translation: Option<String>,
}

pub struct TranslationMirror {
    name: String,
    base: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl TranslationMirror {
    pub fn new(base: &str, client: reqwest::Client, timeout: Duration) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            name: format!("translate:{}", label_of(&base)),
            base,
            client,
            timeout,
        }
    }

    /// Request URL with every path segment percent-encoded.
    ///
    /// Dot-only text would be collapsed by URL normalization and silently
    /// change the request path, so it is refused instead.
    pub fn request_url(&self, req: &TranslationRequest) -> Result<String, ProviderError> {
        if is_dot_segment(&req.text) {
            return Err(ProviderError::Shape(format!(
                "text {:?} cannot be sent as a URL path segment",
                req.text
            )));
        }
        let mut url = reqwest::Url::parse(&self.base)
            .map_err(|e| ProviderError::Network(format!("bad mirror base {}: {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Network(format!("mirror base cannot carry a path: {}", self.base)))?
            .pop_if_empty()
            .extend(["api", "v1", req.source.as_str(), req.target.as_str(), req.text.as_str()]);
        Ok(url.into())
    }

    /// A body without a non-blank `translation` field is a failure, not an
    /// empty success.
    pub fn parse_body(body: &str) -> Result<String, ProviderError> {
        let parsed: TranslationBody = serde_json::from_str(body)
            .map_err(|e| ProviderError::Shape(format!("not a translation body: {e}")))?;
        parsed
            .translation
            .map(|t| sanitize_inline(&t))
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::MissingField("translation"))
    }
}

#[async_trait]
impl Provider for TranslationMirror {
    type Target = TranslationRequest;
    type Output = String;

    async fn fetch(&self, req: &TranslationRequest) -> Result<String, ProviderError> {
        let url = self.request_url(req)?;
        let body = get_text(&self.client, &url).await?;
        Self::parse_body(&body)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}
