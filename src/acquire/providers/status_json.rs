// src/acquire/providers/status_json.rs
//! Structured JSON status endpoint (fxtwitter-compatible API). Preferred over
//! the mirrors because no markup scraping is needed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::acquire::http::{get_text, label_of};
use crate::acquire::post::{parse_timestamp, NormalizedPost, PostMetrics};
use crate::acquire::target::PostTarget;
use crate::error::ProviderError;
use crate::extract::{normalize_media_url, parse_count, strip_tags};
use crate::fallback::Provider;
use crate::sanitize::{sanitize_inline, sanitize_layout};

#[derive(Debug, Deserialize)]
struct Envelope {
    code: Option<Value>,
    message: Option<String>,
    tweet: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct Status {
    id: Option<Value>,
    text: Option<String>,
    author: Option<Author>,
    likes: Option<Value>,
    retweets: Option<Value>,
    replies: Option<Value>,
    created_at: Option<String>,
    created_timestamp: Option<i64>,
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
    screen_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Media {
    #[serde(default)]
    all: Vec<MediaItem>,
    #[serde(default)]
    photos: Vec<MediaItem>,
    #[serde(default)]
    videos: Vec<MediaItem>,
}

#[derive(Debug, Deserialize)]
struct MediaItem {
    url: Option<String>,
}

/// Counts arrive as numbers or as display strings depending on the instance.
fn value_count(v: Option<&Value>) -> u64 {
    match v {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => parse_count(s),
        _ => 0,
    }
}

fn value_string(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

pub struct StatusJsonProvider {
    name: String,
    base: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl StatusJsonProvider {
    pub fn new(base: &str, client: reqwest::Client, timeout: Duration) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            name: format!("json:{}", label_of(&base)),
            base,
            client,
            timeout,
        }
    }

    /// Shape-check and normalize one response body.
    pub fn parse_status(
        body: &str,
        target: &PostTarget,
        provider: &str,
    ) -> Result<NormalizedPost, ProviderError> {
        let env: Envelope = serde_json::from_str(body)
            .map_err(|e| ProviderError::Shape(format!("not a status envelope: {e}")))?;

        if let Some(code) = env.code.as_ref().and_then(Value::as_u64) {
            if code != 200 {
                let msg = env.message.unwrap_or_default();
                return Err(ProviderError::Shape(format!("endpoint code {code} {msg}")));
            }
        }
        let st = env
            .tweet
            .ok_or_else(|| ProviderError::Shape("missing `tweet` object".to_string()))?;

        let author = st.author.as_ref();
        let name = author
            .and_then(|a| a.name.as_deref())
            .map(sanitize_inline)
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::MissingField("author"))?;
        let text = st
            .text
            .as_deref()
            .map(|t| sanitize_layout(&strip_tags(t)))
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::MissingField("text"))?;
        let handle = author
            .and_then(|a| a.screen_name.as_deref())
            .map(|h| sanitize_inline(h).trim_start_matches('@').to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| target.handle.clone());

        let media_src = st.media.unwrap_or_default();
        let items = if media_src.all.is_empty() {
            media_src.photos.into_iter().chain(media_src.videos).collect()
        } else {
            media_src.all
        };
        let mut media: Vec<String> = Vec::with_capacity(items.len());
        for url in items
            .iter()
            .filter_map(|m| m.url.as_deref())
            .filter_map(|u| normalize_media_url(u, None))
        {
            if !media.contains(&url) {
                media.push(url);
            }
        }

        let timestamp_raw = st.created_at.as_deref().map(sanitize_inline).filter(|s| !s.is_empty());
        let published_at = st
            .created_timestamp
            .or_else(|| timestamp_raw.as_deref().and_then(parse_timestamp));

        let id = value_string(st.id.as_ref())
            .filter(|id| id.chars().all(|c| c.is_ascii_digit()) && !id.is_empty())
            .unwrap_or_else(|| target.id.clone());

        Ok(NormalizedPost {
            source_url: PostTarget {
                handle: handle.clone(),
                id: id.clone(),
            }
            .canonical_url(),
            id,
            author: name,
            author_handle: handle,
            text,
            timestamp_raw,
            published_at,
            provider_used: provider.to_string(),
            media,
            metrics: PostMetrics {
                likes: value_count(st.likes.as_ref()),
                reshares: value_count(st.retweets.as_ref()),
                replies: value_count(st.replies.as_ref()),
            },
            thread: Vec::new(),
        })
    }
}

#[async_trait]
impl Provider for StatusJsonProvider {
    type Target = PostTarget;
    type Output = NormalizedPost;

    async fn fetch(&self, target: &PostTarget) -> Result<NormalizedPost, ProviderError> {
        let url = format!("{}{}", self.base, target.path());
        let body = get_text(&self.client, &url).await?;
        Self::parse_status(&body, target, &self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}
