// src/acquire/providers/mirror_html.rs
//! Mirror front-ends (Nitter markup). No schema: post blocks are located
//! with CSS selectors, then each block is scraped with a field-spec table,
//! one field at a time.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::acquire::http::{get_text, label_of};
use crate::acquire::post::{parse_timestamp, NormalizedPost, PostMetrics};
use crate::acquire::target::PostTarget;
use crate::error::ProviderError;
use crate::extract::{extract, extract_media, ExtractedFields, FieldSpec};
use crate::fallback::Provider;
use crate::sanitize::sanitize_inline;

static MAIN_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".main-tweet").unwrap());
static THREAD_ITEM_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".after-tweet .timeline-item").unwrap());
static ERROR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".error-panel").unwrap());

fn status_id(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("/status/")?;
    let id: String = rest.chars().take_while(char::is_ascii_digit).collect();
    (!id.is_empty()).then_some(id)
}

fn strip_at(handle: &str) -> Option<String> {
    Some(handle.trim_start_matches('@').to_string())
}

static ITEM_SPECS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::new(
            "id",
            r#"(?s)class="tweet-date"[^>]*>\s*<a[^>]*href="([^"]*)""#,
        )
        .with_post(status_id),
        FieldSpec::new("author", r#"(?s)class="fullname"[^>]*>(.*?)</a>"#),
        FieldSpec::new("handle", r#"(?s)class="username"[^>]*>(.*?)</a>"#).with_post(strip_at),
        FieldSpec::new("text", r#"(?s)class="tweet-content[^"]*"[^>]*>(.*?)</div>"#).layout(),
        FieldSpec::new(
            "timestamp",
            r#"(?s)class="tweet-date"[^>]*>\s*<a[^>]*title="([^"]*)""#,
        ),
        FieldSpec::new("replies", r#"(?s)class="icon-comment"[^>]*>\s*</span>([^<]*)"#),
        FieldSpec::new("reshares", r#"(?s)class="icon-retweet"[^>]*>\s*</span>([^<]*)"#),
        FieldSpec::new("likes", r#"(?s)class="icon-heart"[^>]*>\s*</span>([^<]*)"#),
    ]
});

static MEDIA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"class="still-image"[^>]*href="([^"]+)""#,
        r#"<source[^>]*src="([^"]+)""#,
        r#"<video[^>]*data-url="([^"]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn missing_page_reason(doc: &Html) -> ProviderError {
    let panel = doc
        .select(&ERROR_SEL)
        .next()
        .map(|e| sanitize_inline(&e.text().collect::<String>()))
        .filter(|msg| !msg.is_empty());
    match panel {
        Some(msg) => ProviderError::Shape(format!("mirror error page: {msg}")),
        None => ProviderError::Shape("no main-tweet block".to_string()),
    }
}

/// Field extraction over one element's serialized markup. Attributes come
/// back double-quoted whatever the page used.
fn scrape_block(
    block: ElementRef<'_>,
    target: &PostTarget,
    provider: &str,
    base: &str,
) -> (ExtractedFields, Result<NormalizedPost, ProviderError>) {
    let markup = block.html();
    let fields = extract(&markup, &ITEM_SPECS);
    let media = extract_media(&markup, &MEDIA_PATTERNS, Some(base));
    let post = build_post(&fields, media, target, provider);
    (fields, post)
}

fn build_post(
    fields: &ExtractedFields,
    media: Vec<String>,
    fallback: &PostTarget,
    provider: &str,
) -> Result<NormalizedPost, ProviderError> {
    let author = fields.require("author")?;
    let text = fields.require("text")?;
    let handle = fields.take("handle").unwrap_or_else(|| fallback.handle.clone());
    let id = fields.take("id").unwrap_or_else(|| fallback.id.clone());
    let timestamp_raw = fields.take("timestamp");
    let published_at = timestamp_raw.as_deref().and_then(parse_timestamp);

    Ok(NormalizedPost {
        source_url: PostTarget {
            handle: handle.clone(),
            id: id.clone(),
        }
        .canonical_url(),
        id,
        author,
        author_handle: handle,
        text,
        timestamp_raw,
        published_at,
        provider_used: provider.to_string(),
        media,
        metrics: PostMetrics {
            likes: fields.count("likes"),
            reshares: fields.count("reshares"),
            replies: fields.count("replies"),
        },
        thread: Vec::new(),
    })
}

/// Parse the main post of a status page.
pub fn parse_main(
    html: &str,
    target: &PostTarget,
    provider: &str,
    base: &str,
) -> Result<NormalizedPost, ProviderError> {
    let doc = Html::parse_document(html);
    let block = doc
        .select(&MAIN_SEL)
        .next()
        .ok_or_else(|| missing_page_reason(&doc))?;
    scrape_block(block, target, provider, base).1
}

/// Parse the thread candidates (`after-tweet` items) of a status page, in
/// markup order. Items lacking an id, author or text are skipped.
pub fn parse_thread(
    html: &str,
    target: &PostTarget,
    provider: &str,
    base: &str,
) -> Result<Vec<NormalizedPost>, ProviderError> {
    let doc = Html::parse_document(html);
    if doc.select(&MAIN_SEL).next().is_none() {
        return Err(missing_page_reason(&doc));
    }

    let mut out = Vec::new();
    for item in doc.select(&THREAD_ITEM_SEL) {
        let (fields, post) = scrape_block(item, target, provider, base);
        if !fields.is_present("id") {
            continue;
        }
        if let Ok(post) = post {
            out.push(post);
        }
    }
    Ok(out)
}

pub struct MirrorPostProvider {
    name: String,
    base: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl MirrorPostProvider {
    pub fn new(base: &str, client: reqwest::Client, timeout: Duration) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            name: format!("mirror:{}", label_of(&base)),
            base,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl Provider for MirrorPostProvider {
    type Target = PostTarget;
    type Output = NormalizedPost;

    async fn fetch(&self, target: &PostTarget) -> Result<NormalizedPost, ProviderError> {
        let url = format!("{}{}", self.base, target.path());
        let html = get_text(&self.client, &url).await?;
        parse_main(&html, target, &self.name, &self.base)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}

/// Same mirror, asked only for the reply chain below the main post.
pub struct MirrorThreadProvider {
    name: String,
    base: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl MirrorThreadProvider {
    pub fn new(base: &str, client: reqwest::Client, timeout: Duration) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            name: format!("thread:{}", label_of(&base)),
            base,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl Provider for MirrorThreadProvider {
    type Target = PostTarget;
    type Output = Vec<NormalizedPost>;

    async fn fetch(&self, target: &PostTarget) -> Result<Vec<NormalizedPost>, ProviderError> {
        let url = format!("{}{}", self.base, target.path());
        let html = get_text(&self.client, &url).await?;
        parse_thread(&html, target, &self.name, &self.base)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }
}
