// tests/common/mod.rs
//
// Shared helpers: scripted providers and sample posts.
#![allow(dead_code)]

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use content_ingest::acquire::{NormalizedPost, PostMetrics};
use content_ingest::fallback::{DynProvider, Provider};
use content_ingest::ProviderError;

/// Provider that returns a fixed result (optionally after a delay) and counts calls.
pub struct Scripted<T, O> {
    name: String,
    result: Result<O, ProviderError>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    _target: PhantomData<fn(&T)>,
}

#[async_trait]
impl<T, O> Provider for Scripted<T, O>
where
    T: Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    type Target = T;
    type Output = O;

    async fn fetch(&self, _target: &T) -> Result<O, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.result.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Default)]
pub struct Calls(pub Arc<AtomicUsize>);

impl Calls {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn scripted<T, O>(
    name: &str,
    result: Result<O, ProviderError>,
    calls: &Calls,
) -> DynProvider<T, O>
where
    T: Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    Box::new(Scripted {
        name: name.to_string(),
        result,
        delay: None,
        calls: calls.0.clone(),
        _target: PhantomData,
    })
}

pub fn slow<T, O>(
    name: &str,
    result: Result<O, ProviderError>,
    delay: Duration,
    calls: &Calls,
) -> DynProvider<T, O>
where
    T: Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    Box::new(Scripted {
        name: name.to_string(),
        result,
        delay: Some(delay),
        calls: calls.0.clone(),
        _target: PhantomData,
    })
}

pub fn post(id: &str, handle: &str, text: &str) -> NormalizedPost {
    NormalizedPost {
        id: id.to_string(),
        author: format!("{handle} (display)"),
        author_handle: handle.to_string(),
        text: text.to_string(),
        timestamp_raw: None,
        published_at: None,
        source_url: format!("https://x.com/{handle}/status/{id}"),
        provider_used: "scripted".to_string(),
        media: Vec::new(),
        metrics: PostMetrics::default(),
        thread: Vec::new(),
    }
}
