// src/acquire/mod.rs
//! Content acquisition: posts (with best-effort thread) and translations,
//! each served by an ordered chain of independent providers.

pub mod http;
pub mod post;
pub mod providers;
pub mod target;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::AcquisitionConfig;
use crate::error::AcquireError;
use crate::fallback::{fetch_with_fallback, AcquisitionResult, DynProvider};
use crate::telemetry::anon_hash;

pub use post::{format_text, reconstruct_thread, NormalizedPost, PostMetrics};
pub use providers::{MirrorPostProvider, MirrorThreadProvider, StatusJsonProvider, TranslationMirror};
pub use target::{PostTarget, TranslationRequest};

pub type PostChain = Vec<DynProvider<PostTarget, NormalizedPost>>;
pub type ThreadChain = Vec<DynProvider<PostTarget, Vec<NormalizedPost>>>;
pub type TranslationChain = Vec<DynProvider<TranslationRequest, String>>;

/// Holds immutable config and provider chains only; share it behind an `Arc`.
pub struct ContentAcquisitionService {
    config: AcquisitionConfig,
    post_providers: PostChain,
    thread_providers: ThreadChain,
    translation_providers: TranslationChain,
}

impl ContentAcquisitionService {
    /// Production chains: JSON endpoints, then mirrors; thread lookups on the
    /// first `thread_mirror_limit` mirrors; translation mirrors in order.
    pub fn from_config(config: AcquisitionConfig) -> Result<Self> {
        let config = config.normalized();
        let client = http::build_client(&config)?;
        let per_call = config.provider_timeout();

        let mut post_providers: PostChain = Vec::new();
        for base in &config.json_endpoints {
            post_providers.push(Box::new(StatusJsonProvider::new(base, client.clone(), per_call)));
        }
        for base in &config.mirrors {
            post_providers.push(Box::new(MirrorPostProvider::new(base, client.clone(), per_call)));
        }

        let thread_providers: ThreadChain = config
            .mirrors
            .iter()
            .take(config.thread_mirror_limit)
            .map(|base| {
                Box::new(MirrorThreadProvider::new(
                    base,
                    client.clone(),
                    config.thread_timeout(),
                )) as DynProvider<PostTarget, Vec<NormalizedPost>>
            })
            .collect();

        let translation_providers: TranslationChain = config
            .translation_mirrors
            .iter()
            .map(|base| {
                Box::new(TranslationMirror::new(base, client.clone(), per_call))
                    as DynProvider<TranslationRequest, String>
            })
            .collect();

        info!(
            target: "acquire",
            post_chain = post_providers.len(),
            thread_chain = thread_providers.len(),
            translation_chain = translation_providers.len(),
            "acquisition service ready"
        );

        Ok(Self::with_providers(
            config,
            post_providers,
            thread_providers,
            translation_providers,
        ))
    }

    /// Arbitrary chains, e.g. fakes in tests.
    pub fn with_providers(
        config: AcquisitionConfig,
        post_providers: PostChain,
        thread_providers: ThreadChain,
        translation_providers: TranslationChain,
    ) -> Self {
        Self {
            config,
            post_providers,
            thread_providers,
            translation_providers,
        }
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Fetch a post by URL, then attach its thread best-effort.
    ///
    /// Errors: `InvalidTarget` for unrecognized URLs (no provider is called),
    /// `AllProvidersExhausted` when every post provider failed. Thread
    /// failures never fail the call.
    pub async fn fetch_post(
        &self,
        url: &str,
    ) -> Result<AcquisitionResult<NormalizedPost>, AcquireError> {
        let target = PostTarget::parse(url)?;
        info!(target: "acquire", handle = %target.handle, id = %target.id, "fetching post");

        let mut result =
            fetch_with_fallback(&self.post_providers, &target, self.config.provider_timeout())
                .await
                .into_outcome()?;

        if let Some(post) = result.payload_mut() {
            let thread = self.fetch_thread(&target, &post.id, &post.author_handle).await;
            post.thread = thread;
        }
        Ok(result)
    }

    /// Runs after the primary fetch; bounded per mirror and as a whole.
    async fn fetch_thread(
        &self,
        target: &PostTarget,
        root_id: &str,
        author_handle: &str,
    ) -> Vec<NormalizedPost> {
        let limit = self.config.thread_mirror_limit.min(self.thread_providers.len());
        if limit == 0 {
            return Vec::new();
        }
        let chain = &self.thread_providers[..limit];
        let lookup = fetch_with_fallback(chain, target, self.config.thread_timeout());

        match tokio::time::timeout(self.config.thread_budget(), lookup).await {
            Ok(res) => {
                let failures = res.errors().len();
                match res.into_payload() {
                    Some(candidates) => {
                        let thread = reconstruct_thread(root_id, author_handle, candidates);
                        debug!(target: "acquire", id = %root_id, replies = thread.len(), "thread reconstructed");
                        thread
                    }
                    None => {
                        debug!(target: "acquire", id = %root_id, failures, "thread unavailable");
                        Vec::new()
                    }
                }
            }
            Err(_) => {
                warn!(
                    target: "acquire",
                    id = %root_id,
                    budget_ms = self.config.thread_budget_ms,
                    "thread lookup exceeded budget"
                );
                Vec::new()
            }
        }
    }

    /// Translate `text` through the mirror chain. Blank or oversized text and
    /// malformed language codes are `InvalidTarget`.
    pub async fn fetch_translation(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<AcquisitionResult<String>, AcquireError> {
        let req = TranslationRequest::new(
            text,
            source_lang,
            target_lang,
            self.config.max_translation_chars,
        )?;
        info!(
            target: "acquire",
            text_id = %anon_hash(&req.text),
            src_lang = %req.source,
            dst_lang = %req.target,
            "fetching translation"
        );
        fetch_with_fallback(
            &self.translation_providers,
            &req,
            self.config.provider_timeout(),
        )
        .await
        .into_outcome()
    }
}
