// src/acquire/http.rs
use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::AcquisitionConfig;
use crate::error::ProviderError;

/// Shared client for every provider. Per-attempt bounds are enforced by the
/// fallback chain; the client timeout is only a backstop.
pub fn build_client(cfg: &AcquisitionConfig) -> Result<reqwest::Client> {
    let backstop = cfg.provider_timeout().max(cfg.thread_timeout()) + Duration::from_secs(1);
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(Duration::from_secs(4).min(backstop))
        .timeout(backstop)
        .build()
        .context("building provider http client")
}

/// GET `url` and return the body. Non-2xx is a provider failure.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, ProviderError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ProviderError::HttpStatus(status.as_u16()));
    }
    Ok(resp.text().await?)
}

/// Base URL without scheme, for provider names (`mirror:nitter.net`).
pub fn label_of(base: &str) -> String {
    let Ok(u) = reqwest::Url::parse(base) else {
        return base.to_string();
    };
    let Some(host) = u.host_str() else {
        return base.to_string();
    };
    let mut label = match u.port() {
        Some(p) => format!("{host}:{p}"),
        None => host.to_string(),
    };
    let path = u.path().trim_end_matches('/');
    label.push_str(path);
    label
}
