// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "ACQUIRE_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/acquire.toml";
pub const DEFAULT_JSON_PATH: &str = "config/acquire.json";

pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_THREAD_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_THREAD_BUDGET_MS: u64 = 8_000;
pub const DEFAULT_THREAD_MIRROR_LIMIT: usize = 2;
pub const DEFAULT_MAX_TRANSLATION_CHARS: usize = 5_000;

/// Provider chains and limits for content acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Structured JSON status endpoints, tried first.
    pub json_endpoints: Vec<String>,
    /// HTML mirror front-ends, tried after the JSON endpoints.
    pub mirrors: Vec<String>,
    /// Translation mirrors, tried in order.
    pub translation_mirrors: Vec<String>,
    pub provider_timeout_ms: u64,
    /// Per-mirror bound during thread reconstruction.
    pub thread_timeout_ms: u64,
    /// Bound for the whole thread phase.
    pub thread_budget_ms: u64,
    /// How many mirrors (from the front of `mirrors`) are asked for the thread.
    pub thread_mirror_limit: usize,
    pub max_translation_chars: usize,
    pub user_agent: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            json_endpoints: vec!["https://api.fxtwitter.com".to_string()],
            mirrors: vec![
                "https://nitter.net".to_string(),
                "https://nitter.poast.org".to_string(),
                "https://xcancel.com".to_string(),
            ],
            translation_mirrors: vec![
                "https://lingva.ml".to_string(),
                "https://lingva.lunar.icu".to_string(),
                "https://translate.plausibility.cloud".to_string(),
            ],
            provider_timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
            thread_timeout_ms: DEFAULT_THREAD_TIMEOUT_MS,
            thread_budget_ms: DEFAULT_THREAD_BUDGET_MS,
            thread_mirror_limit: DEFAULT_THREAD_MIRROR_LIMIT,
            max_translation_chars: DEFAULT_MAX_TRANSLATION_CHARS,
            user_agent: concat!("content-ingest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AcquisitionConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn thread_timeout(&self) -> Duration {
        Duration::from_millis(self.thread_timeout_ms)
    }

    pub fn thread_budget(&self) -> Duration {
        Duration::from_millis(self.thread_budget_ms)
    }

    /// Trim list entries, drop blanks and duplicates (keeping order), and
    /// replace zero limits with defaults.
    pub fn normalized(mut self) -> Self {
        self.json_endpoints = clean_list(self.json_endpoints);
        self.mirrors = clean_list(self.mirrors);
        self.translation_mirrors = clean_list(self.translation_mirrors);
        if self.provider_timeout_ms == 0 {
            self.provider_timeout_ms = DEFAULT_PROVIDER_TIMEOUT_MS;
        }
        if self.thread_timeout_ms == 0 {
            self.thread_timeout_ms = DEFAULT_THREAD_TIMEOUT_MS;
        }
        if self.thread_budget_ms == 0 {
            self.thread_budget_ms = DEFAULT_THREAD_BUDGET_MS;
        }
        if self.max_translation_chars == 0 {
            self.max_translation_chars = DEFAULT_MAX_TRANSLATION_CHARS;
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = Self::default().user_agent;
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<AcquisitionConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading acquisition config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing acquisition config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $ACQUIRE_CONFIG_PATH
/// 2) config/acquire.toml
/// 3) config/acquire.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<AcquisitionConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON_PATH);
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(AcquisitionConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AcquisitionConfig> {
    // JSON objects start with '{'; everything else is treated as TOML first.
    let looks_json = hint_ext == "json" || s.trim_start().starts_with('{');
    let parsed = if looks_json {
        serde_json::from_str::<AcquisitionConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| toml::from_str::<AcquisitionConfig>(s).map_err(anyhow::Error::from))
    } else {
        toml::from_str::<AcquisitionConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str::<AcquisitionConfig>(s).map_err(anyhow::Error::from))
    };
    parsed
        .map(AcquisitionConfig::normalized)
        .map_err(|e| anyhow!("unsupported acquisition config format: {e}"))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().trim_end_matches('/');
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
