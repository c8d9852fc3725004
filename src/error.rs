// src/error.rs
//! Error kinds for acquisitions. Provider-level errors stay inside the
//! fallback chain; only `AcquireError` is reported to callers.

use serde::Serialize;
use std::fmt;

/// Why a single provider attempt failed. Recorded, then the next provider runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderError {
    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected payload shape: {0}")]
    Shape(String),
    /// A required field (author, text, translation) was not found.
    #[error("required field `{0}` missing")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // The client's own timeout is a backstop with no configured bound to
        // report; chain timeouts are produced by the fallback loop instead.
        if e.is_timeout() {
            return ProviderError::Network(format!("client timeout: {e}"));
        }
        if let Some(status) = e.status() {
            return ProviderError::HttpStatus(status.as_u16());
        }
        if e.is_decode() {
            return ProviderError::Shape(e.to_string());
        }
        ProviderError::Network(e.to_string())
    }
}

/// One failed attempt in a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Failures that cross the core boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// Malformed URL or input; no provider was attempted.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// Every provider in the chain failed.
    #[error("all {} providers failed: {}", .failures.len(), summarize(.failures))]
    AllProvidersExhausted { failures: Vec<ProviderFailure> },
}

impl AcquireError {
    /// Machine-readable kind for HTTP responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AcquireError::InvalidTarget(_) => "invalid_target",
            AcquireError::AllProvidersExhausted { .. } => "all_providers_exhausted",
        }
    }

    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            AcquireError::InvalidTarget(_) => &[],
            AcquireError::AllProvidersExhausted { failures } => failures,
        }
    }
}

fn summarize(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no providers configured".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
