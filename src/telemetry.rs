// src/telemetry.rs
//! Logging setup, anonymized ids for log lines, and metric descriptions.

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "INGEST_LOG_JSON";
const DEFAULT_FILTER: &str = "content_ingest=info,acquire=info,structure=info,warn";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("acquire_attempts_total", "Provider attempts across all chains.");
        describe_counter!(
            "acquire_provider_errors_total",
            "Provider attempts that failed (timeout, HTTP, shape)."
        );
        describe_counter!(
            "acquire_exhausted_total",
            "Chains where every provider failed."
        );
        describe_histogram!("acquire_provider_ms", "Provider call time in milliseconds.");
        describe_counter!(
            "structure_documents_total",
            "Documents structured from decoded text."
        );
    });
}

/// Install the global subscriber. Compact output by default, JSON lines when
/// `INGEST_LOG_JSON=1`. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(ENV_LOG_JSON).ok().as_deref() == Some("1");

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Short stable id for user text; raw text is never logged.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
