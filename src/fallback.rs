// src/fallback.rs
//! Ordered provider fallback: try each provider in priority order, stop at the
//! first success, record every failure in trial order.

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::{AcquireError, ProviderError, ProviderFailure};
use crate::telemetry::ensure_metrics_described;

/// One external source able to satisfy an acquisition request.
#[async_trait]
pub trait Provider: Send + Sync {
    type Target: Sync;
    type Output: Send;

    async fn fetch(&self, target: &Self::Target) -> Result<Self::Output, ProviderError>;

    fn name(&self) -> &str;

    /// Per-provider bound; the chain default applies when `None`.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Boxed provider chain element.
pub type DynProvider<T, O> = Box<dyn Provider<Target = T, Output = O>>;

/// Outcome of a fallback chain. `success` is true iff `payload` is present;
/// the fields stay private so only the two constructors can build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionResult<T> {
    success: bool,
    source: Option<String>,
    payload: Option<T>,
    errors: Vec<ProviderFailure>,
}

impl<T> AcquisitionResult<T> {
    pub fn succeeded(source: impl Into<String>, payload: T, errors: Vec<ProviderFailure>) -> Self {
        Self {
            success: true,
            source: Some(source.into()),
            payload: Some(payload),
            errors,
        }
    }

    pub fn exhausted(errors: Vec<ProviderFailure>) -> Self {
        Self {
            success: false,
            source: None,
            payload: None,
            errors,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Name of the provider that produced the payload.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn payload_mut(&mut self) -> Option<&mut T> {
        self.payload.as_mut()
    }

    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Failures in trial order, including those before a success.
    pub fn errors(&self) -> &[ProviderFailure] {
        &self.errors
    }

    /// Successful results pass through; exhausted chains become one aggregate error.
    pub fn into_outcome(self) -> Result<Self, AcquireError> {
        if self.success {
            Ok(self)
        } else {
            Err(AcquireError::AllProvidersExhausted {
                failures: self.errors,
            })
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AcquisitionResult<U> {
        AcquisitionResult {
            success: self.success,
            source: self.source,
            payload: self.payload.map(f),
            errors: self.errors,
        }
    }
}

/// Try `providers` strictly in order. Later providers are never invoked once
/// one succeeds. No retries, no concurrency.
pub async fn fetch_with_fallback<T, O>(
    providers: &[DynProvider<T, O>],
    target: &T,
    default_timeout: Duration,
) -> AcquisitionResult<O>
where
    T: Sync + 'static,
    O: Send + 'static,
{
    ensure_metrics_described();

    let mut errors = Vec::new();
    for p in providers {
        let limit = p.timeout().unwrap_or(default_timeout);
        let t0 = Instant::now();
        counter!("acquire_attempts_total").increment(1);

        let outcome = match tokio::time::timeout(limit, p.fetch(target)).await {
            Ok(res) => res,
            Err(_) => Err(ProviderError::Timeout {
                after_ms: limit.as_millis() as u64,
            }),
        };
        histogram!("acquire_provider_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match outcome {
            Ok(payload) => {
                tracing::debug!(
                    target: "acquire",
                    provider = p.name(),
                    failed_before = errors.len(),
                    "provider succeeded"
                );
                return AcquisitionResult::succeeded(p.name(), payload, errors);
            }
            Err(reason) => {
                tracing::warn!(target: "acquire", provider = p.name(), error = %reason, "provider failed");
                counter!("acquire_provider_errors_total", "provider" => p.name().to_string())
                    .increment(1);
                errors.push(ProviderFailure {
                    provider: p.name().to_string(),
                    reason,
                });
            }
        }
    }

    counter!("acquire_exhausted_total").increment(1);
    tracing::warn!(target: "acquire", attempts = errors.len(), "all providers exhausted");
    AcquisitionResult::exhausted(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fake {
        name: &'static str,
        result: Result<&'static str, ProviderError>,
        delay: Option<Duration>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Provider for Fake {
        type Target = String;
        type Output = String;

        async fn fetch(&self, target: &String) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.result.clone().map(|s| format!("{s}:{target}"))
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn fake(
        name: &'static str,
        result: Result<&'static str, ProviderError>,
        calls: &Arc<AtomicUsize>,
    ) -> DynProvider<String, String> {
        Box::new(Fake {
            name,
            result,
            delay: None,
            calls: calls.clone(),
        })
    }

    #[tokio::test]
    async fn first_success_wins_and_later_providers_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let providers = vec![
            fake("a", Err(ProviderError::HttpStatus(500)), &calls),
            fake("b", Ok("B"), &calls),
            fake("c", Ok("C"), &calls),
        ];
        let res =
            fetch_with_fallback(&providers, &"t".to_string(), Duration::from_secs(1)).await;
        assert!(res.success());
        assert_eq!(res.source(), Some("b"));
        assert_eq!(res.payload().map(String::as_str), Some("B:t"));
        assert_eq!(res.errors().len(), 1);
        assert_eq!(res.errors()[0].provider, "a");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn all_failing_records_every_error_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let providers = vec![
            fake("a", Err(ProviderError::HttpStatus(503)), &calls),
            fake("b", Err(ProviderError::Shape("html".into())), &calls),
            fake("c", Err(ProviderError::MissingField("text")), &calls),
            fake("d", Err(ProviderError::Network("reset".into())), &calls),
        ];
        let res =
            fetch_with_fallback(&providers, &"t".to_string(), Duration::from_secs(1)).await;
        assert!(!res.success());
        assert!(res.payload().is_none());
        assert!(res.source().is_none());
        let names: Vec<_> = res.errors().iter().map(|e| e.provider.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);

        let err = res.into_outcome().unwrap_err();
        assert_eq!(err.failures().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_and_falls_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let providers: Vec<DynProvider<String, String>> = vec![
            Box::new(Fake {
                name: "slow",
                result: Ok("never"),
                delay: Some(Duration::from_secs(30)),
                calls: calls.clone(),
            }),
            fake("fast", Ok("F"), &calls),
        ];
        let res =
            fetch_with_fallback(&providers, &"t".to_string(), Duration::from_secs(2)).await;
        assert_eq!(res.source(), Some("fast"));
        assert_eq!(
            res.errors()[0].reason,
            ProviderError::Timeout { after_ms: 2000 }
        );
    }

    #[tokio::test]
    async fn empty_chain_is_exhausted_with_no_errors() {
        let providers: Vec<DynProvider<String, String>> = Vec::new();
        let res =
            fetch_with_fallback(&providers, &"t".to_string(), Duration::from_secs(1)).await;
        assert!(!res.success());
        assert!(res.errors().is_empty());
    }

    #[test]
    fn map_keeps_invariant() {
        let ok = AcquisitionResult::succeeded("p", 2, vec![]).map(|n| n * 2);
        assert!(ok.success());
        assert_eq!(ok.payload(), Some(&4));
        let bad: AcquisitionResult<i32> = AcquisitionResult::exhausted(vec![]);
        assert!(bad.map(|n| n + 1).payload().is_none());
    }

    #[test]
    fn success_flag_always_matches_payload_presence() {
        let failure = ProviderFailure {
            provider: "a".into(),
            reason: ProviderError::HttpStatus(502),
        };
        let mut ok = AcquisitionResult::succeeded("b", "x".to_string(), vec![failure.clone()]);
        assert_eq!(ok.success(), ok.payload().is_some());
        if let Some(p) = ok.payload_mut() {
            p.push('y');
        }
        let ok = ok.into_outcome().unwrap();
        assert_eq!(ok.errors(), &[failure.clone()][..]);
        assert_eq!(ok.into_payload().as_deref(), Some("xy"));

        let bad: AcquisitionResult<String> = AcquisitionResult::exhausted(vec![failure]);
        assert_eq!(bad.success(), bad.payload().is_some());
        assert!(bad.source().is_none());

        let v = serde_json::to_value(AcquisitionResult::succeeded("b", 1, vec![])).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["source"], "b");
        assert_eq!(v["payload"], 1);
    }
}
