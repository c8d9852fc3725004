// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod acquire;
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod metrics;
pub mod sanitize;
pub mod structure;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::acquire::{ContentAcquisitionService, NormalizedPost, PostTarget};
pub use crate::api::router;
pub use crate::config::AcquisitionConfig;
pub use crate::error::{AcquireError, ProviderError, ProviderFailure};
pub use crate::fallback::{fetch_with_fallback, AcquisitionResult, Provider};
pub use crate::structure::{Block, DocumentStructurer, StructuredDocument};

