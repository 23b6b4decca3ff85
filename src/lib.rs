// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod runner;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Analysis, AnalysisStatus, Analyzer, SentimentLabel};
pub use crate::config::Config;
pub use crate::dedup::{fingerprint, CacheEntry, DedupCache};
pub use crate::error::{ConfigError, FetchError, SecurityError, TranslationError};
pub use crate::pipeline::{BatchOrchestrator, BatchOutcome, BatchReport, RunStats};
