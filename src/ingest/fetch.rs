// src/ingest/fetch.rs
//! Fetch-and-retry controller.
//!
//! Owns at most one `FetchSession`. The session is opened lazily, thrown away
//! after any retryable failure (stale session state is not reused), and
//! released by `shutdown()`. Retries are sequential with `base^i` backoff.
//!
//! State machine:
//! `Idle → Connecting → Fetching → {Succeeded | RetryableFailed → Connecting | Exhausted | Failed}`

use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ParserConfig;
use crate::error::FetchError;
use crate::ingest::types::{FetchSession, Fetcher, RawReview};

const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    /// Opening (or reusing) the session for attempt `attempt` (1-based).
    Connecting { attempt: u32 },
    Fetching { attempt: u32 },
    Succeeded { attempts: u32 },
    /// Attempt failed with a retryable error; the session was discarded.
    RetryableFailed { attempt: u32 },
    /// Every allowed attempt failed with a retryable error.
    Exhausted { attempts: u32 },
    /// Non-retryable (structural) failure.
    Failed { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed (>= 1).
    pub max_retries: u32,
    /// Bound on each session open and each page load.
    pub timeout: Duration,
    pub backoff_base: f64,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &ParserConfig) -> Self {
        Self {
            max_retries: cfg.max_retries.max(1),
            timeout: cfg.timeout,
            backoff_base: cfg.backoff_base,
            backoff_unit: cfg.backoff_unit,
        }
    }

    /// Wait after failed attempt `attempt` (0-based): `unit * base^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.max(1.0).powi(attempt.min(64) as i32);
        Duration::try_from_secs_f64(self.backoff_unit.as_secs_f64() * factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

pub struct FetchController {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    max_reviews: Option<usize>,
    session: Option<Box<dyn FetchSession>>,
    state: FetchState,
    transitions: Vec<FetchState>,
    attempts: u32,
}

impl FetchController {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            policy,
            max_reviews: None,
            session: None,
            state: FetchState::Idle,
            transitions: vec![FetchState::Idle],
            attempts: 0,
        }
    }

    pub fn from_config(fetcher: Arc<dyn Fetcher>, cfg: &ParserConfig) -> Self {
        Self::new(fetcher, RetryPolicy::from_config(cfg)).with_max_reviews(cfg.max_reviews)
    }

    /// Truncate every fetched list to at most `max` records.
    pub fn with_max_reviews(mut self, max: Option<usize>) -> Self {
        self.max_reviews = max;
        self
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Every state entered since construction, in order.
    pub fn transitions(&self) -> &[FetchState] {
        &self.transitions
    }

    /// Attempts made by the most recent `fetch` call.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Fetch raw records for `source`, retrying transient failures.
    pub async fn fetch(&mut self, source: &str) -> Result<Vec<RawReview>, FetchError> {
        let t0 = Instant::now();
        self.attempts = 0;
        let max = self.policy.max_retries.max(1);

        for attempt in 0..max {
            self.attempts = attempt + 1;
            counter!("pulse_fetch_attempts_total").increment(1);

            match self.attempt(source, attempt + 1).await {
                Ok(mut records) => {
                    if let Some(cap) = self.max_reviews {
                        records.truncate(cap);
                    }
                    self.enter(FetchState::Succeeded {
                        attempts: attempt + 1,
                    });
                    histogram!("pulse_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                    tracing::info!(
                        target: "fetch",
                        fetcher = self.fetcher.name(),
                        records = records.len(),
                        attempts = attempt + 1,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "fetch succeeded"
                    );
                    return Ok(records);
                }
                Err(err @ FetchError::Parsing(_)) => {
                    self.enter(FetchState::Failed {
                        attempts: attempt + 1,
                    });
                    tracing::error!(target: "fetch", error = %err, "structural failure, not retrying");
                    return Err(err);
                }
                Err(err) => {
                    // Never reuse a session that just failed.
                    self.discard_session().await;

                    if attempt + 1 >= max {
                        self.enter(FetchState::Exhausted {
                            attempts: attempt + 1,
                        });
                        tracing::error!(target: "fetch", error = %err, attempts = attempt + 1, "retries exhausted");
                        return Err(err);
                    }

                    self.enter(FetchState::RetryableFailed {
                        attempt: attempt + 1,
                    });
                    counter!("pulse_fetch_retries_total").increment(1);
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        target: "fetch",
                        error = %err,
                        attempt = attempt + 1,
                        max_retries = max,
                        delay_ms = delay.as_millis() as u64,
                        "network error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // `max >= 1`, so the loop always returns.
        Err(FetchError::Network("no fetch attempt was made".into()))
    }

    async fn attempt(&mut self, source: &str, attempt: u32) -> Result<Vec<RawReview>, FetchError> {
        self.enter(FetchState::Connecting { attempt });
        if self.session.is_none() {
            let opened = tokio::time::timeout(self.policy.timeout, self.fetcher.open_session())
                .await
                .map_err(|_| self.timeout_error("opening session"))?;
            // Open failures are transport failures whatever the adapter says.
            let session = opened.map_err(|e| match e {
                FetchError::Parsing(m) => FetchError::Network(m),
                other => other,
            })?;
            tracing::debug!(target: "fetch", fetcher = self.fetcher.name(), "session opened");
            self.session = Some(session);
        }

        self.enter(FetchState::Fetching { attempt });
        let timeout = self.policy.timeout;
        let Some(session) = self.session.as_mut() else {
            return Err(FetchError::Network("session unavailable".into()));
        };
        let loaded = tokio::time::timeout(timeout, session.load(source)).await;
        match loaded {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error("loading reviews")),
        }
    }

    /// Release the session, if any. Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            tracing::debug!(target: "fetch", fetcher = self.fetcher.name(), "session released");
        }
    }

    async fn discard_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            tracing::debug!(target: "fetch", "session discarded after failure");
        }
    }

    fn enter(&mut self, state: FetchState) {
        self.state = state;
        self.transitions.push(state);
    }

    fn timeout_error(&self, what: &str) -> FetchError {
        FetchError::Network(format!(
            "timeout after {}ms while {what}",
            self.policy.timeout.as_millis()
        ))
    }
}

impl Drop for FetchController {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!(target: "fetch", "session dropped without shutdown");
        }
    }
}
