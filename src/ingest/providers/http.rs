// src/ingest/providers/http.rs
use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;

use super::records_from_document;
use crate::error::FetchError;
use crate::ingest::types::{FetchSession, Fetcher, RawReview};

const USER_AGENT: &str = concat!("feedback-pulse/", env!("CARGO_PKG_VERSION"));

/// Fetches a JSON review document over HTTP. Each session owns its own
/// client (connection pool and cookie state), so discarding a session after
/// a failure really starts from scratch.
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(format!("building http client: {e}")))?;
        Ok(Box::new(HttpSession { client }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

struct HttpSession {
    client: reqwest::Client,
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn load(&mut self, source: &str) -> Result<Vec<RawReview>, FetchError> {
        let resp = self
            .client
            .get(source)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            counter!("pulse_fetch_http_errors_total").increment(1);
            return Err(FetchError::Network(format!("HTTP {status} from {source}")));
        }

        // Transport errors while streaming the body are still transient.
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let records = records_from_document(&body)?;
        tracing::debug!(target: "fetch", source, records = records.len(), "http page loaded");
        Ok(records)
    }
}
