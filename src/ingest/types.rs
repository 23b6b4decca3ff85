// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// A record as yielded by a source, before validation. Every field is
/// optional; the extractor decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub text: Option<String>,
    /// Rating token as found on the page, e.g. `"4.0 stars"` or `"5"`.
    pub rating: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl RawReview {
    /// Lenient conversion from one JSON record. Fields with an unexpected
    /// type are treated as missing so a single odd record cannot fail the
    /// whole page.
    pub fn from_value(v: &Value) -> Self {
        let string_field = |name: &str| v.get(name).and_then(Value::as_str).map(str::to_string);
        let rating = match v.get("rating") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            text: string_field("text"),
            rating,
            author: string_field("author"),
            date: string_field("date"),
        }
    }
}

/// A validated review. Transient: it is either dropped as a duplicate or
/// turned into a cache entry after analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    pub rating: f64,
    pub author: String,
    pub date: String,
}

/// Source of review pages. Opening a session is the expensive, stateful part
/// (browser context, cookies, auth); a session can be discarded and reopened
/// at any time.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait FetchSession: Send {
    /// Load every raw record for `source`. Transport problems and timeouts are
    /// `FetchError::Network`; a page that loaded but has the wrong shape is
    /// `FetchError::Parsing`.
    async fn load(&mut self, source: &str) -> Result<Vec<RawReview>, FetchError>;

    /// Release the session. Called at most once; the session is dropped
    /// right after.
    async fn close(&mut self) {}
}
