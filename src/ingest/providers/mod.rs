// src/ingest/providers/mod.rs
pub mod fixture;
pub mod http;

pub use fixture::FileFetcher;
pub use http::HttpFetcher;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::ingest::types::{Fetcher, RawReview};

/// Pick an adapter for `source`: `http(s)://` → HTTP, anything else is a
/// local JSON file.
pub fn for_source(source: &str, timeout: Duration) -> Arc<dyn Fetcher> {
    let lower = source.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Arc::new(HttpFetcher::new(timeout))
    } else {
        Arc::new(FileFetcher)
    }
}

/// Accepts either a bare array of records or an object with a `reviews`
/// array. Anything else is a structural mismatch.
pub(crate) fn records_from_document(body: &str) -> Result<Vec<RawReview>, FetchError> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Parsing(format!("invalid JSON document: {e}")))?;
    let items = match &doc {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("reviews") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FetchError::Parsing(
                    "document has no `reviews` array".into(),
                ))
            }
        },
        _ => {
            return Err(FetchError::Parsing(
                "document is neither an array nor an object".into(),
            ))
        }
    };
    Ok(items.iter().map(RawReview::from_value).collect())
}
