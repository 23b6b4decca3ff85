// src/ingest/extract.rs
use metrics::counter;

use crate::config::ParserConfig;
use crate::ingest::types::{RawReview, Review};

pub const DEFAULT_AUTHOR: &str = "Anonymous";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Turns raw records into validated reviews.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    min_rating: f64,
    max_rating: f64,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            min_rating: 0.0,
            max_rating: 5.0,
        }
    }
}

impl Extractor {
    /// Bounds are clamped into `[0, 5]`.
    pub fn new(min_rating: f64, max_rating: f64) -> Self {
        Self {
            min_rating: min_rating.clamp(0.0, 5.0),
            max_rating: max_rating.clamp(0.0, 5.0),
        }
    }

    pub fn from_config(cfg: &ParserConfig) -> Self {
        Self::new(cfg.min_rating, cfg.max_rating)
    }

    /// `None` for records without text or with a missing, unparsable or
    /// out-of-range rating. Never panics on malformed input.
    pub fn extract(&self, raw: &RawReview) -> Option<Review> {
        let text = raw.text.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            tracing::debug!(target: "extract", "record skipped: empty text");
            return None;
        }

        let Some(token) = raw.rating.as_deref() else {
            tracing::debug!(target: "extract", "record skipped: missing rating");
            return None;
        };
        let Some(rating) = parse_rating_token(token) else {
            tracing::warn!(target: "extract", rating = token, "record skipped: unparsable rating");
            return None;
        };
        if !(self.min_rating..=self.max_rating).contains(&rating) {
            tracing::warn!(target: "extract", rating, "record skipped: rating out of range");
            return None;
        }

        let author = non_blank(raw.author.as_deref())
            .unwrap_or(DEFAULT_AUTHOR)
            .to_string();
        let date = non_blank(raw.date.as_deref())
            .map(str::to_string)
            .unwrap_or_else(today);

        Some(Review {
            text: text.to_string(),
            rating,
            author,
            date,
        })
    }

    /// Extract every record; returns the kept reviews and the rejected count.
    pub fn extract_all(&self, raws: &[RawReview]) -> (Vec<Review>, usize) {
        let kept: Vec<Review> = raws.iter().filter_map(|r| self.extract(r)).collect();
        let rejected = raws.len() - kept.len();
        counter!("pulse_reviews_rejected_total").increment(rejected as u64);
        if rejected > 0 {
            tracing::info!(target: "extract", kept = kept.len(), rejected, "records rejected by validation");
        }
        (kept, rejected)
    }
}

/// First whitespace-separated token as a number; `,` is accepted as the
/// decimal separator (`"4,5 stars"` → 4.5).
pub fn parse_rating_token(s: &str) -> Option<f64> {
    let first = s.split_whitespace().next()?;
    let v: f64 = first.replace(',', ".").parse().ok()?;
    v.is_finite().then_some(v)
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn today() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}
