// src/dedup.rs
//! Content-addressed dedup cache.
//!
//! The fingerprint is the only identity a review has: SHA-256 over the
//! normalized text. Entries are append-only and kept in insertion order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::ingest::{normalize_text, Review};

/// Lowercase hex SHA-256 of `normalize_text(text)`.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// One analyzed review. Immutable once cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub text: String,
    #[serde(rename = "hash", alias = "fingerprint", default)]
    pub fingerprint: String,
    pub sentiment: f64,
    pub language: String,
    pub rating: f64,
    pub author: String,
    pub date: String,
}

impl CacheEntry {
    pub fn from_review(review: Review, sentiment: f64, language: String) -> Self {
        Self {
            fingerprint: fingerprint(&review.text),
            text: review.text,
            sentiment,
            language,
            rating: review.rating,
            author: review.author,
            date: review.date,
        }
    }

    /// Scores outside `[-1, 1]` (or NaN) come from a corrupted file and are
    /// left out of statistics.
    pub fn has_valid_score(&self) -> bool {
        self.sentiment.is_finite() && (-1.0..=1.0).contains(&self.sentiment)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DedupCache {
    entries: Vec<CacheEntry>,
    index: HashSet<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted entries. The stored fingerprint is not trusted:
    /// it is recomputed from the text, and later duplicates are dropped.
    pub fn from_entries(entries: Vec<CacheEntry>) -> Self {
        let mut cache = Self::new();
        let total = entries.len();
        let mut rekeyed = 0usize;
        for mut entry in entries {
            let fp = fingerprint(&entry.text);
            if entry.fingerprint != fp {
                rekeyed += 1;
                entry.fingerprint = fp;
            }
            cache.insert(entry);
        }
        if rekeyed > 0 {
            tracing::info!(target: "dedup", rekeyed, "recomputed stale fingerprints in persisted cache");
        }
        let dropped = total - cache.len();
        if dropped > 0 {
            tracing::warn!(target: "dedup", dropped, "persisted cache contained duplicate fingerprints");
        }
        cache
    }

    pub fn is_new(&self, text: &str) -> bool {
        !self.index.contains(&fingerprint(text))
    }

    pub fn contains_fingerprint(&self, fp: &str) -> bool {
        self.index.contains(fp)
    }

    /// No-op (returns `false`) when the fingerprint is already present.
    pub fn insert(&mut self, entry: CacheEntry) -> bool {
        if !self.index.insert(entry.fingerprint.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Keep only reviews not yet cached, also collapsing repeats inside
    /// `reviews` itself. Returns the survivors and the number dropped.
    pub fn filter_new(&self, reviews: Vec<Review>) -> (Vec<Review>, usize) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut keep = Vec::with_capacity(reviews.len());
        let mut dup = 0usize;
        for review in reviews {
            let fp = fingerprint(&review.text);
            if self.index.contains(&fp) || !seen.insert(fp) {
                dup += 1;
                continue;
            }
            keep.push(review);
        }
        (keep, dup)
    }

    pub fn all(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<CacheEntry> {
        self.entries
    }
}
