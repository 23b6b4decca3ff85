// src/pipeline.rs
//! One ingestion batch: fetch → extract → dedup → analyze → accumulate.

use metrics::counter;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

use crate::analyze::{Analyzer, SentimentLabel};
use crate::config::SentimentThresholds;
use crate::dedup::{CacheEntry, DedupCache};
use crate::error::FetchErrorKind;
use crate::ingest::{Extractor, FetchController};

/// Aggregates over cache entries with a valid score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub total_reviews: usize,
    pub average_sentiment: f64,
    pub languages: BTreeSet<String>,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl RunStats {
    pub fn from_entries(entries: &[CacheEntry], thresholds: &SentimentThresholds) -> Self {
        let mut stats = Self::default();
        let mut sum = 0.0;
        for e in entries.iter().filter(|e| e.has_valid_score()) {
            stats.total_reviews += 1;
            sum += e.sentiment;
            stats.languages.insert(e.language.clone());
            match SentimentLabel::from_score(e.sentiment, thresholds) {
                SentimentLabel::Positive => stats.positive += 1,
                SentimentLabel::Neutral => stats.neutral += 1,
                SentimentLabel::Negative => stats.negative += 1,
            }
        }
        if stats.total_reviews > 0 {
            stats.average_sentiment = sum / stats.total_reviews as f64;
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    FetchFailed(FetchErrorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub fetched: usize,
    pub rejected: usize,
    pub duplicates: usize,
    /// Entries added to the cache.
    pub analyzed: usize,
    /// New reviews whose analysis failed; left out of the cache.
    pub failed: usize,
    pub outcome: BatchOutcome,
    /// The entries added by this batch, in fetch order.
    pub added: Vec<CacheEntry>,
}

impl BatchReport {
    fn fetch_failed(kind: FetchErrorKind) -> Self {
        Self {
            fetched: 0,
            rejected: 0,
            duplicates: 0,
            analyzed: 0,
            failed: 0,
            outcome: BatchOutcome::FetchFailed(kind),
            added: Vec::new(),
        }
    }
}

pub struct BatchOrchestrator {
    controller: FetchController,
    extractor: Extractor,
    analyzer: Analyzer,
}

impl BatchOrchestrator {
    pub fn new(controller: FetchController, extractor: Extractor, analyzer: Analyzer) -> Self {
        Self {
            controller,
            extractor,
            analyzer,
        }
    }

    pub fn controller(&self) -> &FetchController {
        &self.controller
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Run one batch against `prior`. A failed fetch hands `prior` back
    /// untouched.
    pub async fn run(&mut self, source: &str, prior: DedupCache) -> (DedupCache, BatchReport) {
        let t0 = Instant::now();
        let fetched = self.controller.fetch(source).await;
        self.controller.shutdown().await;

        let raws = match fetched {
            Ok(raws) => raws,
            Err(e) => {
                counter!("pulse_fetch_failures_total").increment(1);
                tracing::error!(target: "pipeline", source, error = %e, "fetch failed, keeping prior cache");
                return (prior, BatchReport::fetch_failed(e.kind()));
            }
        };
        counter!("pulse_reviews_fetched_total").increment(raws.len() as u64);

        let (reviews, rejected) = self.extractor.extract_all(&raws);
        let (fresh, duplicates) = prior.filter_new(reviews);
        counter!("pulse_reviews_duplicate_total").increment(duplicates as u64);
        tracing::info!(
            target: "pipeline",
            fetched = raws.len(),
            rejected,
            duplicates,
            new = fresh.len(),
            "batch filtered"
        );

        let texts: Vec<String> = fresh.iter().map(|r| r.text.clone()).collect();
        let analyses = self.analyzer.analyze_batch(texts).await;

        let mut cache = prior;
        let mut added = Vec::new();
        let mut failed = 0usize;
        for (review, analysis) in fresh.into_iter().zip(analyses) {
            if !analysis.is_cacheable() {
                failed += 1;
                tracing::warn!(target: "pipeline", author = %review.author, status = ?analysis.status, "analysis failed, review not cached");
                continue;
            }
            let entry = CacheEntry::from_review(review, analysis.sentiment, analysis.language);
            if cache.insert(entry.clone()) {
                added.push(entry);
            }
        }
        counter!("pulse_reviews_analyzed_total").increment(added.len() as u64);

        let report = BatchReport {
            fetched: raws.len(),
            rejected,
            duplicates,
            analyzed: added.len(),
            failed,
            outcome: BatchOutcome::Completed,
            added,
        };
        tracing::info!(
            target: "pipeline",
            analyzed = report.analyzed,
            failed = report.failed,
            cache_size = cache.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "batch completed"
        );
        (cache, report)
    }
}
