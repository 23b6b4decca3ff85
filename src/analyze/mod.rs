// src/analyze/mod.rs
//! Per-review analysis: normalize → detect language → translate when needed
//! → lexicon polarity. `analyze_batch` fans out over a bounded worker pool.

pub mod language;
pub mod memo;
pub mod sentiment;
pub mod translate;

pub use language::{Detection, LanguageDetector, StopwordDetector, UNKNOWN};
pub use memo::BoundedMemo;
pub use sentiment::SentimentLabel;
pub use translate::{CachingTranslator, DisabledTranslator, HttpTranslator, Translator};

use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{AnalyzerConfig, SentimentThresholds};
use crate::ingest::normalize_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Scored in the target language (directly or after translation).
    Scored,
    /// Translation failed or timed out; score is 0.0, language is kept.
    Untranslated,
    /// Absent or blank input.
    Empty,
    /// Internal failure (worker panic, invalid score).
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub sentiment: f64,
    pub language: String,
    pub status: AnalysisStatus,
}

impl Analysis {
    fn fallback(status: AnalysisStatus) -> Self {
        Self {
            sentiment: 0.0,
            language: UNKNOWN.to_string(),
            status,
        }
    }

    pub fn failed() -> Self {
        Self::fallback(AnalysisStatus::Failed)
    }

    /// Results worth persisting. Empty and failed analyses are retried on a
    /// later run instead.
    pub fn is_cacheable(&self) -> bool {
        matches!(self.status, AnalysisStatus::Scored | AnalysisStatus::Untranslated)
    }

    pub fn into_pair(self) -> (f64, String) {
        (self.sentiment, self.language)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentStats {
    pub count: usize,
    pub average: f64,
    pub positive_share: f64,
    pub neutral_share: f64,
    pub negative_share: f64,
}

/// Cheap to clone; clones share memo tables and the translator.
#[derive(Clone)]
pub struct Analyzer {
    inner: Arc<Inner>,
}

struct Inner {
    target_language: String,
    min_confidence: f64,
    max_workers: usize,
    translation_timeout: Duration,
    thresholds: SentimentThresholds,
    detector: Box<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    languages: BoundedMemo<String>,
    sentiments: BoundedMemo<f64>,
}

impl Analyzer {
    pub fn new(cfg: &AnalyzerConfig, translator: Arc<dyn Translator>) -> Self {
        Self::with_detector(cfg, translator, Box::new(StopwordDetector))
    }

    pub fn with_detector(
        cfg: &AnalyzerConfig,
        translator: Arc<dyn Translator>,
        detector: Box<dyn LanguageDetector>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                target_language: cfg.target_language.clone(),
                min_confidence: cfg.min_confidence,
                max_workers: cfg.max_workers.max(1),
                translation_timeout: cfg.translation_timeout,
                thresholds: cfg.thresholds,
                detector,
                translator,
                languages: BoundedMemo::new(cfg.cache_size),
                sentiments: BoundedMemo::new(cfg.cache_size),
            }),
        }
    }

    pub fn thresholds(&self) -> &SentimentThresholds {
        &self.inner.thresholds
    }

    pub fn label(&self, score: f64) -> SentimentLabel {
        SentimentLabel::from_score(score, &self.inner.thresholds)
    }

    /// `(sentiment, language)`; never fails.
    pub async fn analyze(&self, text: Option<&str>) -> (f64, String) {
        self.analyze_detailed(text).await.into_pair()
    }

    pub async fn analyze_detailed(&self, text: Option<&str>) -> Analysis {
        let normalized = normalize_text(text.unwrap_or_default());
        if normalized.is_empty() {
            return Analysis::fallback(AnalysisStatus::Empty);
        }

        let lang = self.detect_language(&normalized).await;

        let scored_text = if lang == self.inner.target_language {
            normalized
        } else {
            match self.translate(&normalized, &lang).await {
                Some(t) => t,
                None => {
                    return Analysis {
                        sentiment: 0.0,
                        language: lang,
                        status: AnalysisStatus::Untranslated,
                    }
                }
            }
        };

        let score = self
            .inner
            .sentiments
            .get_or_compute(&scored_text, || async { sentiment::score(&scored_text) })
            .await;
        if !score.is_finite() {
            tracing::error!(target: "analyze", score, "non-finite sentiment score");
            return Analysis::failed();
        }

        Analysis {
            sentiment: score.clamp(-1.0, 1.0),
            language: lang,
            status: AnalysisStatus::Scored,
        }
    }

    /// Language of already-normalized text; below-confidence detections are
    /// `"unknown"`.
    async fn detect_language(&self, normalized: &str) -> String {
        let inner = &self.inner;
        inner
            .languages
            .get_or_compute(normalized, || async {
                match inner.detector.detect(normalized) {
                    Some(d) if d.confidence >= inner.min_confidence => d.lang.to_string(),
                    Some(d) => {
                        tracing::debug!(target: "analyze", lang = d.lang, confidence = d.confidence, "detection below min_confidence");
                        UNKNOWN.to_string()
                    }
                    None => UNKNOWN.to_string(),
                }
            })
            .await
    }

    async fn translate(&self, text: &str, lang: &str) -> Option<String> {
        let inner = &self.inner;
        let call = inner
            .translator
            .translate(text, lang, &inner.target_language);
        let err = match tokio::time::timeout(inner.translation_timeout, call).await {
            Ok(Ok(t)) => return Some(t),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "timed out after {}ms",
                inner.translation_timeout.as_millis()
            ),
        };
        counter!("pulse_translation_failures_total").increment(1);
        tracing::warn!(
            target: "analyze",
            translator = inner.translator.name(),
            lang,
            error = %err,
            "translation failed, keeping neutral score"
        );
        None
    }

    /// Analyze every text on at most `max_workers` concurrent tasks. The
    /// output has the same length and order as the input.
    pub async fn analyze_batch(&self, texts: Vec<String>) -> Vec<Analysis> {
        let t0 = Instant::now();
        let n = texts.len();
        let semaphore = Arc::new(Semaphore::new(self.inner.max_workers));
        let mut set = JoinSet::new();

        for (idx, text) in texts.into_iter().enumerate() {
            let this = self.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (idx, this.analyze_detailed(Some(&text)).await)
            });
        }

        let mut slots: Vec<Option<Analysis>> = vec![None; n];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, analysis)) => slots[idx] = Some(analysis),
                Err(e) => {
                    // The slot stays empty and is reported as failed below.
                    tracing::error!(target: "analyze", error = %e, "analysis worker crashed");
                }
            }
        }

        let out: Vec<Analysis> = slots
            .into_iter()
            .map(|s| s.unwrap_or_else(Analysis::failed))
            .collect();

        let failed = out
            .iter()
            .filter(|a| a.status == AnalysisStatus::Failed)
            .count();
        if failed > 0 {
            counter!("pulse_analysis_failures_total").increment(failed as u64);
        }
        histogram!("pulse_analysis_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(
            target: "analyze",
            items = n,
            failed,
            workers = self.inner.max_workers,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "batch analyzed"
        );
        out
    }

    /// Average score and label shares over `texts`.
    pub async fn sentiment_stats(&self, texts: Vec<String>) -> SentimentStats {
        let results = self.analyze_batch(texts).await;
        let count = results.len();
        if count == 0 {
            return SentimentStats {
                count: 0,
                average: 0.0,
                positive_share: 0.0,
                neutral_share: 0.0,
                negative_share: 0.0,
            };
        }
        let mut tally = [0usize; 3];
        let mut sum = 0.0;
        for a in &results {
            sum += a.sentiment;
            match self.label(a.sentiment) {
                SentimentLabel::Positive => tally[0] += 1,
                SentimentLabel::Neutral => tally[1] += 1,
                SentimentLabel::Negative => tally[2] += 1,
            }
        }
        let share = |k: usize| k as f64 / count as f64;
        SentimentStats {
            count,
            average: sum / count as f64,
            positive_share: share(tally[0]),
            neutral_share: share(tally[1]),
            negative_share: share(tally[2]),
        }
    }

    /// Number of texts per detected language.
    pub async fn language_distribution(&self, texts: Vec<String>) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for a in self.analyze_batch(texts).await {
            *out.entry(a.language).or_insert(0) += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;
    use async_trait::async_trait;

    fn cfg() -> AnalyzerConfig {
        AnalyzerConfig {
            target_language: "en".into(),
            min_confidence: 0.6,
            max_workers: 3,
            cache_size: 16,
            translation_timeout: Duration::from_millis(100),
            translator: None,
            translation_cache_path: None,
            thresholds: SentimentThresholds::default(),
        }
    }

    struct Slow;

    #[async_trait]
    impl Translator for Slow {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("great".into())
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    struct ToGreat;

    #[async_trait]
    impl Translator for ToGreat {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            Ok("great".into())
        }
        fn name(&self) -> &'static str {
            "to-great"
        }
    }

    #[tokio::test]
    async fn empty_and_absent_input_is_unknown() {
        let a = Analyzer::new(&cfg(), Arc::new(DisabledTranslator));
        assert_eq!(a.analyze(Some("")).await, (0.0, "unknown".to_string()));
        assert_eq!(a.analyze(None).await, (0.0, "unknown".to_string()));
        assert_eq!(a.analyze(Some("  \t ")).await, (0.0, "unknown".to_string()));
    }

    #[tokio::test]
    async fn target_language_text_is_scored_directly() {
        let a = Analyzer::new(&cfg(), Arc::new(DisabledTranslator));
        let (s, lang) = a.analyze(Some("Great service!")).await;
        assert_eq!(lang, "en");
        assert!(s > 0.3);
        assert_eq!(a.label(s), SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn foreign_text_is_translated_before_scoring() {
        let a = Analyzer::new(&cfg(), Arc::new(ToGreat));
        let r = a.analyze_detailed(Some("Das Essen war sehr gut")).await;
        assert_eq!(r.language, "de");
        assert_eq!(r.status, AnalysisStatus::Scored);
        assert!(r.sentiment > 0.3);
    }

    #[tokio::test]
    async fn translation_timeout_falls_back_to_neutral() {
        let a = Analyzer::new(&cfg(), Arc::new(Slow));
        let r = a.analyze_detailed(Some("Das Essen war sehr gut")).await;
        assert_eq!(r.sentiment, 0.0);
        assert_eq!(r.language, "de");
        assert_eq!(r.status, AnalysisStatus::Untranslated);
        assert!(r.is_cacheable());
    }

    #[tokio::test]
    async fn low_confidence_detection_is_unknown() {
        let mut c = cfg();
        c.min_confidence = 1.0;
        let a = Analyzer::new(&c, Arc::new(DisabledTranslator));
        // Mixed English/Dutch evidence keeps confidence below 1.
        let r = a.analyze_detailed(Some("the food is lekker")).await;
        assert_eq!(r.language, UNKNOWN);
        assert_eq!(r.status, AnalysisStatus::Untranslated);
    }

    #[tokio::test]
    async fn batch_preserves_length_and_order() {
        let a = Analyzer::new(&cfg(), Arc::new(DisabledTranslator));
        let texts: Vec<String> = vec![
            "Great service!".into(),
            "".into(),
            "The food was terrible".into(),
            "Great service!".into(),
            "Отличный сервис".into(),
        ];
        let out = a.analyze_batch(texts).await;
        assert_eq!(out.len(), 5);
        assert!(out[0].sentiment > 0.3);
        assert_eq!(out[1].status, AnalysisStatus::Empty);
        assert!(out[2].sentiment < -0.3);
        assert_eq!(out[0], out[3]);
        assert_eq!(out[4].language, "ru");
        assert_eq!(out[4].status, AnalysisStatus::Untranslated);
    }

    #[tokio::test]
    async fn stats_and_distribution() {
        let a = Analyzer::new(&cfg(), Arc::new(DisabledTranslator));
        let texts = || -> Vec<String> {
            vec![
                "Great service!".into(),
                "The food was terrible".into(),
                "Отличный сервис".into(),
            ]
        };
        let stats = a.sentiment_stats(texts()).await;
        assert_eq!(stats.count, 3);
        assert!((stats.positive_share - 1.0 / 3.0).abs() < 1e-9);
        assert!((stats.negative_share - 1.0 / 3.0).abs() < 1e-9);

        let dist = a.language_distribution(texts()).await;
        assert_eq!(dist.get("en"), Some(&2));
        assert_eq!(dist.get("ru"), Some(&1));
    }
}
