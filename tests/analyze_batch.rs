// tests/analyze_batch.rs
mod common;

use async_trait::async_trait;
use feedback_pulse::analyze::{AnalysisStatus, Analyzer, DisabledTranslator, Translator};
use feedback_pulse::error::TranslationError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Panicking;

#[async_trait]
impl Translator for Panicking {
    async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
        panic!("translator backend crashed");
    }
    fn name(&self) -> &'static str {
        "panicking"
    }
}

struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl Translator for Counting {
    async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        Ok(if text.contains("schlecht") { "bad".into() } else { "good".into() })
    }
    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test]
async fn batch_completeness_for_any_length() {
    let cfg = common::config();
    let analyzer = Analyzer::new(&cfg.analyzer, Arc::new(DisabledTranslator));
    for n in [0usize, 1, 7, 64] {
        let texts: Vec<String> = (0..n).map(|i| format!("review number {i} was great")).collect();
        let out = analyzer.analyze_batch(texts).await;
        assert_eq!(out.len(), n);
    }
}

#[tokio::test]
async fn crashed_worker_yields_unknown_for_its_item_only() {
    let cfg = common::config();
    let analyzer = Analyzer::new(&cfg.analyzer, Arc::new(Panicking));
    let out = analyzer
        .analyze_batch(vec![
            "Great service!".into(),
            "Отличный сервис".into(),
            "Terrible food".into(),
        ])
        .await;

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].language, "en");
    assert_eq!(out[1].status, AnalysisStatus::Failed);
    assert_eq!((out[1].sentiment, out[1].language.as_str()), (0.0, "unknown"));
    assert!(!out[1].is_cacheable());
    assert!(out[2].sentiment < 0.0);
}

#[tokio::test]
async fn foreign_texts_are_scored_after_translation() {
    let cfg = common::config();
    let backend = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let analyzer = Analyzer::new(&cfg.analyzer, backend.clone());

    let texts: Vec<String> = std::iter::repeat("Das Essen war sehr schlecht".to_string())
        .take(12)
        .chain(std::iter::once("Das Essen war sehr gut".to_string()))
        .collect();
    let out = analyzer.analyze_batch(texts).await;

    assert_eq!(out.len(), 13);
    assert!(out[..12].iter().all(|a| a.language == "de" && a.sentiment < 0.0));
    assert!(out[12].sentiment > 0.0);
    assert!(backend.calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn analyze_never_fails_on_blank_input() {
    let cfg = common::config();
    let analyzer = Analyzer::new(&cfg.analyzer, Arc::new(DisabledTranslator));
    assert_eq!(analyzer.analyze(Some("")).await, (0.0, "unknown".to_string()));
    assert_eq!(analyzer.analyze(None).await, (0.0, "unknown".to_string()));
}
