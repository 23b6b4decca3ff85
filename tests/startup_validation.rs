// tests/startup_validation.rs
mod common;

use common::{MemoryStore, ScriptedFetcher};
use feedback_pulse::analyze::DisabledTranslator;
use feedback_pulse::error::ConfigError;
use feedback_pulse::runner::{launch_with, RunDeps};
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn enabled_notifier_without_token_fails_before_any_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulse.toml");
    let doc = common::BASE_CONFIG.replace(
        "enabled = false",
        "enabled = true\ntelegram_token = \"\"\nchat_id = \"12345\"",
    );
    fs::write(&path, doc).unwrap();

    let fetcher = ScriptedFetcher::new(vec![]);
    let observed = fetcher.clone();
    let err = launch_with(&path, move |_| {
        Ok(RunDeps {
            fetcher: Arc::new(fetcher),
            translator: Arc::new(DisabledTranslator),
            store: Arc::new(MemoryStore::default()),
        })
    })
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::Validation(m)) if m.contains("telegram_token")
    ));
    assert_eq!(observed.loads(), 0);
    assert_eq!(observed.opens.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dependency_failure_is_reported_without_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulse.toml");
    fs::write(&path, common::BASE_CONFIG).unwrap();

    let err = launch_with(&path, |_| anyhow::bail!("key file unreadable"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("key file unreadable"));
}

#[tokio::test]
async fn valid_config_runs_a_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulse.json");
    let cache = dir.path().join("cache.json");
    let doc = serde_json::json!({
        "source": "fixture",
        "parser": {"max_retries": 1, "timeout": 1},
        "analyzer": {},
        "notifier": {"enabled": false},
        "cache": {"path": cache},
        "logging": {"console_output": false, "directory": ""},
        "security": {}
    });
    fs::write(&path, doc.to_string()).unwrap();

    let fetcher = ScriptedFetcher::new(vec![common::Page::Records(vec![common::raw(
        "Great service!",
        "5",
    )])]);
    let summary = launch_with(&path, move |_| {
        Ok(RunDeps {
            fetcher: Arc::new(fetcher),
            translator: Arc::new(DisabledTranslator),
            store: Arc::new(MemoryStore::default()),
        })
    })
    .await
    .unwrap();
    assert_eq!(summary.cache_entries, 1);
    assert_eq!(summary.stats.languages.iter().next().map(String::as_str), Some("en"));
}
