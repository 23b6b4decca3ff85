// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use feedback_pulse::config::Config;
use feedback_pulse::error::{FetchError, NotifyError, SecurityError};
use feedback_pulse::ingest::{FetchSession, Fetcher, RawReview};
use feedback_pulse::notify::{NotificationEvent, Notifier};
use feedback_pulse::store::SecureStore;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn raw(text: &str, rating: &str) -> RawReview {
    RawReview {
        text: Some(text.to_string()),
        rating: Some(rating.to_string()),
        author: Some("Tester".to_string()),
        date: Some("2024-05-01".to_string()),
    }
}

/// What one `load` call yields.
#[derive(Clone)]
pub enum Page {
    Records(Vec<RawReview>),
    Network,
    Parsing,
}

/// Fetcher that plays back a script of pages and counts session traffic.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<VecDeque<Page>>>,
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub loads: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            script: Arc::new(Mutex::new(pages.into())),
            ..Default::default()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn live_sessions(&self) -> usize {
        self.opens.load(Ordering::SeqCst) - self.closes.load(Ordering::SeqCst)
    }
}

struct ScriptedSession(ScriptedFetcher);

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession(self.clone())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[async_trait]
impl FetchSession for ScriptedSession {
    async fn load(&mut self, _source: &str) -> Result<Vec<RawReview>, FetchError> {
        self.0.loads.fetch_add(1, Ordering::SeqCst);
        let page = self
            .0
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Page::Records(vec![]));
        match page {
            Page::Records(r) => Ok(r),
            Page::Network => Err(FetchError::Network("connection refused".into())),
            Page::Parsing => Err(FetchError::Parsing("review container missing".into())),
        }
    }

    async fn close(&mut self) {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory store; stores bytes verbatim.
#[derive(Default)]
pub struct MemoryStore {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl SecureStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, SecurityError> {
        Ok(self.blobs.lock().unwrap().get(name).cloned())
    }

    fn save(&self, name: &str, data: &[u8]) -> Result<(), SecurityError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotificationEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub const BASE_CONFIG: &str = r#"
source = "https://reviews.example.test/place/42"

[parser]
max_retries = 3
timeout = 2
backoff_unit_ms = 1

[analyzer]
target_language = "en"
min_confidence = 0.6
max_workers = 4

[notifier]
enabled = false
notify_on_negative = true
notify_on_error = true
notify_on_startup = true
notify_on_shutdown = true

[cache]
max_size = 1000
path = "reviews_cache.json"

[logging]
level = "DEBUG"
directory = ""
console_output = false

[security]
"#;

pub fn config() -> Config {
    Config::from_toml_str(BASE_CONFIG).expect("base test config is valid")
}
