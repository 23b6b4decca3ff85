// src/analyze/translate.rs
//! Translation backends and the persisted translation cache.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::TranslatorEndpoint;
use crate::error::TranslationError;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` (may be `"unknown"`) into
    /// `target_lang`.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;

    fn name(&self) -> &'static str;

    /// Persist any buffered state. Called once at the end of a run.
    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Used when no translator endpoint is configured: every call fails and the
/// analyzer falls back to `(0.0, lang)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
        Err(TranslationError::Unavailable)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// LibreTranslate-compatible HTTP client (`POST /translate`).
#[derive(Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(endpoint: &TranslatorEndpoint, timeout: Duration) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: endpoint.url.clone(),
            api_key: endpoint.api_key.clone(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let source = if source_lang == super::language::UNKNOWN {
            "auto"
        } else {
            source_lang
        };
        let body = TranslateRequest {
            q: text,
            source,
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let msg = resp.text().await.unwrap_or_default();
            return Err(TranslationError::Request(format!("HTTP {status}: {msg}")));
        }
        let parsed: TranslateResponse = resp.json().await?;
        let out = parsed.translated_text.trim().to_string();
        if out.is_empty() {
            return Err(TranslationError::Empty);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "libretranslate"
    }
}

type CacheMap = HashMap<String, HashMap<String, String>>;

/// Cached translations keyed by source text, FIFO-bounded on texts.
struct Table {
    map: CacheMap,
    order: VecDeque<String>,
    max_texts: usize,
}

impl Table {
    fn new(map: CacheMap, max_texts: usize) -> Self {
        let order = map.keys().cloned().collect();
        let mut table = Self {
            map,
            order,
            max_texts: max_texts.max(1),
        };
        table.evict();
        table
    }

    fn insert(&mut self, text: &str, target_lang: &str, translation: String) {
        if !self.map.contains_key(text) {
            self.order.push_back(text.to_string());
        }
        self.map
            .entry(text.to_string())
            .or_default()
            .insert(target_lang.to_string(), translation);
        self.evict();
    }

    fn evict(&mut self) {
        while self.map.len() > self.max_texts {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
    }
}

/// Wraps a translator with a JSON file cache `{text: {target_lang: translation}}`.
/// The file is read once on construction and written on `flush`. At most
/// `max_texts` source texts are kept; the oldest go first, and entries
/// loaded from disk count as older than anything added since.
pub struct CachingTranslator {
    inner: Arc<dyn Translator>,
    path: PathBuf,
    table: Mutex<Table>,
    dirty: AtomicBool,
}

impl CachingTranslator {
    pub fn new(inner: Arc<dyn Translator>, path: impl Into<PathBuf>, max_texts: usize) -> Self {
        let path = path.into();
        let loaded = load_cache_file(&path);
        let loaded_texts = loaded.len();
        let table = Table::new(loaded, max_texts);
        let dirty = table.map.len() < loaded_texts;
        if dirty {
            tracing::info!(target: "analyze", loaded_texts, kept = table.map.len(), "translation cache trimmed to capacity");
        }
        Self {
            inner,
            path,
            table: Mutex::new(table),
            dirty: AtomicBool::new(dirty),
        }
    }

    pub fn cached(&self, text: &str, target_lang: &str) -> Option<String> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.map.get(text).and_then(|m| m.get(target_lang)).cloned()
    }

    /// Cached translations across all target languages.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Translator for CachingTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        if let Some(hit) = self.cached(text, target_lang) {
            return Ok(hit);
        }
        let out = self.inner.translate(text, source_lang, target_lang).await?;
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(text, target_lang, out.clone());
        self.dirty.store(true, Ordering::Release);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn flush(&self) -> std::io::Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let bytes = {
            let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_vec_pretty(&table.map)?
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(target: "analyze", path = %self.path.display(), "translation cache saved");
        self.inner.flush()
    }
}

fn load_cache_file(path: &Path) -> CacheMap {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(target: "analyze", path = %path.display(), error = %e, "translation cache unreadable, starting empty");
            CacheMap::new()
        }),
        Err(_) => CacheMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Upper {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for Upper {
        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.to_uppercase())
        }
        fn name(&self) -> &'static str {
            "upper"
        }
    }

    #[tokio::test]
    async fn cache_hits_skip_the_backend_and_survive_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tr.json");
        let backend = Arc::new(Upper {
            calls: AtomicUsize::new(0),
        });

        let tr = CachingTranslator::new(backend.clone(), &path, 16);
        assert_eq!(tr.translate("hola", "es", "en").await.unwrap(), "HOLA");
        assert_eq!(tr.translate("hola", "es", "en").await.unwrap(), "HOLA");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        tr.flush().unwrap();

        let reloaded = CachingTranslator::new(backend.clone(), &path, 16);
        assert_eq!(reloaded.cached("hola", "en").as_deref(), Some("HOLA"));
        assert_eq!(reloaded.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_cache_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tr.json");
        std::fs::write(&path, b"{not json").unwrap();
        let tr = CachingTranslator::new(Arc::new(DisabledTranslator), &path, 16);
        assert!(tr.is_empty());
        assert_eq!(
            tr.translate("x", "de", "en").await.unwrap_err(),
            TranslationError::Unavailable
        );
    }

    #[tokio::test]
    async fn oldest_texts_are_evicted_past_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tr.json");
        let backend = Arc::new(Upper {
            calls: AtomicUsize::new(0),
        });

        let tr = CachingTranslator::new(backend.clone(), &path, 2);
        for text in ["uno", "dos", "tres"] {
            tr.translate(text, "es", "en").await.unwrap();
        }
        tr.translate("tres", "es", "de").await.unwrap();
        assert_eq!(tr.cached("uno", "en"), None);
        assert_eq!(tr.cached("dos", "en").as_deref(), Some("DOS"));
        assert_eq!(tr.len(), 3);
        tr.flush().unwrap();

        let smaller = CachingTranslator::new(backend.clone(), &path, 1);
        assert_eq!(smaller.len(), 1);
        smaller.flush().unwrap();
        let on_disk: CacheMap = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
    }
}
