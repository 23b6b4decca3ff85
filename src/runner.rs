// src/runner.rs
//! Process bootstrap: config → logging → notifier → store → batch → persist
//! → report.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::analyze::{
    Analyzer, CachingTranslator, DisabledTranslator, HttpTranslator, SentimentLabel, Translator,
};
use crate::config::Config;
use crate::ingest::{providers, Extractor, FetchController, Fetcher};
use crate::notify::{NotificationEvent, Notifications};
use crate::pipeline::{BatchOrchestrator, BatchReport, RunStats};
use crate::store::{self, SealedFileStore, SecureStore};
use crate::telemetry;

/// External collaborators of one run.
pub struct RunDeps {
    pub fetcher: Arc<dyn Fetcher>,
    pub translator: Arc<dyn Translator>,
    pub store: Arc<dyn SecureStore>,
}

impl RunDeps {
    /// Production wiring. Fails only when the store key cannot be set up.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let fetcher = providers::for_source(&cfg.source, cfg.parser.timeout);

        let backend: Arc<dyn Translator> = match &cfg.analyzer.translator {
            Some(endpoint) => Arc::new(
                HttpTranslator::new(endpoint, cfg.analyzer.translation_timeout)
                    .context("building translator client")?,
            ),
            None => {
                tracing::info!(target: "analyze", "no translator configured, non-target languages score neutral");
                Arc::new(DisabledTranslator)
            }
        };
        let translator: Arc<dyn Translator> = match &cfg.analyzer.translation_cache_path {
            Some(path) => Arc::new(CachingTranslator::new(
                backend,
                path.clone(),
                cfg.analyzer.cache_size,
            )),
            None => backend,
        };

        let store = SealedFileStore::open(&cfg.security.key_file).with_context(|| {
            format!("opening secure store (key file {})", cfg.security.key_file.display())
        })?;

        Ok(Self {
            fetcher,
            translator,
            store: Arc::new(store),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: BatchReport,
    pub stats: RunStats,
    /// Entries in the cache after the run.
    pub cache_entries: usize,
}

/// Full entry point used by the binary.
pub async fn launch(config_path: &Path) -> Result<RunSummary> {
    let cfg = load_config(config_path)?;
    telemetry::init_logging(&cfg.logging).context("initializing logging")?;
    start(&cfg, RunDeps::from_config).await
}

/// Same as `launch` without installing the global subscriber, with
/// caller-supplied collaborators.
pub async fn launch_with<F>(config_path: &Path, make_deps: F) -> Result<RunSummary>
where
    F: FnOnce(&Config) -> Result<RunDeps>,
{
    let cfg = load_config(config_path)?;
    start(&cfg, make_deps).await
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_from(path).with_context(|| format!("loading config {}", path.display()))
}

async fn start<F>(cfg: &Config, make_deps: F) -> Result<RunSummary>
where
    F: FnOnce(&Config) -> Result<RunDeps>,
{
    telemetry::ensure_metrics_described();
    let notifications = Notifications::from_config(&cfg.notifier);
    notifications
        .emit(NotificationEvent::Startup {
            source: cfg.source.clone(),
        })
        .await;

    let deps = match make_deps(cfg) {
        Ok(deps) => deps,
        Err(e) => {
            tracing::error!(target: "pipeline", error = %format!("{e:#}"), "startup failed");
            notifications
                .emit(NotificationEvent::Failure {
                    message: format!("{e:#}"),
                })
                .await;
            return Err(e);
        }
    };

    Ok(run_with(cfg, &notifications, deps).await)
}

/// One batch with persistence and reporting. Fetch, analysis and save
/// failures are logged and never fail the run.
pub async fn run_with(cfg: &Config, notifications: &Notifications, deps: RunDeps) -> RunSummary {
    let cache_name = cfg.cache.path.to_string_lossy().into_owned();

    let prior = if cfg.cache.enabled {
        store::load_cache(deps.store.as_ref(), &cache_name)
    } else {
        tracing::info!(target: "pipeline", "cache disabled, starting empty");
        Default::default()
    };

    let controller = FetchController::from_config(deps.fetcher.clone(), &cfg.parser);
    let analyzer = Analyzer::new(&cfg.analyzer, deps.translator.clone());
    let mut orchestrator =
        BatchOrchestrator::new(controller, Extractor::from_config(&cfg.parser), analyzer);
    let (cache, report) = orchestrator.run(&cfg.source, prior).await;

    if cfg.cache.enabled {
        if let Err(e) = store::save_cache(deps.store.as_ref(), &cache_name, &cache, cfg.cache.max_size) {
            tracing::error!(target: "store", error = %e, "saving cache failed, results kept in memory only");
        }
    }

    let stats = RunStats::from_entries(cache.all(), &cfg.analyzer.thresholds);
    tracing::info!(
        target: "pipeline",
        total_reviews = stats.total_reviews,
        average_sentiment = stats.average_sentiment,
        languages = ?stats.languages,
        positive = stats.positive,
        neutral = stats.neutral,
        negative = stats.negative,
        "run statistics"
    );

    for entry in &report.added {
        if orchestrator.analyzer().label(entry.sentiment) == SentimentLabel::Negative {
            notifications
                .emit(NotificationEvent::NegativeReview {
                    text: entry.text.clone(),
                    rating: entry.rating,
                    author: entry.author.clone(),
                    date: entry.date.clone(),
                    sentiment: entry.sentiment,
                })
                .await;
        }
    }

    if !cache.is_empty() {
        notifications
            .emit(NotificationEvent::RunSummary(stats.clone()))
            .await;
    }

    if let Err(e) = deps.translator.flush() {
        tracing::warn!(target: "analyze", error = %e, "saving translation cache failed");
    }

    RunSummary {
        cache_entries: cache.len(),
        report,
        stats,
    }
}
