// src/telemetry.rs
//! Tracing subscriber setup and metric descriptions.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

pub const LOG_FILE_NAME: &str = "feedback-pulse.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Returns the log file path when file output is active. Calling this twice
/// is an error (the global subscriber is already set).
pub fn init_logging(cfg: &LoggingConfig) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.as_filter()));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if cfg.console_output {
        layers.push(format_layer(cfg.format, std::io::stderr));
    }

    let file_path = match &cfg.directory {
        Some(dir) => {
            let path = prepare_log_file(dir, cfg.max_bytes, cfg.backup_count)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            // Files always get JSON lines regardless of the console format.
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            );
            Some(path)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::info!(
        target: "telemetry",
        level = cfg.level.as_filter(),
        log_file = ?file_path,
        max_bytes = cfg.max_bytes,
        backup_count = cfg.backup_count,
        "logging configured"
    );
    Ok(file_path)
}

fn format_layer<W>(format: LogFormat, writer: W) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(writer).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(writer).boxed(),
    }
}

/// Create the log directory and rotate `feedback-pulse.log` when it has
/// reached `max_bytes`: `.log → .log.1 → … → .log.<backup_count>`.
pub fn prepare_log_file(dir: &Path, max_bytes: u64, backup_count: u32) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating log dir {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);

    let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    if max_bytes == 0 || size < max_bytes {
        return Ok(path);
    }

    if backup_count == 0 {
        File::create(&path).with_context(|| format!("truncating {}", path.display()))?;
        return Ok(path);
    }

    let backup = |n: u32| dir.join(format!("{LOG_FILE_NAME}.{n}"));
    let _ = fs::remove_file(backup(backup_count));
    for n in (1..backup_count).rev() {
        let from = backup(n);
        if from.exists() {
            fs::rename(&from, backup(n + 1))
                .with_context(|| format!("rotating {}", from.display()))?;
        }
    }
    fs::rename(&path, backup(1)).with_context(|| format!("rotating {}", path.display()))?;
    Ok(path)
}

/// One-time metrics registration.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pulse_fetch_attempts_total", "Fetch attempts, including retries.");
        describe_counter!("pulse_fetch_retries_total", "Fetch attempts that were retried.");
        describe_counter!("pulse_fetch_failures_total", "Batches whose fetch failed.");
        describe_counter!("pulse_fetch_http_errors_total", "Non-2xx responses from the review source.");
        describe_counter!("pulse_reviews_fetched_total", "Raw records returned by the source.");
        describe_counter!("pulse_reviews_rejected_total", "Raw records rejected by validation.");
        describe_counter!("pulse_reviews_duplicate_total", "Reviews skipped as already seen.");
        describe_counter!("pulse_reviews_analyzed_total", "Reviews analyzed and cached.");
        describe_counter!("pulse_analysis_failures_total", "Per-item analysis failures.");
        describe_counter!("pulse_translation_failures_total", "Translation fallbacks.");
        describe_histogram!("pulse_fetch_ms", "Fetch stage duration in milliseconds.");
        describe_histogram!("pulse_analysis_ms", "Analysis stage duration in milliseconds.");
    });
}
