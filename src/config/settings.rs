// src/config/settings.rs
//! Typed configuration sections.
//!
//! The on-disk document deserializes into `Raw*` structs (lenient, with
//! defaults). `RawConfig::validate` is the only way to obtain a `Config`, so a
//! `Config` value always satisfies every constraint below.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_TRANSLATOR_API_KEY: &str = "TRANSLATOR_API_KEY";

const REQUIRED_SECTIONS: [&str; 6] = ["parser", "analyzer", "notifier", "cache", "logging", "security"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Source reference handed to the fetcher (URL or fixture path).
    pub source: String,
    pub parser: ParserConfig,
    pub analyzer: AnalyzerConfig,
    pub notifier: NotifierConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub max_retries: u32,
    pub timeout: Duration,
    pub backoff_base: f64,
    pub backoff_unit: Duration,
    pub max_reviews: Option<usize>,
    pub min_rating: f64,
    pub max_rating: f64,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub target_language: String,
    pub min_confidence: f64,
    pub max_workers: usize,
    pub cache_size: usize,
    pub translation_timeout: Duration,
    pub translator: Option<TranslatorEndpoint>,
    pub translation_cache_path: Option<PathBuf>,
    pub thresholds: SentimentThresholds,
}

#[derive(Debug, Clone)]
pub struct TranslatorEndpoint {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentThresholds {
    pub positive: f64,
    pub negative: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            positive: 0.3,
            negative: -0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Present exactly when notifications are enabled.
    pub telegram: Option<TelegramCredentials>,
    pub notify_on_negative: bool,
    pub notify_on_error: bool,
    pub notify_on_startup: bool,
    pub notify_on_shutdown: bool,
}

impl NotifierConfig {
    pub fn enabled(&self) -> bool {
        self.telegram.is_some()
    }

    pub fn disabled() -> Self {
        Self {
            telegram: None,
            notify_on_negative: false,
            notify_on_error: false,
            notify_on_startup: false,
            notify_on_shutdown: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
    /// Accepted and validated but not consulted by any stage (see DESIGN.md).
    pub ttl_days: u32,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub directory: Option<PathBuf>,
    pub max_bytes: u64,
    pub backup_count: u32,
    pub format: LogFormat,
    pub console_output: bool,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub key_file: PathBuf,
}

/* ----------------------------
Raw document (serde)
---------------------------- */

#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    #[serde(default, alias = "google_maps_url")]
    source: Option<String>,
    parser: Option<RawParser>,
    analyzer: Option<RawAnalyzer>,
    notifier: Option<RawNotifier>,
    cache: Option<RawCache>,
    logging: Option<RawLogging>,
    security: Option<RawSecurity>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawParser {
    max_retries: i64,
    timeout: i64,
    backoff_base: f64,
    backoff_unit_ms: u64,
    max_reviews: Option<usize>,
    min_rating: f64,
    max_rating: f64,
}

impl Default for RawParser {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: 10,
            backoff_base: 2.0,
            backoff_unit_ms: 1_000,
            max_reviews: None,
            min_rating: 0.0,
            max_rating: 5.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawAnalyzer {
    target_language: String,
    min_confidence: f64,
    max_workers: i64,
    cache_size: i64,
    translation_timeout: Option<i64>,
    translator_url: Option<String>,
    translator_api_key: Option<String>,
    translation_cache: Option<PathBuf>,
    sentiment_thresholds: RawThresholds,
}

impl Default for RawAnalyzer {
    fn default() -> Self {
        Self {
            target_language: "en".to_string(),
            min_confidence: 0.6,
            max_workers: 4,
            cache_size: 1_000,
            translation_timeout: None,
            translator_url: None,
            translator_api_key: None,
            translation_cache: Some(PathBuf::from("translation_cache.json")),
            sentiment_thresholds: RawThresholds::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawThresholds {
    positive: f64,
    negative: f64,
}

impl Default for RawThresholds {
    fn default() -> Self {
        let t = SentimentThresholds::default();
        Self {
            positive: t.positive,
            negative: t.negative,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawNotifier {
    enabled: bool,
    telegram_token: String,
    chat_id: String,
    notify_on_negative: bool,
    notify_on_error: bool,
    notify_on_startup: bool,
    notify_on_shutdown: bool,
}

impl Default for RawNotifier {
    fn default() -> Self {
        Self {
            enabled: true,
            telegram_token: String::new(),
            chat_id: String::new(),
            notify_on_negative: true,
            notify_on_error: true,
            notify_on_startup: true,
            notify_on_shutdown: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCache {
    enabled: bool,
    max_size: i64,
    ttl_days: u32,
    path: PathBuf,
}

impl Default for RawCache {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 1_000,
            ttl_days: 30,
            path: PathBuf::from("reviews_cache.json"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLogging {
    level: String,
    directory: Option<PathBuf>,
    max_bytes: u64,
    backup_count: u32,
    format: String,
    console_output: bool,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            directory: Some(PathBuf::from("logs")),
            max_bytes: 10 * 1024 * 1024,
            backup_count: 5,
            format: "json".to_string(),
            console_output: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSecurity {
    hash_algorithm: String,
    key_file: PathBuf,
}

impl Default for RawSecurity {
    fn default() -> Self {
        Self {
            hash_algorithm: "sha256".to_string(),
            key_file: PathBuf::from(".security_key"),
        }
    }
}

/* ----------------------------
Validation
---------------------------- */

impl RawConfig {
    pub(crate) fn validate(self) -> Result<Config, ConfigError> {
        let present = [
            self.parser.is_some(),
            self.analyzer.is_some(),
            self.notifier.is_some(),
            self.cache.is_some(),
            self.logging.is_some(),
            self.security.is_some(),
        ];
        if let Some(i) = present.iter().position(|p| !p) {
            return Err(ConfigError::invalid(format!(
                "missing section `{}`",
                REQUIRED_SECTIONS[i]
            )));
        }

        let source = self.source.unwrap_or_default().trim().to_string();
        if source.is_empty() {
            return Err(ConfigError::invalid("`source` must name the review source"));
        }

        let notifier = validate_notifier(self.notifier.unwrap_or_default())?;
        let parser = validate_parser(self.parser.unwrap_or_default())?;
        let analyzer = validate_analyzer(self.analyzer.unwrap_or_default(), parser.timeout)?;
        let cache = validate_cache(self.cache.unwrap_or_default())?;
        let logging = validate_logging(self.logging.unwrap_or_default())?;
        let security = validate_security(self.security.unwrap_or_default())?;

        Ok(Config {
            source,
            parser,
            analyzer,
            notifier,
            cache,
            logging,
            security,
        })
    }
}

fn validate_parser(p: RawParser) -> Result<ParserConfig, ConfigError> {
    if p.max_retries < 1 {
        return Err(ConfigError::invalid("parser.max_retries must be a positive integer"));
    }
    if p.timeout < 1 {
        return Err(ConfigError::invalid("parser.timeout must be a positive integer"));
    }
    if !(p.backoff_base >= 1.0 && p.backoff_base.is_finite()) {
        return Err(ConfigError::invalid("parser.backoff_base must be >= 1"));
    }
    if !(0.0..=5.0).contains(&p.min_rating)
        || !(0.0..=5.0).contains(&p.max_rating)
        || p.min_rating > p.max_rating
    {
        return Err(ConfigError::invalid(
            "parser rating bounds must satisfy 0 <= min_rating <= max_rating <= 5",
        ));
    }
    if p.max_reviews == Some(0) {
        return Err(ConfigError::invalid("parser.max_reviews must be >= 1 when set"));
    }
    Ok(ParserConfig {
        max_retries: u32::try_from(p.max_retries)
            .map_err(|_| ConfigError::invalid("parser.max_retries is too large"))?,
        timeout: Duration::from_secs(p.timeout as u64),
        backoff_base: p.backoff_base,
        backoff_unit: Duration::from_millis(p.backoff_unit_ms),
        max_reviews: p.max_reviews,
        min_rating: p.min_rating,
        max_rating: p.max_rating,
    })
}

fn validate_analyzer(a: RawAnalyzer, fetch_timeout: Duration) -> Result<AnalyzerConfig, ConfigError> {
    if !(0.0..=1.0).contains(&a.min_confidence) {
        return Err(ConfigError::invalid("analyzer.min_confidence must be between 0 and 1"));
    }
    if a.max_workers < 1 {
        return Err(ConfigError::invalid("analyzer.max_workers must be >= 1"));
    }
    if a.cache_size < 1 {
        return Err(ConfigError::invalid("analyzer.cache_size must be >= 1"));
    }
    let target_language = a.target_language.trim().to_ascii_lowercase();
    if target_language.is_empty() {
        return Err(ConfigError::invalid("analyzer.target_language must not be empty"));
    }
    let translation_timeout = match a.translation_timeout {
        Some(t) if t < 1 => {
            return Err(ConfigError::invalid("analyzer.translation_timeout must be >= 1"));
        }
        Some(t) => Duration::from_secs(t as u64),
        None => fetch_timeout,
    };
    let t = a.sentiment_thresholds;
    if !(t.negative <= t.positive && (-1.0..=1.0).contains(&t.negative) && (-1.0..=1.0).contains(&t.positive)) {
        return Err(ConfigError::invalid(
            "analyzer.sentiment_thresholds must satisfy -1 <= negative <= positive <= 1",
        ));
    }

    let translator = match a.translator_url.map(|u| u.trim().to_string()) {
        Some(url) if !url.is_empty() => Some(TranslatorEndpoint {
            url,
            api_key: a
                .translator_api_key
                .map(|k| resolve_secret(&k, ENV_TRANSLATOR_API_KEY))
                .transpose()?
                .filter(|k| !k.is_empty()),
        }),
        _ => None,
    };

    Ok(AnalyzerConfig {
        target_language,
        min_confidence: a.min_confidence,
        max_workers: a.max_workers as usize,
        cache_size: a.cache_size as usize,
        translation_timeout,
        translator,
        translation_cache_path: a.translation_cache,
        thresholds: SentimentThresholds {
            positive: t.positive,
            negative: t.negative,
        },
    })
}

fn validate_notifier(n: RawNotifier) -> Result<NotifierConfig, ConfigError> {
    let telegram = if n.enabled {
        let token = resolve_secret(&n.telegram_token, ENV_TELEGRAM_TOKEN)?;
        let chat_id = resolve_secret(&n.chat_id, ENV_TELEGRAM_CHAT_ID)?;
        if token.trim().is_empty() {
            return Err(ConfigError::invalid(
                "notifier.telegram_token is required when notifications are enabled",
            ));
        }
        if chat_id.trim().is_empty() {
            return Err(ConfigError::invalid(
                "notifier.chat_id is required when notifications are enabled",
            ));
        }
        Some(TelegramCredentials {
            token: token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
        })
    } else {
        None
    };
    Ok(NotifierConfig {
        telegram,
        notify_on_negative: n.notify_on_negative,
        notify_on_error: n.notify_on_error,
        notify_on_startup: n.notify_on_startup,
        notify_on_shutdown: n.notify_on_shutdown,
    })
}

fn validate_cache(c: RawCache) -> Result<CacheConfig, ConfigError> {
    if c.max_size < 1 {
        return Err(ConfigError::invalid("cache.max_size must be a positive integer"));
    }
    Ok(CacheConfig {
        enabled: c.enabled,
        max_size: c.max_size as usize,
        ttl_days: c.ttl_days,
        path: c.path,
    })
}

fn validate_logging(l: RawLogging) -> Result<LoggingConfig, ConfigError> {
    let level = LogLevel::parse(&l.level).ok_or_else(|| {
        ConfigError::invalid("logging.level must be one of: DEBUG, INFO, WARNING, ERROR, CRITICAL")
    })?;
    let format = match l.format.to_ascii_lowercase().as_str() {
        "json" => LogFormat::Json,
        "pretty" | "text" => LogFormat::Pretty,
        "compact" => LogFormat::Compact,
        other => {
            return Err(ConfigError::invalid(format!(
                "logging.format `{other}` is not one of: json, pretty, compact"
            )));
        }
    };
    Ok(LoggingConfig {
        level,
        directory: l.directory.filter(|d| !d.as_os_str().is_empty()),
        max_bytes: l.max_bytes,
        backup_count: l.backup_count,
        format,
        console_output: l.console_output,
    })
}

fn validate_security(s: RawSecurity) -> Result<SecurityConfig, ConfigError> {
    if !s.hash_algorithm.eq_ignore_ascii_case("sha256") {
        return Err(ConfigError::invalid(format!(
            "security.hash_algorithm `{}` is not supported (sha256 only)",
            s.hash_algorithm
        )));
    }
    Ok(SecurityConfig { key_file: s.key_file })
}

/// `"ENV"` (case-insensitive) means: read the value from `env_name`.
fn resolve_secret(raw: &str, env_name: &str) -> Result<String, ConfigError> {
    if raw.trim().eq_ignore_ascii_case("env") {
        std::env::var(env_name)
            .map_err(|_| ConfigError::invalid(format!("missing {env_name} env var")))
    } else {
        Ok(raw.to_string())
    }
}
