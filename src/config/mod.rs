// src/config/mod.rs
//! Configuration loading: TOML or JSON, validated into a typed `Config`.

pub mod settings;

pub use settings::{
    AnalyzerConfig, CacheConfig, Config, LogFormat, LogLevel, LoggingConfig, NotifierConfig,
    ParserConfig, SecurityConfig, SentimentThresholds, TelegramCredentials, TranslatorEndpoint,
};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use settings::RawConfig;

pub const ENV_CONFIG_PATH: &str = "FEEDBACK_PULSE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/pulse.toml";

impl Config {
    /// Load and validate a config file. Format is picked by extension
    /// (`.json` → JSON, anything else → TOML).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = if ext == "json" {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        tracing::info!(target: "config", path = %path.display(), source = %cfg.source, "config loaded");
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(s).map_err(|e| ConfigError::Format(e.to_string()))?;
        raw.validate()
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(s).map_err(|e| ConfigError::Format(e.to_string()))?;
        raw.validate()
    }
}

/// Resolve the config path: the explicit one (`--config` or
/// `$FEEDBACK_PULSE_CONFIG`, see `cli::Args`), else `config/pulse.toml`,
/// else `config/pulse.json`.
pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(p) = explicit {
        return p;
    }
    let toml_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if toml_p.exists() {
        return toml_p;
    }
    let json_p = PathBuf::from("config/pulse.json");
    if json_p.exists() {
        return json_p;
    }
    toml_p
}
