//! Error taxonomy shared by the pipeline stages.
//!
//! Each stage owns one enum; the binary boundary converts into `anyhow`.

use thiserror::Error;

/// Failure of the fetch stage. `Network` is retryable, `Parsing` is not.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parsing error: {0}")]
    Parsing(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Parsing(_) => FetchErrorKind::Parsing,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Body decode failures happen after the page loaded: schema mismatch.
        if err.is_decode() {
            FetchError::Parsing(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Parsing,
}

/// Configuration could not be read or did not pass validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config format error: {0}")]
    Format(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Validation(msg.into())
    }
}

/// Persistence / key management failures.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key error: {0}")]
    Key(String),

    #[error("sealed blob failed integrity check")]
    Tampered,

    #[error("sealed blob could not be decoded: {0}")]
    Decode(String),
}

/// Translation of a single item failed; callers fall back instead of failing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    #[error("translation timed out")]
    Timeout,

    #[error("translation request failed: {0}")]
    Request(String),

    #[error("translator returned an empty translation")]
    Empty,

    #[error("no translator configured")]
    Unavailable,
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TranslationError::Timeout
        } else {
            TranslationError::Request(err.to_string())
        }
    }
}

/// Outbound notification failed.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(String),

    #[error("notification API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for NotifyError {
    // The Bot API URL carries the token.
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Http(err.without_url().to_string())
    }
}
