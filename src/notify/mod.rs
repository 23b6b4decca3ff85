// src/notify/mod.rs
//! Outbound run notifications.

pub mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::NotifierConfig;
use crate::error::NotifyError;
use crate::pipeline::RunStats;

/// Longest review excerpt included in an alert.
pub const ALERT_TEXT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Startup {
        source: String,
    },
    RunSummary(RunStats),
    NegativeReview {
        text: String,
        rating: f64,
        author: String,
        date: String,
        sentiment: f64,
    },
    Failure {
        message: String,
    },
}

impl NotificationEvent {
    /// Plain-text message body.
    pub fn render(&self) -> String {
        match self {
            Self::Startup { source } => format!("Feedback Pulse started\nSource: {source}"),
            Self::RunSummary(stats) => {
                let languages = if stats.languages.is_empty() {
                    "none".to_string()
                } else {
                    stats.languages.iter().cloned().collect::<Vec<_>>().join(", ")
                };
                format!(
                    "Processing finished\nTotal reviews: {}\nAverage sentiment: {:.2}\nLanguages: {}",
                    stats.total_reviews, stats.average_sentiment, languages
                )
            }
            Self::NegativeReview {
                text,
                rating,
                author,
                date,
                sentiment,
            } => format!(
                "Negative review ({sentiment:.2})\nRating: {rating:.1}\nAuthor: {author}\nDate: {date}\n\n{}",
                truncate_chars(text, ALERT_TEXT_CHARS)
            ),
            Self::Failure { message } => format!("Run failed: {message}"),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Startup { .. } => "startup",
            Self::RunSummary(_) => "summary",
            Self::NegativeReview { .. } => "negative_review",
            Self::Failure { .. } => "failure",
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
    fn name(&self) -> &'static str;
}

/// Writes events to the log instead of an external channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(target: "notify", kind = event.kind(), message = %event.render(), "notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

pub fn build_notifier(cfg: &NotifierConfig) -> Arc<dyn Notifier> {
    match &cfg.telegram {
        Some(creds) => Arc::new(TelegramNotifier::new(creds.token.clone(), creds.chat_id.clone())),
        None => Arc::new(LogNotifier),
    }
}

/// Applies the `notify_on_*` switches and swallows delivery errors.
#[derive(Clone)]
pub struct Notifications {
    notifier: Arc<dyn Notifier>,
    on_startup: bool,
    on_shutdown: bool,
    on_negative: bool,
    on_error: bool,
}

impl Notifications {
    pub fn new(cfg: &NotifierConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            on_startup: cfg.notify_on_startup,
            on_shutdown: cfg.notify_on_shutdown,
            on_negative: cfg.notify_on_negative,
            on_error: cfg.notify_on_error,
        }
    }

    pub fn from_config(cfg: &NotifierConfig) -> Self {
        Self::new(cfg, build_notifier(cfg))
    }

    pub fn silent() -> Self {
        Self::new(&NotifierConfig::disabled(), Arc::new(LogNotifier))
    }

    fn wants(&self, event: &NotificationEvent) -> bool {
        match event {
            NotificationEvent::Startup { .. } => self.on_startup,
            NotificationEvent::RunSummary(_) => self.on_shutdown,
            NotificationEvent::NegativeReview { .. } => self.on_negative,
            NotificationEvent::Failure { .. } => self.on_error,
        }
    }

    /// Returns whether the event was delivered.
    pub async fn emit(&self, event: NotificationEvent) -> bool {
        if !self.wants(&event) {
            return false;
        }
        match self.notifier.send(&event).await {
            Ok(()) => {
                tracing::debug!(target: "notify", notifier = self.notifier.name(), kind = event.kind(), "notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(target: "notify", notifier = self.notifier.name(), kind = event.kind(), error = %e, "notification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(event.render());
            Ok(())
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[test]
    fn summary_renders_two_decimals_and_sorted_languages() {
        let stats = RunStats {
            total_reviews: 3,
            average_sentiment: 0.456,
            languages: BTreeSet::from(["ru".to_string(), "en".to_string()]),
            positive: 2,
            neutral: 1,
            negative: 0,
        };
        assert_eq!(
            NotificationEvent::RunSummary(stats).render(),
            "Processing finished\nTotal reviews: 3\nAverage sentiment: 0.46\nLanguages: en, ru"
        );
    }

    #[test]
    fn alert_text_is_truncated() {
        let ev = NotificationEvent::NegativeReview {
            text: "x".repeat(500),
            rating: 1.0,
            author: "A".into(),
            date: "2024-01-01".into(),
            sentiment: -0.7,
        };
        let body = ev.render();
        assert!(body.ends_with(&format!("{}…", "x".repeat(ALERT_TEXT_CHARS))));
    }

    #[tokio::test]
    async fn switches_gate_delivery() {
        let recorder = Arc::new(Recorder::default());
        let mut cfg = NotifierConfig::disabled();
        cfg.notify_on_error = true;
        let n = Notifications::new(&cfg, recorder.clone());

        assert!(!n.emit(NotificationEvent::Startup { source: "s".into() }).await);
        assert!(n.emit(NotificationEvent::Failure { message: "boom".into() }).await);
        assert_eq!(*recorder.sent.lock().unwrap(), vec!["Run failed: boom".to_string()]);
    }
}
