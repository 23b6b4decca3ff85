// src/analyze/sentiment.rs
//! Lexicon-based polarity scoring.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::config::SentimentThresholds;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Normalization constant of `s / sqrt(s² + α)`.
const ALPHA: f64 = 15.0;
const NEGATION_WINDOW: usize = 3;
const BOOST: f64 = 1.5;
const DAMPEN: f64 = 0.5;
const EXCLAMATION_WEIGHT: f64 = 0.3;
const MAX_EXCLAMATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64, thresholds: &SentimentThresholds) -> Self {
        if score > thresholds.positive {
            Self::Positive
        } else if score < thresholds.negative {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// Lexicon valence of one lowercase token (0 when unknown).
#[inline]
pub fn word_valence(word: &str) -> i32 {
    *LEXICON.get(word).unwrap_or(&0)
}

pub(crate) fn in_lexicon(word: &str) -> bool {
    LEXICON.contains_key(word)
}

/// Polarity of `text` in `[-1, 1]`.
///
/// A negator within the three preceding tokens flips a word's valence; an
/// intensifier or dampener directly before it scales it. Each `!` (up to
/// three) pushes the total further in its current direction.
pub fn score(text: &str) -> f64 {
    let tokens: Vec<String> = tokenize(text).collect();
    let mut sum = 0.0_f64;

    for (i, tok) in tokens.iter().enumerate() {
        let base = word_valence(tok);
        if base == 0 {
            continue;
        }
        let mut v = base as f64;

        let negated = (1..=NEGATION_WINDOW).any(|k| i >= k && is_negator(&tokens[i - k]));
        if negated {
            v = -v;
        }
        if i >= 1 {
            let prev = tokens[i - 1].as_str();
            if is_intensifier(prev) {
                v *= BOOST;
            } else if is_dampener(prev) {
                v *= DAMPEN;
            }
        }
        sum += v;
    }

    if sum != 0.0 {
        let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS);
        sum += sum.signum() * EXCLAMATION_WEIGHT * bangs as f64;
    }

    normalize(sum)
}

fn normalize(sum: f64) -> f64 {
    if sum == 0.0 {
        return 0.0;
    }
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Lowercase word tokens; apostrophes inside words are kept (`isn't`).
pub(crate) fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "nothing"
            | "nobody"
            | "neither"
            | "nor"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "weren't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "won't"
            | "wouldn't"
            | "can't"
            | "couldn't"
            | "cannot"
            | "without"
    )
}

fn is_intensifier(tok: &str) -> bool {
    matches!(
        tok,
        "very"
            | "really"
            | "extremely"
            | "incredibly"
            | "absolutely"
            | "totally"
            | "so"
            | "super"
            | "truly"
            | "highly"
            | "most"
    )
}

fn is_dampener(tok: &str) -> bool {
    matches!(
        tok,
        "slightly" | "somewhat" | "barely" | "fairly" | "kinda" | "partly" | "marginally"
    )
}
