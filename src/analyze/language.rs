// src/analyze/language.rs
//! Script + stopword language identification.

use std::collections::HashMap;

use super::sentiment::{in_lexicon, tokenize};

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ISO 639-1 code.
    pub lang: &'static str,
    /// In `[0, 1]`.
    pub confidence: f64,
}

pub trait LanguageDetector: Send + Sync {
    /// `None` when the text carries no usable signal.
    fn detect(&self, text: &str) -> Option<Detection>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Script {
    Latin,
    Cyrillic,
    Greek,
    Arabic,
    Hebrew,
    Han,
    Kana,
    Hangul,
    Thai,
    Devanagari,
}

fn script_of(c: char) -> Option<Script> {
    let s = match c as u32 {
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F => Script::Latin,
        0x0370..=0x03FF => Script::Greek,
        0x0400..=0x04FF => Script::Cyrillic,
        0x0590..=0x05FF => Script::Hebrew,
        0x0600..=0x06FF => Script::Arabic,
        0x0900..=0x097F => Script::Devanagari,
        0x0E00..=0x0E7F => Script::Thai,
        0x3040..=0x30FF => Script::Kana,
        0x4E00..=0x9FFF => Script::Han,
        0xAC00..=0xD7AF => Script::Hangul,
        _ => return None,
    };
    Some(s)
}

const PROFILES: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "is", "was", "were", "are", "it", "this", "that", "with", "for", "of",
            "to", "in", "my", "we", "they", "you", "very", "but", "not", "have", "had", "staff",
            "food", "place", "service", "i",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "sehr", "war", "ich", "wir", "ein",
            "eine", "mit", "für", "auf", "es", "auch", "aber", "gut", "hier", "schlecht", "essen",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "et", "est", "un", "une", "des", "du", "pour", "pas", "très",
            "avec", "je", "nous", "vous", "il", "elle", "mais", "ce", "cette", "qui", "dans",
            "bien", "trop", "était", "c'est",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "y", "es", "un", "una", "muy", "con", "para", "pero",
            "no", "fue", "que", "del", "lo", "estaba", "bueno", "buena", "malo", "comida",
        ],
    ),
    (
        "it",
        &[
            "il", "lo", "gli", "e", "è", "un", "una", "molto", "con", "per", "ma", "non", "che",
            "del", "della", "era", "sono", "buono", "ottimo", "cibo",
        ],
    ),
    (
        "pt",
        &[
            "o", "os", "as", "e", "é", "um", "uma", "muito", "com", "para", "mas", "não",
            "que", "do", "da", "foi", "bom", "boa", "atendimento", "comida",
        ],
    ),
    (
        "nl",
        &[
            "de", "het", "een", "en", "is", "niet", "zeer", "erg", "met", "voor", "maar", "was",
            "wij", "ik", "goed", "lekker", "eten",
        ],
    ),
];

/// Picks the dominant script; Latin text is split further by stopword
/// profiles. Confidence is the script's share of letters times the winning
/// profile's share of stopword hits.
#[derive(Debug, Default, Clone, Copy)]
pub struct StopwordDetector;

impl StopwordDetector {
    fn detect_latin(&self, text: &str) -> Option<(&'static str, f64)> {
        let mut hits: HashMap<&'static str, usize> = HashMap::new();
        for tok in tokenize(text) {
            let mut matched = false;
            for (lang, words) in PROFILES {
                if words.iter().any(|w| *w == tok) {
                    *hits.entry(*lang).or_default() += 1;
                    matched = true;
                }
            }
            // The sentiment lexicon is English; a known word is English evidence.
            if !matched && in_lexicon(&tok) {
                *hits.entry("en").or_default() += 1;
            }
        }
        let total: usize = hits.values().sum();
        let (lang, best) = hits
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))?;
        (best > 0).then(|| (lang, best as f64 / total as f64))
    }
}

impl LanguageDetector for StopwordDetector {
    fn detect(&self, text: &str) -> Option<Detection> {
        let mut counts: HashMap<Script, usize> = HashMap::new();
        let mut letters = 0usize;
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            letters += 1;
            if let Some(s) = script_of(c) {
                *counts.entry(s).or_default() += 1;
            }
        }
        if letters == 0 {
            return None;
        }

        let kana = counts.get(&Script::Kana).copied().unwrap_or(0);
        let (script, n) = counts
            .iter()
            .map(|(s, n)| (*s, *n))
            .max_by_key(|(_, n)| *n)?;
        let share = n as f64 / letters as f64;

        let (lang, margin) = match script {
            Script::Latin => self.detect_latin(text)?,
            Script::Cyrillic => {
                let ukrainian = text.chars().any(|c| matches!(c, 'і' | 'ї' | 'є' | 'ґ' | 'І' | 'Ї' | 'Є' | 'Ґ'));
                (if ukrainian { "uk" } else { "ru" }, 1.0)
            }
            Script::Greek => ("el", 1.0),
            Script::Arabic => ("ar", 1.0),
            Script::Hebrew => ("he", 1.0),
            Script::Han | Script::Kana => {
                // Japanese mixes kanji with kana; Chinese has no kana.
                let han = counts.get(&Script::Han).copied().unwrap_or(0);
                return Some(Detection {
                    lang: if kana > 0 { "ja" } else { "zh" },
                    confidence: ((han + kana) as f64 / letters as f64).min(1.0),
                });
            }
            Script::Hangul => ("ko", 1.0),
            Script::Thai => ("th", 1.0),
            Script::Devanagari => ("hi", 1.0),
        };

        Some(Detection {
            lang,
            confidence: (share * margin).clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(text: &str) -> Option<&'static str> {
        StopwordDetector.detect(text).map(|d| d.lang)
    }

    #[test]
    fn detects_common_latin_languages() {
        assert_eq!(lang("Great service!"), Some("en"));
        assert_eq!(lang("The staff was friendly and the food is great"), Some("en"));
        assert_eq!(lang("Das Essen war sehr gut und nicht teuer"), Some("de"));
        assert_eq!(lang("Le service est très lent mais les plats sont bons"), Some("fr"));
        assert_eq!(lang("La comida estaba muy buena pero el servicio fue lento"), Some("es"));
    }

    #[test]
    fn detects_by_script() {
        assert_eq!(lang("Отличный сервис, всем советую"), Some("ru"));
        assert_eq!(lang("Чудовий сервіс, дякую"), Some("uk"));
        assert_eq!(lang("Πολύ καλό φαγητό"), Some("el"));
        assert_eq!(lang("とても美味しいです"), Some("ja"));
        assert_eq!(lang("非常好吃"), Some("zh"));
        assert_eq!(lang("정말 맛있어요"), Some("ko"));
    }

    #[test]
    fn no_signal_is_none() {
        assert_eq!(lang(""), None);
        assert_eq!(lang("12345 !!!"), None);
        assert_eq!(lang("Xyzzy plugh"), None);
    }

    #[test]
    fn clean_english_is_confident() {
        let d = StopwordDetector.detect("Great service!").unwrap();
        assert!(d.confidence >= 0.99);
    }
}
