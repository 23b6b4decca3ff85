// src/ingest/mod.rs
pub mod extract;
pub mod fetch;
pub mod providers;
pub mod types;

pub use extract::Extractor;
pub use fetch::{FetchController, FetchState, RetryPolicy};
pub use types::{FetchSession, Fetcher, RawReview, Review};

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize review text: decode entities, strip markup and control
/// characters, drop symbols, collapse whitespace, trim.
///
/// Used both for fingerprinting and as the first analysis step, so two texts
/// that are equal after normalization are the same review.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Control characters and symbols become spaces; keep word chars and
    //    sentence punctuation.
    out = out
        .chars()
        .map(|c| {
            if c.is_control() {
                ' '
            } else if c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(c, '_' | '.' | ',' | '!' | '?' | '-' | '\'')
            {
                c
            } else {
                ' '
            }
        })
        .collect();

    // 5) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_keeps_punct() {
        let s = "  Great,&nbsp;&nbsp; service!!  ";
        assert_eq!(normalize_text(s), "Great, service!!");
    }

    #[test]
    fn normalize_text_drops_markup_controls_and_symbols() {
        let s = "<p>Nice\u{0007} place</p> \u{1F600} #1 @home";
        assert_eq!(normalize_text(s), "Nice place 1 home");
    }

    #[test]
    fn normalize_text_keeps_non_latin_letters() {
        assert_eq!(normalize_text("  Отлично,\tспасибо! "), "Отлично, спасибо!");
    }
}
