// tests/ingest_dedup.rs
use feedback_pulse::dedup::{fingerprint, CacheEntry, DedupCache};
use feedback_pulse::ingest::Review;

fn review(text: &str) -> Review {
    Review {
        text: text.into(),
        rating: 5.0,
        author: "Anonymous".into(),
        date: "2024-01-01".into(),
    }
}

#[test]
fn repeated_texts_are_filtered_against_cache_and_batch() {
    let mut cache = DedupCache::new();
    cache.insert(CacheEntry::from_review(review("Lovely place"), 0.6, "en".into()));

    let (fresh, dup) = cache.filter_new(vec![
        review("Lovely place"),
        review("Slow kitchen"),
        review("Slow   kitchen"),
        review("Clean rooms"),
    ]);
    assert_eq!(dup, 2);
    let texts: Vec<&str> = fresh.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["Slow kitchen", "Clean rooms"]);
}

#[test]
fn persisted_entries_round_trip_through_json() {
    let mut cache = DedupCache::new();
    cache.insert(CacheEntry::from_review(review("a"), 0.1, "en".into()));
    cache.insert(CacheEntry::from_review(review("b"), -0.4, "de".into()));

    let json = serde_json::to_string(cache.all()).unwrap();
    let entries: Vec<CacheEntry> = serde_json::from_str(&json).unwrap();
    let reloaded = DedupCache::from_entries(entries);

    assert_eq!(reloaded.all(), cache.all());
    assert!(reloaded.contains_fingerprint(&fingerprint("b")));
}

#[test]
fn inserting_again_changes_nothing() {
    let mut cache = DedupCache::new();
    let e = CacheEntry::from_review(review("same"), 0.2, "en".into());
    assert!(cache.insert(e.clone()));
    let before = cache.all().to_vec();
    assert!(!cache.insert(e));
    assert_eq!(cache.all(), before.as_slice());
}
