//! Property tests for the Text Ranker.

use std::sync::Arc;

use proptest::prelude::*;
use quarry_core::models::RankedFragmentSet;
use quarry_retrieval::{Corpus, RankerOptions, SegmentOptions, TextRanker};

const VOCAB: &[&str] = &[
    "beverages", "condiments", "revenue", "orders", "summer", "winter", "margin", "returns",
    "days", "policy", "catalog", "dairy", "seafood", "produce", "average", "value",
];

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCAB), 4..14).prop_map(|w| w.join(" "))
}

fn documents() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(prop::collection::vec(sentence(), 1..4), 1..6).prop_map(|docs| {
        docs.into_iter()
            .enumerate()
            .map(|(i, paragraphs)| (format!("doc{i}"), paragraphs.join("\n\n")))
            .collect()
    })
}

fn ranker(docs: &[(String, String)], top_k: usize) -> TextRanker {
    let corpus = Corpus::from_documents(docs.iter().cloned(), SegmentOptions::default());
    TextRanker::new(
        Arc::new(corpus),
        RankerOptions { top_k, ..RankerOptions::default() },
    )
}

proptest! {
    #[test]
    fn ranked_sets_are_ordered_and_bounded(
        docs in documents(),
        query in sentence(),
        top_k in 1usize..6,
    ) {
        let r = ranker(&docs, top_k);
        let ranked = r.rank(&query);
        prop_assert!(ranked.len() <= top_k);
        let entries: Vec<_> = ranked.iter().cloned().collect();
        prop_assert!(RankedFragmentSet::is_ordered(&entries));
        prop_assert!(entries.iter().all(|e| e.score > 0.0));
    }

    #[test]
    fn ranking_is_deterministic_across_instances(docs in documents(), query in sentence()) {
        let a = ranker(&docs, 3).rank(&query);
        let b = ranker(&docs, 3).rank(&query);
        prop_assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn coverage_is_a_fraction(docs in documents(), query in sentence()) {
        let r = ranker(&docs, 3);
        let ranked = r.rank(&query);
        let retained: Vec<_> = ranked.iter().collect();
        let c = r.coverage(&query, &retained);
        prop_assert!((0.0..=1.0).contains(&c));
    }
}
