use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use quarry_retrieval::{Corpus, RankerOptions, SegmentOptions, TextRanker};

/// ~500 fragments cycling through a small vocabulary.
fn build_corpus() -> Corpus {
    let words = [
        "beverages", "condiments", "revenue", "orders", "summer", "winter", "margin",
        "returns", "policy", "catalog", "dairy", "seafood", "produce", "average",
    ];
    let docs: Vec<(String, String)> = (0..50)
        .map(|d| {
            let paragraphs: Vec<String> = (0..10)
                .map(|p| {
                    (0..30)
                        .map(|w| words[(d * 7 + p * 3 + w) % words.len()])
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            (format!("doc{d}"), paragraphs.join("\n\n"))
        })
        .collect();
    Corpus::from_documents(docs, SegmentOptions::default())
}

fn bench_rank_uncached(c: &mut Criterion) {
    let corpus = Arc::new(build_corpus());
    let options = RankerOptions { cache_capacity: 0, ..RankerOptions::default() };
    let ranker = TextRanker::new(corpus, options);

    c.bench_function("rank_500_fragments_uncached", |b| {
        b.iter(|| ranker.rank("summer beverages revenue policy"));
    });
}

fn bench_rank_memoized(c: &mut Criterion) {
    let corpus = Arc::new(build_corpus());
    let ranker = TextRanker::new(corpus, RankerOptions::default());
    ranker.rank("summer beverages revenue policy");

    c.bench_function("rank_500_fragments_memoized", |b| {
        b.iter(|| ranker.rank("summer beverages revenue policy"));
    });
}

fn bench_index_build(c: &mut Criterion) {
    let corpus = Arc::new(build_corpus());
    c.bench_function("bm25_index_build_500_fragments", |b| {
        b.iter(|| TextRanker::new(Arc::clone(&corpus), RankerOptions::default()));
    });
}

criterion_group!(benches, bench_rank_uncached, bench_rank_memoized, bench_index_build);
criterion_main!(benches);
