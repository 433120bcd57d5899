//! Benchmarks for index builds and searches.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use knowledge_retrieval::knowledge::{KnowledgeDocument, SearchQuery, TenantIndex};

const WORDS: &[&str] = &[
    "refund", "shipping", "invoice", "password", "account", "delivery", "warranty", "payment",
    "subscription", "cancel", "upgrade", "tracking", "address", "discount", "return", "support",
];

fn corpus(size: usize) -> Vec<KnowledgeDocument> {
    (0..size)
        .map(|i| {
            let content: Vec<&str> = (0..40)
                .map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()])
                .collect();
            KnowledgeDocument::new(
                i as i64,
                format!("{} {}", WORDS[i % WORDS.len()], WORDS[(i + 5) % WORDS.len()]),
                content.join(" "),
            )
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let small = corpus(100);
    let large = corpus(1000);

    c.bench_function("build_index_100_docs", |b| {
        b.iter(|| TenantIndex::build("bench", 1, black_box(small.clone())))
    });

    c.bench_function("build_index_1000_docs", |b| {
        b.iter(|| TenantIndex::build("bench", 1, black_box(large.clone())))
    });
}

fn bench_search(c: &mut Criterion) {
    let index = TenantIndex::build("bench", 1, corpus(1000));
    let query = SearchQuery::new("how do I get a refund for a late delivery").with_min_score(0.0);

    c.bench_function("search_1000_docs", |b| b.iter(|| index.search(black_box(&query))));
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
