use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;
use std::sync::Arc;

use homefix_router::directory::FallbackTable;
use homefix_router::search::parse_corpus;
use homefix_router::{
    Embedder, HashingEmbedder, InMemoryDirectory, Matcher, MatcherConfig, TaxonomyIndex,
    WorkerLookup,
};

fn corpus_matcher() -> Matcher {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/service_intents.csv");
    let content = std::fs::read_to_string(path).expect("corpus");
    let rows = parse_corpus(&content).expect("valid corpus");

    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
    let index = TaxonomyIndex::from_rows(rows, embedder.as_ref()).expect("index");
    Matcher::new(Arc::new(index), embedder, MatcherConfig::default()).expect("matcher")
}

fn bench_match_query(c: &mut Criterion) {
    let matcher = corpus_matcher();

    c.bench_function("match_query/hit", |b| {
        b.iter(|| matcher.match_query(black_box("water is leaking from my kitchen pipe")))
    });
    c.bench_function("match_query/fallback", |b| {
        b.iter(|| matcher.match_query(black_box("quantum entanglement homework")))
    });
}

fn bench_select(c: &mut Criterion) {
    let matcher = corpus_matcher();
    let scores: Vec<f32> = (0..matcher.index().len())
        .map(|i| (i as f32 * 0.37).sin().abs())
        .collect();

    c.bench_function("select/top5", |b| b.iter(|| matcher.select(black_box(&scores))));
}

fn bench_fallback_lookup(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let lookup = WorkerLookup::new(Arc::new(InMemoryDirectory::new()), FallbackTable::default());

    c.bench_function("lookup/empty_directory", |b| {
        b.to_async(&runtime)
            .iter(|| async { lookup.list_by_category(black_box("plumber")).await })
    });
}

criterion_group!(benches, bench_match_query, bench_select, bench_fallback_lookup);
criterion_main!(benches);
