//! Benchmarks for semantic anchor matching.
//!
//! Matching runs on the host's tick thread, so a single `match_vector` call
//! over the default catalogue should stay well under a millisecond.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use parley_core::config::SemanticConfig;
use parley_vector::embedding::{EmbeddingService, MockEmbedding};
use parley_vector::{default_catalogue, AnchorCache, SemanticMatcher};

fn build_matcher(rt: &tokio::runtime::Runtime) -> SemanticMatcher {
    let cache = AnchorCache::new(Arc::new(MockEmbedding::new()), default_catalogue());
    rt.block_on(cache.load_and_wait()).expect("anchor load failed");
    SemanticMatcher::new(cache, SemanticConfig::default())
}

fn bench_match_vector(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");
    let matcher = build_matcher(&rt);
    let embedder = MockEmbedding::new();

    let text = "I'm so tired, I really need to sleep and rest for a while";
    let query = rt.block_on(embedder.embed(text)).expect("query embed failed");

    let mut group = c.benchmark_group("semantic_match");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("default_catalogue_single_query", |b| {
        b.iter(|| matcher.match_vector(&query, text));
    });

    group.finish();
}

criterion_group!(benches, bench_match_vector);
criterion_main!(benches);
