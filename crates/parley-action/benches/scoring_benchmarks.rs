//! Benchmarks for lexical intent scoring.
//!
//! Every generated line goes through `RuleRegistry::analyze`, so the full
//! default rule set should score a typical line in a few microseconds.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use parley_action::{AnalysisContext, RuleRegistry};
use parley_core::types::IntentKind;

fn bench_analyze(c: &mut Criterion) {
    let registry = RuleRegistry::with_defaults();
    let context = AnalysisContext::proposed(IntentKind::Recruit);

    let lines = [
        "I'm so tired, I need to lie down",
        "I refuse to join you, never",
        "Alright, count me in. I'll join you.",
        "The weather has been strange this season, hasn't it?",
    ];

    let mut group = c.benchmark_group("lexical_scoring");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("default_rules_short_lines", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(registry.analyze(black_box(line), &context));
            }
        });
    });

    let long_line = lines.join(" ").repeat(20);
    group.bench_function("default_rules_long_line", |b| {
        b.iter(|| black_box(registry.analyze(black_box(&long_line), &context)));
    });

    group.finish();
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
