use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hindemith_melody::config::GeneratorConfig;
use hindemith_melody::generator::Generator;
use hindemith_prng::MelodyRng;
use std::hint::black_box;

/// Full search at increasing depth bounds.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for max_intervals in [5, 6, 7] {
        let config = GeneratorConfig {
            max_melody_intervals: max_intervals,
            progress_update_seconds: u64::MAX,
            ..GeneratorConfig::default()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(max_intervals),
            &config,
            |b, config| {
                b.iter(|| {
                    let mut generator = Generator::new(config.clone(), MelodyRng::new(1));
                    black_box(generator.generate())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
