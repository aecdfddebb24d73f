use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use velo_core::{MemorySource, PriceSeries};
use velo_engine::{BacktestSimulator, BasketRunner};
use velo_signal::{VelocityCrossover, VelocitySeries};

fn make_series(n: usize, seed: f64) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    let prices: Vec<f64> = (0..n)
        .map(|i| {
            // Simulate trending price with some noise
            let trend = (i as f64) * 0.001;
            let noise = ((i as f64) * 0.1 + seed).sin() * 5.0;
            100.0 + trend + noise
        })
        .collect();
    PriceSeries::daily(start, &prices)
}

fn bench_velocity(c: &mut Criterion) {
    let series = make_series(100_000, 0.0);

    c.bench_function("velocity_100k_window_100", |b| {
        b.iter(|| {
            let vel = VelocitySeries::compute(black_box(series.prices()), 100).unwrap();
            black_box(vel);
        });
    });
}

fn bench_basket(c: &mut Criterion) {
    let names: Vec<String> = (0..32).map(|i| format!("SYM{}", i)).collect();
    let source = names
        .iter()
        .enumerate()
        .fold(MemorySource::new(), |src, (i, name)| {
            src.with(name.clone(), make_series(5_000, i as f64))
        });

    for parallel in [false, true] {
        let runner = BasketRunner::new(
            BacktestSimulator::new(10_000.0),
            Box::new(VelocityCrossover::with_window(100)),
        )
        .parallel(parallel);
        let label = if parallel {
            "basket_32x5k_parallel"
        } else {
            "basket_32x5k_sequential"
        };

        c.bench_function(label, |b| {
            b.iter(|| {
                let report = runner.run(black_box(&source), black_box(&names), None, None);
                black_box(report);
            });
        });
    }
}

criterion_group!(benches, bench_velocity, bench_basket);
criterion_main!(benches);
