use std::hint::black_box;

use chain_binomial::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};

static SEED: u64 = 123;

fn large_config() -> SimulationConfig {
    SimulationConfigBuilder::default()
        .population(1_000_000)
        .initial_infected(10)
        .r0(2.0)
        .infectious_period(5.0)
        .dt(0.1)
        .max_time(300.0)
        .build()
        .expect("failed to build config")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let simulator = StochasticSirSimulator::new(SimulationConfig::default()).unwrap();
    c.bench_function("single run (N = 100)", |bencher| {
        bencher.iter(|| simulator.run(&RandomSource::new(black_box(SEED))).unwrap())
    });

    let simulator = StochasticSirSimulator::new(large_config()).unwrap();
    c.bench_function("single run (N = 1e6)", |bencher| {
        bencher.iter_with_large_drop(|| {
            simulator
                .run(&RandomSource::new(black_box(SEED)))
                .unwrap()
        })
    });

    let config = SimulationConfig::default();
    let options = ReplicateOptions {
        count: 256,
        base_seed: SEED,
        ..ReplicateOptions::default()
    };
    c.bench_function("256 replicates (N = 100)", |bencher| {
        bencher.iter(|| run_replicates(&config, &options).unwrap())
    });
}

criterion_group!(simulation_benches, criterion_benchmark);
criterion_main!(simulation_benches);
