use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use movetrack_hmm::likelihood::{log_likelihood, state_probabilities, viterbi};
use movetrack_hmm::{simulate, AngleDistribution, HmmConfig, HmmData, HmmParameters, StepDistribution};
use rand::prelude::*;

fn parameters(n_states: usize) -> HmmParameters {
    let steps = (0..n_states)
        .map(|i| StepDistribution::gamma(20.0 * 4f64.powi(i as i32), 10.0 * 4f64.powi(i as i32)))
        .collect();
    let angles = (0..n_states)
        .map(|i| AngleDistribution::von_mises(0.0, 0.5 + 3.0 * i as f64))
        .collect();
    HmmParameters::new(steps, angles).unwrap()
}

/// Simulated single-sequence data set
fn generate_data(params: &HmmParameters, config: &HmmConfig, length: usize, seed: u64) -> HmmData {
    let mut rng = StdRng::seed_from_u64(seed);
    simulate(params, config, "bench", length, &[], &mut rng)
        .unwrap()
        .into_data(Vec::new())
        .unwrap()
}

fn bench_likelihood(c: &mut Criterion) {
    let mut group = c.benchmark_group("HmmLikelihood");
    for n_states in [2, 3] {
        let config = HmmConfig::with_states(n_states);
        let params = parameters(n_states);
        for length in [100, 1000, 10000] {
            let data = generate_data(&params, &config, length, 42);
            let id = format!("{n_states}states");

            group.bench_with_input(BenchmarkId::new(format!("forward/{id}"), length), &data, |b, data| {
                b.iter(|| log_likelihood(&params, &config, black_box(data)))
            });
            group.bench_with_input(
                BenchmarkId::new(format!("forward_backward/{id}"), length),
                &data,
                |b, data| b.iter(|| state_probabilities(&params, &config, black_box(data))),
            );
            group.bench_with_input(BenchmarkId::new(format!("viterbi/{id}"), length), &data, |b, data| {
                b.iter(|| viterbi(&params, &config, black_box(data)))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_likelihood);
criterion_main!(benches);
