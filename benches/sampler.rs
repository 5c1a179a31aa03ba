use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use signature_mcmc::core::{FullModel, SignatureChain};
use signature_mcmc::counts::CountMatrix;
use signature_mcmc::gibbs::conditional_probabilities;
use signature_mcmc::sampler::{sample, SamplerConfig};

/// Deterministic, well-conditioned counts without zero rows or columns.
fn counts(n_specimens: usize, n_types: usize) -> CountMatrix {
    let counts = Array2::from_shape_fn((n_specimens, n_types), |(i, j)| {
        (1 + (i * 31 + j * 17) % 97) as u64
    });
    CountMatrix::from_array(counts).unwrap()
}

fn bench_conditional(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditional_probabilities");
    for n in [10, 100, 500] {
        let counts = counts(n, 96);
        let state = SignatureChain::new(FullModel, &counts, 5)
            .unwrap()
            .current_state;
        group.bench_with_input(BenchmarkId::from_parameter(n), &state, |b, state| {
            b.iter(|| {
                conditional_probabilities(black_box(&state.exposure), &state.signature).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let counts = counts(50, 96);
    let config = SamplerConfig::default()
        .set_n_steps(20)
        .set_n_signatures(5)
        .set_seed(42);
    c.bench_function("full_model_20_steps", |b| {
        b.iter(|| sample(black_box(&counts), &config).unwrap())
    });
}

criterion_group!(benches, bench_conditional, bench_full_run);
criterion_main!(benches);
