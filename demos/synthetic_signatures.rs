//! Deconvolves counts simulated from three known signatures.
//!
//! Run with `cargo run --release --example synthetic_signatures`, add
//! `--features csv` to also write the posterior to `/tmp/posterior.csv`.

use ndarray::{Array1, Array2, Axis, Ix2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use signature_mcmc::counts::CountMatrix;
use signature_mcmc::random::RandomSource;
use signature_mcmc::sampler::{sample, SamplerConfig};
use std::error::Error;

const N_SPECIMENS: usize = 12;
const N_TYPES: usize = 6;
const N_SIGNATURES: usize = 3;
const MUTATIONS_PER_SPECIMEN: u64 = 2_000;
const SEED: u64 = 42;

fn simulate(source: &mut RandomSource, rng: &mut SmallRng) -> Result<CountMatrix, Box<dyn Error>> {
    let signatures = ndarray::arr2(&[
        [0.70, 0.10, 0.05, 0.05, 0.05, 0.05],
        [0.05, 0.05, 0.60, 0.20, 0.05, 0.05],
        [0.10, 0.10, 0.10, 0.10, 0.30, 0.30],
    ]);
    let mut counts = Array2::<u64>::zeros((N_SPECIMENS, N_TYPES));
    for mut row in counts.axis_iter_mut(Axis(0)) {
        let weights = Array1::from_shape_fn(N_SIGNATURES, |_| rng.gen_range(0.1..1.0));
        let exposure = &weights / weights.sum();
        let spectrum = exposure.dot(&signatures);
        row.assign(&source.multinomial(MUTATIONS_PER_SPECIMEN, spectrum.view())?);
    }

    let specimens = (1..=N_SPECIMENS).map(|i| format!("specimen_{i}")).collect();
    let types = ["C>A", "C>G", "C>T", "T>A", "T>C", "T>G"]
        .iter()
        .map(|t| t.to_string())
        .collect();
    Ok(CountMatrix::new(specimens, types, counts)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut source = RandomSource::seeded(SEED);
    let mut rng = SmallRng::seed_from_u64(SEED);
    let counts = simulate(&mut source, &mut rng)?;

    let config = SamplerConfig::default()
        .set_n_steps(1_000)
        .set_n_signatures(N_SIGNATURES)
        .set_seed(SEED)
        .show_progress(true);
    let output = sample(&counts, &config)?;
    println!("{}", output.stats);

    // Discard the first half as burn-in and average the rest.
    let signature = &output
        .posterior
        .variable("signature")
        .ok_or("missing signature draws")?
        .values;
    let n_draws = output.posterior.n_draws();
    let kept = signature
        .index_axis(Axis(0), 0)
        .slice_axis(Axis(0), (n_draws / 2..).into())
        .to_owned();
    let mean = kept
        .mean_axis(Axis(0))
        .ok_or("no draws kept")?
        .into_dimensionality::<Ix2>()?;

    let coords = output.posterior.coords();
    println!("Posterior mean signatures:");
    for (s, label) in coords.sig.iter().enumerate() {
        let row: Vec<String> = coords
            .substitution
            .iter()
            .enumerate()
            .map(|(j, t)| format!("{t}={:.3}", mean[[s, j]]))
            .collect();
        println!("  {label}: {}", row.join(" "));
    }

    #[cfg(feature = "csv")]
    {
        signature_mcmc::io::csv::save_posterior(&output.posterior, "/tmp/posterior.csv")?;
        println!("Wrote /tmp/posterior.csv");
    }

    Ok(())
}
