/*!
# Sampler Entry Points

[`SamplerConfig`] collects the run parameters; [`sample`] validates them,
builds a [`SignatureChain`] for the configured model, runs it and packages
the draws into [`PosteriorSamples`].

```rust
use ndarray::arr2;
use signature_mcmc::counts::CountMatrix;
use signature_mcmc::sampler::{sample, Model, SamplerConfig};

let counts = CountMatrix::from_array(arr2(&[[10, 4, 7], [3, 12, 5]])).unwrap();
let config = SamplerConfig::default()
    .set_n_steps(20)
    .set_n_signatures(2)
    .set_seed(42)
    .set_model(Model::Full);
let output = sample(&counts, &config).unwrap();
assert_eq!(output.posterior.n_draws(), 20);
```
*/

use std::fmt;

use indicatif::ProgressBar;
use log::info;
use rand::{thread_rng, Rng};

use crate::core::{
    run_chain, run_chain_progress, FixedHyperparameters, FullModel, MarkovChain, SignatureChain,
    Transition,
};
use crate::counts::CountMatrix;
use crate::error::{Result, SamplerError};
use crate::stats::RunStats;
use crate::trace::PosteriorSamples;

pub const DEFAULT_N_STEPS: usize = 500;
pub const DEFAULT_N_SIGNATURES: usize = 5;

/// Which transition the chain applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    /// Exposures, signatures, concentrations and rates are all sampled.
    #[default]
    Full,
    /// Only exposures and signatures are sampled.
    FixedHyperparameters,
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Full => write!(f, "full"),
            Model::FixedHyperparameters => write!(f, "fixed hyperparameters"),
        }
    }
}

/// Run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub n_steps: usize,
    pub n_signatures: usize,
    pub seed: u64,
    pub model: Model,
    pub show_progress: bool,
}

impl SamplerConfig {
    /// Defaults with a seed drawn from the thread-local generator.
    pub fn new() -> Self {
        Self {
            n_steps: DEFAULT_N_STEPS,
            n_signatures: DEFAULT_N_SIGNATURES,
            seed: thread_rng().gen(),
            model: Model::default(),
            show_progress: false,
        }
    }

    pub fn set_n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    pub fn set_n_signatures(mut self, n_signatures: usize) -> Self {
        self.n_signatures = n_signatures;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn set_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_steps == 0 {
            return Err(SamplerError::invalid_parameter(
                "n_steps",
                "at least one iteration is required",
            ));
        }
        if self.n_signatures == 0 {
            return Err(SamplerError::invalid_parameter(
                "n_signatures",
                "at least one signature is required",
            ));
        }
        Ok(())
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct SamplerOutput {
    pub posterior: PosteriorSamples,
    pub stats: RunStats,
}

/// Runs the configured model on `counts`.
pub fn sample(counts: &CountMatrix, config: &SamplerConfig) -> Result<SamplerOutput> {
    match config.model {
        Model::Full => sample_with(FullModel, counts, config),
        Model::FixedHyperparameters => sample_with(FixedHyperparameters, counts, config),
    }
}

/**
Runs any [`Transition`] under `config`. `config.model` is only used for
logging here; the transition passed in decides what is sampled.
*/
pub fn sample_with<T: Transition>(
    transition: T,
    counts: &CountMatrix,
    config: &SamplerConfig,
) -> Result<SamplerOutput> {
    config.validate()?;
    info!(
        "Sampling {} specimens x {} mutation types with {} signatures: {} steps, model {}, seed {}.",
        counts.n_specimens(),
        counts.n_mutation_types(),
        config.n_signatures,
        config.n_steps,
        config.model,
        config.seed
    );

    let mut chain =
        SignatureChain::new(transition, counts, config.n_signatures)?.set_seed(config.seed);
    let trace = if config.show_progress {
        let pb = ProgressBar::new(config.n_steps as u64);
        pb.set_prefix("Sampling");
        run_chain_progress(&mut chain, config.n_steps, &pb)?
    } else {
        run_chain(&mut chain, config.n_steps)?
    };

    let stats = chain.tracker().stats();
    info!("Finished sampling: {stats}.");
    let posterior = PosteriorSamples::from_trace(&trace, counts)?;
    Ok(SamplerOutput { posterior, stats })
}

/// Full hierarchical model with `n_signatures` signatures.
pub fn sample_full_model(
    counts: &CountMatrix,
    n_steps: usize,
    n_signatures: usize,
    seed: Option<u64>,
) -> Result<SamplerOutput> {
    sample(counts, &config_for(Model::Full, n_steps, n_signatures, seed))
}

/// Exposures and signatures only, with `n_signatures` signatures.
pub fn sample_fixed_hyperparams(
    counts: &CountMatrix,
    n_steps: usize,
    n_signatures: usize,
    seed: Option<u64>,
) -> Result<SamplerOutput> {
    sample(
        counts,
        &config_for(Model::FixedHyperparameters, n_steps, n_signatures, seed),
    )
}

fn config_for(model: Model, n_steps: usize, n_signatures: usize, seed: Option<u64>) -> SamplerConfig {
    let config = SamplerConfig::new()
        .set_n_steps(n_steps)
        .set_n_signatures(n_signatures)
        .set_model(model);
    match seed {
        Some(seed) => config.set_seed(seed),
        None => config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};

    fn counts() -> CountMatrix {
        CountMatrix::from_array(arr2(&[[20, 5, 9, 1], [4, 16, 2, 8]])).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.n_steps, DEFAULT_N_STEPS);
        assert_eq!(config.n_signatures, DEFAULT_N_SIGNATURES);
        assert_eq!(config.model, Model::Full);
        assert!(!config.show_progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = SamplerConfig::default().set_n_steps(0);
        assert!(matches!(
            config.validate(),
            Err(SamplerError::InvalidParameter { name: "n_steps", .. })
        ));
        let config = SamplerConfig::default().set_n_signatures(0);
        assert!(matches!(
            sample(&counts(), &config),
            Err(SamplerError::InvalidParameter {
                name: "n_signatures",
                ..
            })
        ));
    }

    #[test]
    fn test_sample_shapes() {
        let config = SamplerConfig::default()
            .set_n_steps(5)
            .set_n_signatures(3)
            .set_seed(1);
        let output = sample(&counts(), &config).unwrap();
        assert_eq!(output.posterior.n_draws(), 5);
        assert_eq!(output.stats.n_steps, 5);
        assert_eq!(
            output.posterior.variable("exposure").unwrap().values.shape(),
            &[1, 5, 2, 3]
        );
        assert_eq!(
            output.posterior.variable("signature").unwrap().values.shape(),
            &[1, 5, 3, 4]
        );
    }

    #[test]
    fn test_fixed_model_has_no_proposals() {
        let config = SamplerConfig::default()
            .set_n_steps(5)
            .set_n_signatures(2)
            .set_seed(3)
            .set_model(Model::FixedHyperparameters);
        let output = sample(&counts(), &config).unwrap();
        assert_eq!(output.stats.exposure.proposals, 0);
        assert_eq!(output.stats.signature.proposals, 0);
        let alpha = output.posterior.draw("alpha_exposure", 4).unwrap();
        assert_eq!(alpha, Array2::from_elem((2, 2), 0.5).into_dyn().view());
    }

    #[test]
    fn test_convenience_entry_points_take_k() {
        let output = sample_full_model(&counts(), 3, 4, Some(9)).unwrap();
        assert_eq!(output.posterior.coords().sig, vec!["S1", "S2", "S3", "S4"]);
        assert_eq!(output.stats.exposure.proposals, 3);

        let output =
            sample_fixed_hyperparams(&counts(), 3, DEFAULT_N_SIGNATURES, None).unwrap();
        assert_eq!(output.posterior.n_draws(), 3);
        assert_eq!(output.posterior.coords().sig.len(), DEFAULT_N_SIGNATURES);
        assert_eq!(output.stats.exposure.proposals, 0);

        assert!(sample_full_model(&counts(), 3, 0, Some(9)).is_err());
    }

    #[test]
    fn test_same_seed_same_posterior() {
        let config = SamplerConfig::default().set_n_steps(8).set_seed(1234);
        let a = sample(&counts(), &config).unwrap();
        let b = sample(&counts(), &config).unwrap();
        assert_eq!(a.posterior, b.posterior);
        assert_eq!(a.stats, b.stats);
    }
}
