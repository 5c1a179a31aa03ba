/*!
# Core MCMC Utilities

This module ties the update rules together into a Markov chain and runs it.
It includes:
- The [`Transition`] trait and its two implementations, [`FullModel`] and
  [`FixedHyperparameters`], which map one [`State`] to the next.
- [`SignatureChain`], a chain over the signature model that owns the current
  state, the random stream and the acceptance bookkeeping.
- The [`MarkovChain`] trait and the drivers [`run_chain`] and
  [`run_chain_progress`], which apply the transition a fixed number of times
  and collect a [`Trace`].

Transitions are applied strictly one after another; each depends on the
previous state. Any error aborts the run and no partial trace is returned.
*/

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use log::trace;

use crate::counts::CountMatrix;
use crate::error::{Result, SamplerError};
use crate::gibbs::{update_exponential_rate, update_params};
use crate::metropolis_hastings::update_concentration;
use crate::random::RandomSource;
use crate::stats::{AcceptanceTracker, ConcentrationBlock};
use crate::trace::{State, Trace};

/// One full MCMC transition of the signature model.
pub trait Transition {
    /// Draws the next state from `state`. The order of draws on `source` is
    /// part of the contract: it is what makes seeded runs reproducible.
    fn step(
        &self,
        state: &State,
        counts: &CountMatrix,
        source: &mut RandomSource,
        tracker: &mut AcceptanceTracker,
    ) -> Result<State>;
}

/**
Updates every quantity of the hierarchical model, in this order:

1. exposures and signatures (Gibbs),
2. `alpha_exposure` given the new exposures (Metropolis–Hastings),
3. `alpha_signature` given the new signatures (Metropolis–Hastings),
4. `lambda_exposure` given the new `alpha_exposure` (Gibbs),
5. `lambda_signature` given the new `alpha_signature` (Gibbs).
*/
#[derive(Debug, Clone, Copy, Default)]
pub struct FullModel;

impl Transition for FullModel {
    fn step(
        &self,
        state: &State,
        counts: &CountMatrix,
        source: &mut RandomSource,
        tracker: &mut AcceptanceTracker,
    ) -> Result<State> {
        let (exposure, signature) = update_params(
            &state.exposure,
            &state.signature,
            &state.alpha_exposure,
            &state.alpha_signature,
            counts,
            source,
        )?;

        let exposure_update = update_concentration(
            &state.alpha_exposure,
            &exposure,
            state.lambda_exposure,
            source,
        )?;
        tracker.record(ConcentrationBlock::Exposure, exposure_update.accepted);

        let signature_update = update_concentration(
            &state.alpha_signature,
            &signature,
            state.lambda_signature,
            source,
        )?;
        tracker.record(ConcentrationBlock::Signature, signature_update.accepted);

        let lambda_exposure = update_exponential_rate(&exposure_update.value, source)?;
        let lambda_signature = update_exponential_rate(&signature_update.value, source)?;

        Ok(State {
            exposure,
            signature,
            alpha_exposure: exposure_update.value,
            alpha_signature: signature_update.value,
            lambda_exposure,
            lambda_signature,
        })
    }
}

/// Updates exposures and signatures only; concentrations and rates keep
/// their initial values for the whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedHyperparameters;

impl Transition for FixedHyperparameters {
    fn step(
        &self,
        state: &State,
        counts: &CountMatrix,
        source: &mut RandomSource,
        _tracker: &mut AcceptanceTracker,
    ) -> Result<State> {
        let (exposure, signature) = update_params(
            &state.exposure,
            &state.signature,
            &state.alpha_exposure,
            &state.alpha_signature,
            counts,
            source,
        )?;
        Ok(State {
            exposure,
            signature,
            ..state.clone()
        })
    }
}

/// A trait that abstracts a single MCMC chain.
pub trait MarkovChain {
    /// Performs one transition and returns a reference to the new state.
    fn step(&mut self) -> Result<&State>;

    /// Returns the current state without advancing the chain.
    fn current_state(&self) -> &State;

    /// Returns the acceptance bookkeeping of the chain so far.
    fn tracker(&self) -> &AcceptanceTracker;
}

/// A Markov chain over the signature model for one count matrix.
#[derive(Debug, Clone)]
pub struct SignatureChain<'a, T: Transition> {
    /// The transition applied at every step.
    pub transition: T,
    /// The observed counts the chain conditions on.
    pub counts: &'a CountMatrix,
    /// Current state of the chain.
    pub current_state: State,
    /// Random stream of this chain.
    pub source: RandomSource,
    tracker: AcceptanceTracker,
}

impl<'a, T: Transition> SignatureChain<'a, T> {
    /**
    Creates a chain at the initial state for `n_signatures` signatures, with
    a random stream seeded from entropy. Use [`SignatureChain::set_seed`] for
    reproducible runs.
    */
    pub fn new(transition: T, counts: &'a CountMatrix, n_signatures: usize) -> Result<Self> {
        if n_signatures == 0 {
            return Err(SamplerError::invalid_parameter(
                "n_signatures",
                "at least one signature is required",
            ));
        }
        let current_state = State::initial(
            counts.n_specimens(),
            n_signatures,
            counts.n_mutation_types(),
        );
        Ok(Self {
            transition,
            counts,
            current_state,
            source: RandomSource::new(),
            tracker: AcceptanceTracker::default(),
        })
    }

    /// Replaces the random stream with one derived from `seed`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.source.reseed(seed);
        self
    }
}

impl<T: Transition> MarkovChain for SignatureChain<'_, T> {
    fn step(&mut self) -> Result<&State> {
        let next = self.transition.step(
            &self.current_state,
            self.counts,
            &mut self.source,
            &mut self.tracker,
        )?;
        debug_assert!(next.is_valid(), "transition left the model's support");
        self.current_state = next;
        self.tracker.finish_step();
        Ok(&self.current_state)
    }

    fn current_state(&self) -> &State {
        &self.current_state
    }

    fn tracker(&self) -> &AcceptanceTracker {
        &self.tracker
    }
}

/**
Runs a chain for `n_steps` transitions.

Returns the trace of `n_steps + 1` states: the state the chain started in,
followed by the state after every transition.
*/
pub fn run_chain<M: MarkovChain>(chain: &mut M, n_steps: usize) -> Result<Trace> {
    let mut out = Trace::with_capacity(chain.current_state().clone(), n_steps);
    for i in 0..n_steps {
        let state = chain.step()?;
        trace!("Finished MCMC step {}.", i + 1);
        out.push(state.clone());
    }
    Ok(out)
}

/**
Like [`run_chain`], but reports progress on `pb`. The bar message shows
the running acceptance rates of both concentration blocks, refreshed at most
once per second.
*/
pub fn run_chain_progress<M: MarkovChain>(
    chain: &mut M,
    n_steps: usize,
    pb: &ProgressBar,
) -> Result<Trace> {
    let style = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_length(n_steps as u64);

    let mut out = Trace::with_capacity(chain.current_state().clone(), n_steps);
    let mut last = Instant::now();
    let freq = Duration::from_secs(1);

    for i in 0..n_steps {
        let state = match chain.step() {
            Ok(state) => state.clone(),
            Err(e) => {
                pb.abandon_with_message("Aborted");
                return Err(e);
            }
        };
        out.push(state);
        pb.inc(1);

        let now = Instant::now();
        if now >= last + freq || i + 1 == n_steps {
            pb.set_message(acceptance_message(chain.tracker()));
            last = now;
        }
    }

    pb.finish_with_message(format!("Done! {}", acceptance_message(chain.tracker())));
    Ok(out)
}

fn acceptance_message(tracker: &AcceptanceTracker) -> String {
    let show = |rate: Option<f64>| rate.map_or("-".to_string(), |r| format!("{r:.2}"));
    format!(
        "p(accept) exposure={} signature={}",
        show(tracker.recent_rate(ConcentrationBlock::Exposure)),
        show(tracker.recent_rate(ConcentrationBlock::Signature))
    )
}
