/*!
# Metropolis–Hastings Concentration Update

Updates a Dirichlet concentration block (`alpha_exposure` or
`alpha_signature`) given the proportions it generated and the current rate
of its exponential prior.

## Overview

- **Target ([`Target`])**: Dirichlet log-likelihood of the proportions plus
  the exponential log-prior, see [`ConcentrationPosterior`].
- **Proposal ([`Proposal`])**: elementwise Gamma centred on the current
  value with a fixed spread, see [`GammaProposal`].
- **Decision**: one uniform draw decides for the whole block. The block is
  never updated component-wise.

The acceptance log-ratio is

```text
log r = [log p(candidate) - log p(current)]
      + [log q(candidate | current) - log q(current | candidate)]
```

and the candidate is accepted iff `u < exp(log r)`. Each of the four
log-densities must be finite, otherwise the candidate is rejected; so is a
candidate with a non-positive or non-finite entry. A candidate small enough
that its reversed proposal shape underflows to zero has a `-inf` backward
density and is rejected, never accepted on the resulting `+inf` ratio.

## Example

```rust
use signature_mcmc::metropolis_hastings::update_concentration;
use signature_mcmc::random::RandomSource;
use ndarray::arr2;

let mut source = RandomSource::seeded(42);
let alpha = arr2(&[[5.0, 5.0]]);
let proportions = arr2(&[[0.4, 0.6]]);
let update = update_concentration(&alpha, &proportions, 1.0, &mut source).unwrap();
assert!(update.value.iter().all(|&a| a > 0.0));
if !update.accepted {
    assert_eq!(update.value, alpha);
}
```
*/

use log::trace;
use ndarray::Array2;
use ndarray_stats::QuantileExt;

use crate::distributions::{ConcentrationPosterior, GammaProposal, Proposal, Target};
use crate::error::{Result, SamplerError};
use crate::random::RandomSource;

/// Outcome of one Metropolis–Hastings step on a concentration block.
#[derive(Debug, Clone, PartialEq)]
pub struct MetropolisUpdate {
    /// The block after the step: the candidate if accepted, the current value otherwise.
    pub value: Array2<f64>,
    /// Whether the candidate was accepted.
    pub accepted: bool,
    /// The acceptance log-ratio (`-inf` for an invalid candidate or a
    /// non-finite log-density).
    pub log_ratio: f64,
}

/**
Performs one Metropolis–Hastings step from `current` for any target and
proposal.

The uniform is drawn even when the candidate is invalid, so every call
consumes the same kinds of draws in the same order.
*/
pub fn metropolis_step<T, Q>(
    target: &T,
    proposal: &Q,
    current: &Array2<f64>,
    source: &mut RandomSource,
) -> Result<MetropolisUpdate>
where
    T: Target,
    Q: Proposal,
{
    let candidate = proposal.sample(current, source)?;

    let log_ratio = if is_valid_concentration(&candidate) {
        let terms = [
            target.unnorm_logp(&candidate),
            target.unnorm_logp(current),
            proposal.logp(current, &candidate),
            proposal.logp(&candidate, current),
        ];
        if terms.iter().all(|t| t.is_finite()) {
            (terms[0] - terms[1]) + (terms[2] - terms[3])
        } else {
            trace!("Non-finite log-density in concentration update: {terms:?}.");
            f64::NEG_INFINITY
        }
    } else {
        trace!("Concentration candidate has non-positive or non-finite entries.");
        f64::NEG_INFINITY
    };

    let u = source.uniform();
    let accepted = log_ratio.is_finite() && u < log_ratio.exp();
    let value = if accepted { candidate } else { current.clone() };
    Ok(MetropolisUpdate {
        value,
        accepted,
        log_ratio,
    })
}

/**
Metropolis–Hastings update of a Dirichlet concentration block.

# Arguments

* `alpha` - Current concentration, one row per Dirichlet (M × k).
* `proportions` - The probability vectors drawn from those Dirichlets (M × k).
* `prior_lambda` - Rate of the exponential prior on the concentration.
* `source` - The random stream.
*/
pub fn update_concentration(
    alpha: &Array2<f64>,
    proportions: &Array2<f64>,
    prior_lambda: f64,
    source: &mut RandomSource,
) -> Result<MetropolisUpdate> {
    if alpha.dim() != proportions.dim() {
        return Err(SamplerError::ShapeMismatch {
            what: "proportions",
            expected: alpha.len(),
            got: proportions.len(),
        });
    }
    let target = ConcentrationPosterior {
        proportions,
        prior_lambda,
    };
    metropolis_step(&target, &GammaProposal::default(), alpha, source)
}

fn is_valid_concentration(alpha: &Array2<f64>) -> bool {
    let positive = alpha.min().map_or(false, |&m| m > 0.0);
    let finite = alpha.max().map_or(false, |m| m.is_finite());
    positive && finite
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    /// Always proposes the same value, with a symmetric (zero) log-density.
    struct FixedProposal {
        value: Array2<f64>,
    }

    impl Proposal for FixedProposal {
        fn sample(&self, _current: &Array2<f64>, _source: &mut RandomSource) -> Result<Array2<f64>> {
            Ok(self.value.clone())
        }

        fn logp(&self, _from: &Array2<f64>, _to: &Array2<f64>) -> f64 {
            0.0
        }
    }

    /// Log-density that is constant or impossible everywhere.
    struct ConstantTarget {
        logp: f64,
    }

    impl Target for ConstantTarget {
        fn unnorm_logp(&self, _alpha: &Array2<f64>) -> f64 {
            self.logp
        }
    }

    /// Log-density that is zero at `favoured` and `-inf` elsewhere.
    struct PointTarget {
        favoured: Array2<f64>,
    }

    impl Target for PointTarget {
        fn unnorm_logp(&self, alpha: &Array2<f64>) -> f64 {
            if *alpha == self.favoured {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        }
    }

    #[test]
    fn test_equal_density_always_accepts() {
        let mut source = RandomSource::seeded(1);
        let current = arr2(&[[1.0, 1.0]]);
        let proposal = FixedProposal {
            value: arr2(&[[2.0, 3.0]]),
        };
        for _ in 0..100 {
            let update =
                metropolis_step(&ConstantTarget { logp: 0.0 }, &proposal, &current, &mut source)
                    .unwrap();
            assert!(update.accepted);
            assert_eq!(update.value, proposal.value);
        }
    }

    #[test]
    fn test_impossible_candidate_never_accepts() {
        let mut source = RandomSource::seeded(2);
        let current = arr2(&[[1.0, 1.0]]);
        let target = PointTarget {
            favoured: current.clone(),
        };
        let proposal = FixedProposal {
            value: arr2(&[[2.0, 3.0]]),
        };
        for _ in 0..100 {
            let update = metropolis_step(&target, &proposal, &current, &mut source).unwrap();
            assert!(!update.accepted);
            assert_eq!(update.log_ratio, f64::NEG_INFINITY);
            assert_eq!(update.value, current);
        }
    }

    #[test]
    fn test_nan_ratio_rejects() {
        let mut source = RandomSource::seeded(3);
        let current = arr2(&[[1.0]]);
        let proposal = FixedProposal {
            value: arr2(&[[2.0]]),
        };
        // inf - inf would be NaN
        let target = ConstantTarget {
            logp: f64::INFINITY,
        };
        let update = metropolis_step(&target, &proposal, &current, &mut source).unwrap();
        assert_eq!(update.log_ratio, f64::NEG_INFINITY);
        assert!(!update.accepted);
    }

    /// Proposes a fixed candidate but scores it with the Gamma proposal density.
    struct FixedGammaCandidate {
        value: Array2<f64>,
    }

    impl Proposal for FixedGammaCandidate {
        fn sample(&self, _current: &Array2<f64>, _source: &mut RandomSource) -> Result<Array2<f64>> {
            Ok(self.value.clone())
        }

        fn logp(&self, from: &Array2<f64>, to: &Array2<f64>) -> f64 {
            GammaProposal::default().logp(from, to)
        }
    }

    #[test]
    fn test_underflowed_reverse_shape_rejects() {
        // (1e-320 / 10)^2 underflows to 0, so log q(current | candidate) is -inf
        // and the raw ratio would be +inf.
        let current = arr2(&[[0.5, 0.5]]);
        let candidate = arr2(&[[1e-320, 1.0]]);
        let proposal = FixedGammaCandidate {
            value: candidate.clone(),
        };
        assert_eq!(proposal.logp(&candidate, &current), f64::NEG_INFINITY);

        let proportions = arr2(&[[0.3, 0.7]]);
        let target = ConcentrationPosterior {
            proportions: &proportions,
            prior_lambda: 1.0,
        };
        let mut source = RandomSource::seeded(6);
        for _ in 0..100 {
            let update = metropolis_step(&target, &proposal, &current, &mut source).unwrap();
            assert!(!update.accepted);
            assert_eq!(update.log_ratio, f64::NEG_INFINITY);
            assert_eq!(update.value, current);
        }
    }

    #[test]
    fn test_accepted_values_stay_in_normal_range() {
        let alpha = Array2::from_elem((2, 2), 0.5);
        let proportions = arr2(&[[0.4, 0.6], [0.25, 0.75]]);
        let mut source = RandomSource::seeded(3);
        for _ in 0..20_000 {
            let update = update_concentration(&alpha, &proportions, 1.0, &mut source).unwrap();
            if update.accepted {
                assert!(update.log_ratio.is_finite());
                assert!(
                    update.value.iter().all(|&a| a >= f64::MIN_POSITIVE),
                    "accepted a subnormal concentration: {}",
                    update.value
                );
            }
        }
    }

    #[test]
    fn test_non_positive_candidate_rejects() {
        let mut source = RandomSource::seeded(4);
        let current = arr2(&[[1.0, 1.0]]);
        let proposal = FixedProposal {
            value: arr2(&[[0.0, 3.0]]),
        };
        let update =
            metropolis_step(&ConstantTarget { logp: 0.0 }, &proposal, &current, &mut source)
                .unwrap();
        assert!(!update.accepted);
        assert_eq!(update.value, current);
    }

    #[test]
    fn test_uniform_drawn_on_rejection() {
        // An invalid candidate must advance the stream exactly like a valid one.
        let current = arr2(&[[1.0]]);
        let valid = FixedProposal {
            value: arr2(&[[2.0]]),
        };
        let invalid = FixedProposal {
            value: arr2(&[[-2.0]]),
        };
        let target = ConstantTarget { logp: 0.0 };

        let mut a = RandomSource::seeded(5);
        let mut b = RandomSource::seeded(5);
        metropolis_step(&target, &valid, &current, &mut a).unwrap();
        metropolis_step(&target, &invalid, &current, &mut b).unwrap();
        assert_eq!(a.uniform().to_bits(), b.uniform().to_bits());
    }

    #[test]
    fn test_update_concentration_mixes() {
        let mut source = RandomSource::seeded(42);
        let alpha = arr2(&[[5.0, 5.0]]);
        let proportions = arr2(&[[0.5, 0.5]]);
        let trials = 2000;
        let mut accepted = 0;
        for _ in 0..trials {
            let update = update_concentration(&alpha, &proportions, 1.0, &mut source).unwrap();
            assert!(update.value.iter().all(|&a| a > 0.0 && a.is_finite()));
            if update.accepted {
                accepted += 1;
            } else {
                assert_eq!(update.value, alpha);
            }
        }
        assert!(
            accepted > 0 && accepted < trials,
            "acceptance count {accepted} out of {trials}"
        );
    }

    #[test]
    fn test_update_concentration_shape_mismatch() {
        let mut source = RandomSource::seeded(42);
        let result = update_concentration(
            &arr2(&[[1.0, 1.0]]),
            &arr2(&[[1.0]]),
            1.0,
            &mut source,
        );
        assert!(matches!(result, Err(SamplerError::ShapeMismatch { .. })));
    }
}
