/*!
Log-densities and the target/proposal pair used by the concentration update.

The Metropolis–Hastings step in [`crate::metropolis_hastings`] is written
against two small traits, in the same shape as any other MH sampler:

- [`Target`] gives the unnormalized log posterior of a concentration block.
- [`Proposal`] draws a candidate and evaluates `log q(to | from)`.

[`ConcentrationPosterior`] and [`GammaProposal`] are the implementations the
signature model uses. The free functions ([`dirichlet_logp`],
[`exponential_logp`], [`gamma_logp`]) are plain array reductions over
`ndarray` inputs.

# Examples

```rust
use signature_mcmc::distributions::{dirichlet_logp, gamma_logp};
use ndarray::arr2;

// A flat Dirichlet(1, 1) has density 1 everywhere on the simplex.
let alpha = arr2(&[[1.0, 1.0]]);
let p = arr2(&[[0.3, 0.7]]);
assert!(dirichlet_logp(&alpha, &p).abs() < 1e-12);

// Gamma(1, 1) is Exp(1): log f(x) = -x.
let x = arr2(&[[2.0]]);
let lp = gamma_logp(&arr2(&[[1.0]]), &arr2(&[[1.0]]), &x);
assert!((lp + 2.0).abs() < 1e-12);
```
*/

use ndarray::{Array2, Axis, Zip};
use statrs::function::gamma::ln_gamma;

use crate::error::Result;
use crate::random::RandomSource;

/// Spread of the Gamma proposal. With shape `(alpha/σ)²` and rate `alpha/σ²`
/// the candidate has mean `alpha` and standard deviation `σ`.
pub const METROPOLIS_SIGMA: f64 = 10.0;

/// A trait for concentration blocks we want to sample with Metropolis–Hastings.
pub trait Target {
    /// Returns the log of the unnormalized posterior density at `alpha`.
    fn unnorm_logp(&self, alpha: &Array2<f64>) -> f64;
}

/// A trait for generating proposals in Metropolis–Hastings.
pub trait Proposal {
    /// Samples a candidate from q(· | current).
    fn sample(&self, current: &Array2<f64>, source: &mut RandomSource) -> Result<Array2<f64>>;

    /// Evaluates log q(to | from), summed over every entry.
    fn logp(&self, from: &Array2<f64>, to: &Array2<f64>) -> f64;
}

/**
Multivariate Dirichlet log-density of every row of `proportions` under the
matching row of `alpha`, summed over rows:

`sum((alpha - 1) ln p) + sum_rows lnΓ(sum_row alpha) - sum lnΓ(alpha)`.

Zero proportions give `±inf` (or NaN when both signs meet); callers treat
non-finite results as impossible states.
*/
pub fn dirichlet_logp(alpha: &Array2<f64>, proportions: &Array2<f64>) -> f64 {
    let kernel: f64 = Zip::from(alpha)
        .and(proportions)
        .fold(0.0, |acc, &a, &p| acc + (a - 1.0) * p.ln());
    let norm: f64 = alpha
        .sum_axis(Axis(1))
        .iter()
        .map(|&row_total| ln_gamma(row_total))
        .sum();
    let ln_gammas: f64 = alpha.iter().map(|&a| ln_gamma(a)).sum();
    kernel + norm - ln_gammas
}

/// Exponential(`lambda`) log-prior on the total concentration, without the
/// constant term: `-lambda * sum(alpha)`.
pub fn exponential_logp(lambda: f64, alpha: &Array2<f64>) -> f64 {
    -lambda * alpha.sum()
}

/// Gamma(shape, rate) log-density evaluated elementwise at `x` and summed.
pub fn gamma_logp(shape: &Array2<f64>, rate: &Array2<f64>, x: &Array2<f64>) -> f64 {
    Zip::from(shape)
        .and(rate)
        .and(x)
        .fold(0.0, |acc, &a, &b, &v| {
            acc + a * b.ln() - ln_gamma(a) + (a - 1.0) * v.ln() - b * v
        })
}

/**
Posterior of a Dirichlet concentration block given the proportions it
generated and an exponential prior with rate `prior_lambda`.
*/
#[derive(Debug, Clone, Copy)]
pub struct ConcentrationPosterior<'a> {
    pub proportions: &'a Array2<f64>,
    pub prior_lambda: f64,
}

impl Target for ConcentrationPosterior<'_> {
    fn unnorm_logp(&self, alpha: &Array2<f64>) -> f64 {
        dirichlet_logp(alpha, self.proportions) + exponential_logp(self.prior_lambda, alpha)
    }
}

/**
Independent Gamma proposal centred on the current value.

For a current value `alpha` the candidate is drawn from
Gamma(`(alpha/σ)²`, `alpha/σ²`) elementwise, whose mean is `alpha`. The
parameters are deterministic functions of the conditioning value with a
fixed `σ`, which is what makes the Hastings correction in
[`Proposal::logp`] valid.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaProposal {
    pub sigma: f64,
}

impl GammaProposal {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    /// Returns the (shape, rate) arrays of q(· | `from`).
    pub fn parameters(&self, from: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        let sigma = self.sigma;
        let shape = from.mapv(|a| (a / sigma).powi(2));
        let rate = from.mapv(|a| a / (sigma * sigma));
        (shape, rate)
    }
}

impl Default for GammaProposal {
    fn default() -> Self {
        Self::new(METROPOLIS_SIGMA)
    }
}

impl Proposal for GammaProposal {
    fn sample(&self, current: &Array2<f64>, source: &mut RandomSource) -> Result<Array2<f64>> {
        let (shape, rate) = self.parameters(current);
        source.gamma_array(&shape, &rate)
    }

    fn logp(&self, from: &Array2<f64>, to: &Array2<f64>) -> f64 {
        let (shape, rate) = self.parameters(from);
        gamma_logp(&shape, &rate, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    #[test]
    fn test_dirichlet_logp_matches_beta() {
        // Dirichlet(2, 3) on (x, 1 - x) is Beta(2, 3): 12 x (1 - x)^2.
        let alpha = arr2(&[[2.0, 3.0]]);
        let x: f64 = 0.25;
        let p = arr2(&[[x, 1.0 - x]]);
        let expected = (12.0 * x * (1.0 - x).powi(2)).ln();
        assert_abs_diff_eq!(dirichlet_logp(&alpha, &p), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_dirichlet_logp_sums_rows() {
        let alpha = arr2(&[[2.0, 3.0], [0.5, 4.0]]);
        let p = arr2(&[[0.4, 0.6], [0.1, 0.9]]);
        let row_0 = dirichlet_logp(&arr2(&[[2.0, 3.0]]), &arr2(&[[0.4, 0.6]]));
        let row_1 = dirichlet_logp(&arr2(&[[0.5, 4.0]]), &arr2(&[[0.1, 0.9]]));
        assert_abs_diff_eq!(dirichlet_logp(&alpha, &p), row_0 + row_1, epsilon = 1e-12);
    }

    #[test]
    fn test_dirichlet_logp_zero_proportion_not_finite() {
        let alpha = arr2(&[[0.5, 0.5]]);
        let p = arr2(&[[0.0, 1.0]]);
        assert!(!dirichlet_logp(&alpha, &p).is_finite());
    }

    #[test]
    fn test_exponential_logp() {
        let alpha = arr2(&[[0.5, 1.5], [2.0, 1.0]]);
        assert_abs_diff_eq!(exponential_logp(2.0, &alpha), -10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gamma_logp_known_value() {
        // Gamma(shape 2, rate 3) at x = 0.5: 9 * 0.5 * exp(-1.5).
        let lp = gamma_logp(&arr2(&[[2.0]]), &arr2(&[[3.0]]), &arr2(&[[0.5]]));
        let expected = (9.0_f64 * 0.5 * (-1.5_f64).exp()).ln();
        assert_abs_diff_eq!(lp, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_gamma_proposal_parameters() {
        let proposal = GammaProposal::default();
        let (shape, rate) = proposal.parameters(&arr2(&[[0.5, 20.0]]));
        assert_abs_diff_eq!(shape, arr2(&[[0.0025, 4.0]]), epsilon = 1e-15);
        assert_abs_diff_eq!(rate, arr2(&[[0.005, 0.2]]), epsilon = 1e-15);
        // mean = shape / rate = alpha
        assert_abs_diff_eq!(&shape / &rate, arr2(&[[0.5, 20.0]]), epsilon = 1e-12);
    }

    #[test]
    fn test_gamma_proposal_logp_is_asymmetric() {
        let proposal = GammaProposal::default();
        let a = arr2(&[[1.0, 2.0]]);
        let b = arr2(&[[3.0, 0.5]]);
        let forward = proposal.logp(&a, &b);
        let backward = proposal.logp(&b, &a);
        assert!(forward.is_finite() && backward.is_finite());
        assert!((forward - backward).abs() > 1e-6);
    }

    #[test]
    fn test_concentration_posterior() {
        let p = arr2(&[[0.2, 0.8]]);
        let target = ConcentrationPosterior {
            proportions: &p,
            prior_lambda: 1.5,
        };
        let alpha = arr2(&[[1.0, 2.0]]);
        let expected = dirichlet_logp(&alpha, &p) - 1.5 * 3.0;
        assert_abs_diff_eq!(target.unnorm_logp(&alpha), expected, epsilon = 1e-12);
    }
}
