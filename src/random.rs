/*!
# Random Draw Source

A single, explicitly passed random stream that produces the four primitive
draws the sampler needs: uniform, gamma, Dirichlet and multinomial.

Every update rule takes `&mut RandomSource`, so the order of draws within a
step is the order of calls in the code. Re-seeding replaces the stream
deterministically; two sources with the same seed produce identical draws.

```rust
use signature_mcmc::random::RandomSource;
use ndarray::arr1;

let mut source = RandomSource::new().set_seed(42);
let weights = source.dirichlet(arr1(&[0.5, 2.0, 7.0]).view()).unwrap();
assert!((weights.sum() - 1.0).abs() < 1e-12);

let counts = source.multinomial(20, weights.view()).unwrap();
assert_eq!(counts.sum(), 20);
```
*/

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use rand_distr::{Binomial, Distribution, Gamma};

use crate::error::{Result, SamplerError};

/// Re-seedable stream of primitive random draws.
#[derive(Debug, Clone)]
pub struct RandomSource {
    /// The seed the current stream was created from.
    pub seed: u64,
    rng: SmallRng,
}

impl RandomSource {
    /// Creates a source seeded from the thread-local entropy pool.
    pub fn new() -> Self {
        let seed = thread_rng().gen::<u64>();
        Self::seeded(seed)
    }

    /// Creates a source whose stream is fully determined by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Replaces the stream with a fresh one derived from `seed`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    /// In-place variant of [`RandomSource::set_seed`].
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Draws from Uniform[0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen()
    }

    /**
    Draws from Gamma(`shape`, `rate`).

    A shape of exactly zero is the degenerate point mass at zero and consumes
    no randomness. Any other non-positive or non-finite parameter is an error.
    */
    pub fn gamma(&mut self, shape: f64, rate: f64) -> Result<f64> {
        if shape == 0.0 {
            return Ok(0.0);
        }
        if !(shape > 0.0 && shape.is_finite()) {
            return Err(SamplerError::distribution(
                "gamma",
                format!("shape must be positive and finite, got {shape}"),
            ));
        }
        let scale = 1.0 / rate;
        if !(rate > 0.0 && scale.is_finite()) {
            return Err(SamplerError::distribution(
                "gamma",
                format!("rate must be positive and finite, got {rate}"),
            ));
        }
        let gamma =
            Gamma::new(shape, scale).map_err(|e| SamplerError::distribution("gamma", e))?;
        Ok(gamma.sample(&mut self.rng))
    }

    /// Elementwise Gamma draws, visited in row-major order.
    pub fn gamma_array(&mut self, shape: &Array2<f64>, rate: &Array2<f64>) -> Result<Array2<f64>> {
        if shape.dim() != rate.dim() {
            return Err(SamplerError::ShapeMismatch {
                what: "gamma rate",
                expected: shape.len(),
                got: rate.len(),
            });
        }
        let draws = shape
            .iter()
            .zip(rate.iter())
            .map(|(&a, &b)| self.gamma(a, b))
            .collect::<Result<Vec<f64>>>()?;
        Array2::from_shape_vec(shape.raw_dim(), draws)
            .map_err(|e| SamplerError::distribution("gamma", e))
    }

    /**
    Draws one probability vector from Dirichlet(`alpha`).

    The gamma variates are kept in log space. For concentrations below one
    the variate is boosted as `Gamma(a + 1) * U^(1/a)`, so tiny concentrations
    give exact zeros instead of a `0 / 0` row. When every component
    underflows, the draw is the limiting point mass at vertex `i`, chosen
    with probability `alpha[i] / sum(alpha)`.
    */
    pub fn dirichlet(&mut self, alpha: ArrayView1<f64>) -> Result<Array1<f64>> {
        if alpha.is_empty() {
            return Err(SamplerError::distribution(
                "dirichlet",
                "concentration vector is empty",
            ));
        }
        let mut log_g = Array1::<f64>::zeros(alpha.len());
        for (lg, &a) in log_g.iter_mut().zip(alpha.iter()) {
            if !(a > 0.0 && a.is_finite()) {
                return Err(SamplerError::distribution(
                    "dirichlet",
                    format!("concentration must be positive and finite, got {a}"),
                ));
            }
            *lg = if a < 1.0 {
                let g = Gamma::new(a + 1.0, 1.0)
                    .map_err(|e| SamplerError::distribution("dirichlet", e))?
                    .sample(&mut self.rng);
                let u = 1.0 - self.rng.gen::<f64>();
                g.ln() + u.ln() / a
            } else {
                Gamma::new(a, 1.0)
                    .map_err(|e| SamplerError::distribution("dirichlet", e))?
                    .sample(&mut self.rng)
                    .ln()
            };
        }

        let max = log_g.fold(f64::NEG_INFINITY, |m, &x| m.max(x));
        if max == f64::NEG_INFINITY {
            return Ok(self.vertex(alpha));
        }
        let mut out = log_g.mapv(|x| (x - max).exp());
        let total = out.sum();
        out /= total;
        Ok(out)
    }

    /// Draws each row of the result from Dirichlet(`alpha[row, ..]`), top to bottom.
    pub fn dirichlet_rows(&mut self, alpha: ArrayView2<f64>) -> Result<Array2<f64>> {
        let mut out = Array2::<f64>::zeros(alpha.raw_dim());
        for (mut row, a) in out.axis_iter_mut(Axis(0)).zip(alpha.axis_iter(Axis(0))) {
            row.assign(&self.dirichlet(a)?);
        }
        Ok(out)
    }

    /**
    Draws category counts from Multinomial(`n`, `probs`).

    Implemented as a chain of conditional binomials, so the result always
    sums to `n` exactly. `probs` need not be normalized.
    */
    pub fn multinomial(&mut self, n: u64, probs: ArrayView1<f64>) -> Result<Array1<u64>> {
        let mut out = Array1::<u64>::zeros(probs.len());
        if let Some(&p) = probs.iter().find(|&&p| !(p >= 0.0 && p.is_finite())) {
            return Err(SamplerError::distribution(
                "multinomial",
                format!("probabilities must be non-negative and finite, got {p}"),
            ));
        }
        if n == 0 {
            return Ok(out);
        }
        if probs.is_empty() {
            return Err(SamplerError::distribution(
                "multinomial",
                "probability vector is empty",
            ));
        }

        let last = probs.len() - 1;
        let mut remaining_n = n;
        let mut remaining_p = probs.sum();
        for (s, &p) in probs.iter().enumerate() {
            if remaining_n == 0 {
                break;
            }
            if s == last {
                out[s] = remaining_n;
                break;
            }
            let q = if remaining_p > 0.0 {
                (p / remaining_p).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let x = Binomial::new(remaining_n, q)
                .map_err(|e| SamplerError::distribution("multinomial", e))?
                .sample(&mut self.rng);
            out[s] = x;
            remaining_n -= x;
            remaining_p -= p;
        }
        Ok(out)
    }

    fn vertex(&mut self, alpha: ArrayView1<f64>) -> Array1<f64> {
        let mut out = Array1::<f64>::zeros(alpha.len());
        let target = self.uniform() * alpha.sum();
        let mut cum = 0.0;
        let mut chosen = alpha.len() - 1;
        for (i, &a) in alpha.iter().enumerate() {
            cum += a;
            if target < cum {
                chosen = i;
                break;
            }
        }
        out[chosen] = 1.0;
        out
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}
