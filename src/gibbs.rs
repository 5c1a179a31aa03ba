/*!
# Conjugate Gibbs Updates

The two updates of the signature model that can be drawn exactly from their
full conditionals:

- [`update_params`]: latent allocation of every specimen's mutations to
  signatures, followed by the Dirichlet posterior draws of exposures and
  signatures.
- [`update_exponential_rate`]: the Gamma posterior of the exponential prior
  rate that governs a concentration block.

Array orientation used throughout:

| array          | shape     | index             |
|----------------|-----------|-------------------|
| exposure       | (n, k)    | [specimen, sig]   |
| signature      | (k, p)    | [sig, class]      |
| conditional, Z | (n, p, k) | [specimen, class, sig] |
*/

use log::trace;
use ndarray::{s, Array, Array2, Array3, Axis, Dimension, Zip};
use rayon::prelude::*;

use crate::counts::CountMatrix;
use crate::error::{Result, SamplerError};
use crate::random::RandomSource;

/**
Returns `conditional[i, j, s]`, the probability that a mutation of class `j`
in specimen `i` was produced by signature `s`:

`signature[s, j] * exposure[i, s] / sum_s' signature[s', j] * exposure[i, s']`.

Cells whose joint mass is zero or not finite are filled with NaN; whether
that is an error depends on the count in that cell (see
[`sample_latent_assignment`]). Specimens are processed in parallel; the
result does not depend on the thread schedule.

Fails with [`SamplerError::ShapeMismatch`] unless `exposure` has one column
per row of `signature`.
*/
pub fn conditional_probabilities(
    exposure: &Array2<f64>,
    signature: &Array2<f64>,
) -> Result<Array3<f64>> {
    let (n, k) = exposure.dim();
    let p = signature.ncols();
    if signature.nrows() != k {
        return Err(SamplerError::ShapeMismatch {
            what: "signature",
            expected: k * p,
            got: signature.len(),
        });
    }
    let mut conditional = Array3::<f64>::zeros((n, p, k));

    conditional
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(exposure.axis_iter(Axis(0)))
        .for_each(|(mut cells, weights)| {
            for (mut cell, column) in cells
                .axis_iter_mut(Axis(0))
                .zip(signature.axis_iter(Axis(1)))
            {
                Zip::from(&mut cell)
                    .and(&column)
                    .and(&weights)
                    .for_each(|c, &s, &e| *c = s * e);
                let mass = cell.sum();
                if mass > 0.0 && mass.is_finite() {
                    cell /= mass;
                } else {
                    cell.fill(f64::NAN);
                }
            }
        });

    Ok(conditional)
}

/**
Draws `Z[i, j, ..] ~ Multinomial(counts[i, j], conditional[i, j, ..])` for
every cell, in row-major `(i, j)` order on the single random stream.

Cells without mutations allocate nothing. A cell with mutations but without
a valid probability vector aborts with
[`SamplerError::DegenerateProbability`].
*/
pub fn sample_latent_assignment(
    conditional: &Array3<f64>,
    counts: &Array2<u64>,
    source: &mut RandomSource,
) -> Result<Array3<u64>> {
    let (n, p, k) = conditional.dim();
    if counts.dim() != (n, p) {
        return Err(SamplerError::ShapeMismatch {
            what: "count matrix",
            expected: n * p,
            got: counts.len(),
        });
    }

    let mut z = Array3::<u64>::zeros((n, p, k));
    for ((i, j), &c) in counts.indexed_iter() {
        if c == 0 {
            continue;
        }
        let probs = conditional.slice(s![i, j, ..]);
        if probs.iter().any(|x| !x.is_finite()) {
            return Err(SamplerError::DegenerateProbability {
                specimen: i,
                class: j,
            });
        }
        let draw = source.multinomial(c, probs)?;
        z.slice_mut(s![i, j, ..]).assign(&draw);
    }
    Ok(z)
}

/**
One Gibbs sweep over exposures and signatures.

1. Compute the conditional signature probabilities of every
   (specimen, class) cell.
2. Allocate each cell's count among the signatures (`Z`).
3. Draw `exposure[i, ..] ~ Dirichlet(alpha_exposure[i, ..] + sum_j Z[i, j, ..])`.
4. Draw `signature[s, ..] ~ Dirichlet(alpha_signature[s, ..] + sum_i Z[i, .., s])`.

Returns the new `(exposure, signature)`; both are fresh draws.
*/
pub fn update_params(
    exposure: &Array2<f64>,
    signature: &Array2<f64>,
    alpha_exposure: &Array2<f64>,
    alpha_signature: &Array2<f64>,
    counts: &CountMatrix,
    source: &mut RandomSource,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let (n, p) = counts.counts().dim();
    let k = exposure.ncols();
    check_dim("exposure", exposure, (n, k))?;
    check_dim("signature", signature, (k, p))?;
    check_dim("alpha_exposure", alpha_exposure, (n, k))?;
    check_dim("alpha_signature", alpha_signature, (k, p))?;

    let conditional = conditional_probabilities(exposure, signature)?;
    let z = sample_latent_assignment(&conditional, counts.counts(), source)?;

    // (n, k): mutations of each specimen attributed to each signature
    let per_specimen = z.sum_axis(Axis(1)).mapv(|c| c as f64);
    // (p, k) -> (k, p): mutations of each class attributed to each signature
    let per_signature = z.sum_axis(Axis(0)).reversed_axes().mapv(|c| c as f64);
    trace!(
        "Latent allocation: {} mutations over {} signatures.",
        per_specimen.sum(),
        k
    );

    let new_exposure = source.dirichlet_rows((alpha_exposure + &per_specimen).view())?;
    let new_signature = source.dirichlet_rows((alpha_signature + &per_signature).view())?;
    Ok((new_exposure, new_signature))
}

/**
Conjugate update of the rate of an exponential prior on a concentration
block, under a Gamma(1, 1) hyperprior:

`lambda ~ Gamma(count(alpha) + 1, sum(alpha) + 1)` (shape, rate).
*/
pub fn update_exponential_rate<D: Dimension>(
    alpha: &Array<f64, D>,
    source: &mut RandomSource,
) -> Result<f64> {
    source.gamma(alpha.len() as f64 + 1.0, alpha.sum() + 1.0)
}

fn check_dim(what: &'static str, array: &Array2<f64>, expected: (usize, usize)) -> Result<()> {
    if array.dim() != expected {
        return Err(SamplerError::ShapeMismatch {
            what,
            expected: expected.0 * expected.1,
            got: array.len(),
        });
    }
    Ok(())
}
