/*!
# Sampler State, Trace and Posterior Container

- [`State`]: one snapshot of every sampled quantity.
- [`Trace`]: the raw sequence of states produced by the driver (initial state
  followed by one state per transition).
- [`PosteriorSamples`]: the labeled container handed back to callers. Every
  variable carries named dimensions (`chain`, `draw`, `specimen`, `sig`,
  `substitution`) and the coordinates of each dimension.

The container holds the post-transition states only; the initial state is not
a draw. With a single chain the chain axis has length one and coordinate
value [`CHAIN_ID`].
*/

use approx::abs_diff_eq;
use ndarray::{stack, Array1, Array2, ArrayD, ArrayView2, ArrayViewD, Axis};

use crate::counts::CountMatrix;
use crate::error::{Result, SamplerError};

/// Coordinate value of the single chain.
pub const CHAIN_ID: usize = 1;

/// Initial Dirichlet concentration of every exposure and signature entry.
pub const INITIAL_CONCENTRATION: f64 = 0.5;

/// Initial rate of both exponential priors.
pub const INITIAL_RATE: f64 = 1.0;

/// Tolerance for the probability-simplex check.
pub const SIMPLEX_TOLERANCE: f64 = 1e-6;

/// One snapshot of the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// Specimen × signature mixing weights.
    pub exposure: Array2<f64>,
    /// Signature × mutation-type distributions.
    pub signature: Array2<f64>,
    pub alpha_exposure: Array2<f64>,
    pub alpha_signature: Array2<f64>,
    pub lambda_exposure: f64,
    pub lambda_signature: f64,
}

impl State {
    /**
    The starting point of every run: uniform exposures and signatures,
    concentrations of [`INITIAL_CONCENTRATION`] and rates of [`INITIAL_RATE`].
    */
    pub fn initial(n_specimens: usize, n_signatures: usize, n_mutation_types: usize) -> Self {
        let (n, k, p) = (n_specimens, n_signatures, n_mutation_types);
        Self {
            exposure: Array2::from_elem((n, k), 1.0 / k as f64),
            signature: Array2::from_elem((k, p), 1.0 / p as f64),
            alpha_exposure: Array2::from_elem((n, k), INITIAL_CONCENTRATION),
            alpha_signature: Array2::from_elem((k, p), INITIAL_CONCENTRATION),
            lambda_exposure: INITIAL_RATE,
            lambda_signature: INITIAL_RATE,
        }
    }

    pub fn n_signatures(&self) -> usize {
        self.exposure.ncols()
    }

    /// Checks the model invariants: simplex rows for exposures and
    /// signatures, strictly positive finite concentrations and rates.
    pub fn is_valid(&self) -> bool {
        let simplex = |m: &Array2<f64>| {
            m.rows().into_iter().all(|row| {
                row.iter().all(|&x| x >= 0.0)
                    && abs_diff_eq!(row.sum(), 1.0, epsilon = SIMPLEX_TOLERANCE)
            })
        };
        let positive = |x: f64| x > 0.0 && x.is_finite();
        simplex(&self.exposure)
            && simplex(&self.signature)
            && self.alpha_exposure.iter().all(|&a| positive(a))
            && self.alpha_signature.iter().all(|&a| positive(a))
            && positive(self.lambda_exposure)
            && positive(self.lambda_signature)
    }
}

/// Ordered states of one run, starting with the initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    states: Vec<State>,
}

impl Trace {
    pub fn new(initial: State) -> Self {
        Self {
            states: vec![initial],
        }
    }

    pub fn with_capacity(initial: State, n_steps: usize) -> Self {
        let mut states = Vec::with_capacity(n_steps + 1);
        states.push(initial);
        Self { states }
    }

    pub fn push(&mut self, state: State) {
        self.states.push(state);
    }

    /// Number of stored states, including the initial one.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn initial(&self) -> &State {
        &self.states[0]
    }

    /// The states produced by transitions, i.e. everything after the initial state.
    pub fn draws(&self) -> &[State] {
        &self.states[1..]
    }
}

/// Named dimension of a posterior variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    Chain,
    Draw,
    Specimen,
    Sig,
    Substitution,
}

impl Dim {
    pub fn name(&self) -> &'static str {
        match self {
            Dim::Chain => "chain",
            Dim::Draw => "draw",
            Dim::Specimen => "specimen",
            Dim::Sig => "sig",
            Dim::Substitution => "substitution",
        }
    }
}

/// Coordinates of every dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coords {
    pub chain: Vec<usize>,
    pub draw: Vec<usize>,
    pub specimen: Vec<String>,
    pub sig: Vec<String>,
    pub substitution: Vec<String>,
}

impl Coords {
    /// Label of position `i` along `dim`.
    pub fn label(&self, dim: Dim, i: usize) -> Option<String> {
        match dim {
            Dim::Chain => self.chain.get(i).map(|c| c.to_string()),
            Dim::Draw => self.draw.get(i).map(|d| d.to_string()),
            Dim::Specimen => self.specimen.get(i).cloned(),
            Dim::Sig => self.sig.get(i).cloned(),
            Dim::Substitution => self.substitution.get(i).cloned(),
        }
    }
}

/// One posterior variable: values laid out along `dims`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: &'static str,
    pub dims: Vec<Dim>,
    pub values: ArrayD<f64>,
}

/// Labels `"S1"`, ..., `"Sk"` of the signature axis.
pub fn signature_labels(n_signatures: usize) -> Vec<String> {
    (1..=n_signatures).map(|i| format!("S{i}")).collect()
}

/// Labeled posterior draws of a single chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorSamples {
    coords: Coords,
    variables: Vec<DataVariable>,
}

impl PosteriorSamples {
    /**
    Packages the draws of `trace` with the labels of `counts`.

    Variables, in order: `exposure` and `alpha_exposure` over
    `[chain, draw, specimen, sig]`, `signature` and `alpha_signature` over
    `[chain, draw, sig, substitution]`, `lambda_exposure` and
    `lambda_signature` over `[chain, draw]`.
    */
    pub fn from_trace(trace: &Trace, counts: &CountMatrix) -> Result<Self> {
        let draws = trace.draws();
        if draws.is_empty() {
            return Err(SamplerError::invalid_parameter(
                "trace",
                "trace holds no draws beyond the initial state",
            ));
        }
        let k = trace.initial().n_signatures();
        let n = counts.n_specimens();
        let p = counts.n_mutation_types();
        for state in trace.states() {
            if state.exposure.dim() != (n, k) || state.alpha_exposure.dim() != (n, k) {
                return Err(SamplerError::ShapeMismatch {
                    what: "exposure draws",
                    expected: n * k,
                    got: state.exposure.len(),
                });
            }
            if state.signature.dim() != (k, p) || state.alpha_signature.dim() != (k, p) {
                return Err(SamplerError::ShapeMismatch {
                    what: "signature draws",
                    expected: k * p,
                    got: state.signature.len(),
                });
            }
        }

        let coords = Coords {
            chain: vec![CHAIN_ID],
            draw: (0..draws.len()).collect(),
            specimen: counts.specimens().to_vec(),
            sig: signature_labels(k),
            substitution: counts.mutation_types().to_vec(),
        };

        let by_specimen = vec![Dim::Chain, Dim::Draw, Dim::Specimen, Dim::Sig];
        let by_signature = vec![Dim::Chain, Dim::Draw, Dim::Sig, Dim::Substitution];
        let scalar = vec![Dim::Chain, Dim::Draw];

        let variables = vec![
            DataVariable {
                name: "exposure",
                dims: by_specimen.clone(),
                values: stack_matrices(draws, |s| s.exposure.view())?,
            },
            DataVariable {
                name: "signature",
                dims: by_signature.clone(),
                values: stack_matrices(draws, |s| s.signature.view())?,
            },
            DataVariable {
                name: "alpha_exposure",
                dims: by_specimen,
                values: stack_matrices(draws, |s| s.alpha_exposure.view())?,
            },
            DataVariable {
                name: "alpha_signature",
                dims: by_signature,
                values: stack_matrices(draws, |s| s.alpha_signature.view())?,
            },
            DataVariable {
                name: "lambda_exposure",
                dims: scalar.clone(),
                values: stack_scalars(draws, |s| s.lambda_exposure),
            },
            DataVariable {
                name: "lambda_signature",
                dims: scalar,
                values: stack_scalars(draws, |s| s.lambda_signature),
            },
        ];

        Ok(Self { coords, variables })
    }

    pub fn coords(&self) -> &Coords {
        &self.coords
    }

    pub fn variables(&self) -> &[DataVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn dims(&self, name: &str) -> Option<&[Dim]> {
        self.variable(name).map(|v| v.dims.as_slice())
    }

    pub fn n_draws(&self) -> usize {
        self.coords.draw.len()
    }

    /// Values of variable `name` at draw `draw` of the single chain.
    pub fn draw(&self, name: &str, draw: usize) -> Option<ArrayViewD<'_, f64>> {
        if draw >= self.n_draws() {
            return None;
        }
        self.variable(name).map(|v| {
            v.values
                .index_axis(Axis(0), 0)
                .index_axis_move(Axis(0), draw)
        })
    }
}

/// Stacks one matrix per draw into `[chain = 1, draw, rows, cols]`.
fn stack_matrices<F>(draws: &[State], select: F) -> Result<ArrayD<f64>>
where
    F: Fn(&State) -> ArrayView2<'_, f64>,
{
    let views: Vec<ArrayView2<f64>> = draws.iter().map(select).collect();
    let stacked = stack(Axis(0), &views)
        .map_err(|e| SamplerError::invalid_parameter("trace", e.to_string()))?;
    Ok(stacked.insert_axis(Axis(0)).into_dyn())
}

/// Collects one scalar per draw into `[chain = 1, draw]`.
fn stack_scalars<F>(draws: &[State], select: F) -> ArrayD<f64>
where
    F: Fn(&State) -> f64,
{
    draws
        .iter()
        .map(select)
        .collect::<Array1<f64>>()
        .insert_axis(Axis(0))
        .into_dyn()
}
