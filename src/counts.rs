//! The labeled specimen × mutation-type count matrix the sampler conditions on.

use log::debug;
use ndarray::{Array1, Array2, Axis};
use num_traits::Float;

use crate::error::{Result, SamplerError};

/// Non-negative integer counts with specimen (row) and mutation-type (column) labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMatrix {
    specimens: Vec<String>,
    mutation_types: Vec<String>,
    counts: Array2<u64>,
}

impl CountMatrix {
    /**
    Builds a count matrix, checking that the labels match the array shape and
    that the matrix is not empty.

    # Examples

    ```rust
    use signature_mcmc::counts::CountMatrix;
    use ndarray::arr2;

    let counts = CountMatrix::new(
        vec!["tumor_a".into(), "tumor_b".into()],
        vec!["C>A".into(), "C>G".into(), "T>A".into()],
        arr2(&[[10, 0, 3], [1, 2, 0]]),
    )
    .unwrap();
    assert_eq!(counts.totals().to_vec(), vec![13, 3]);
    ```
    */
    pub fn new(
        specimens: Vec<String>,
        mutation_types: Vec<String>,
        counts: Array2<u64>,
    ) -> Result<Self> {
        let (n, p) = counts.dim();
        if specimens.len() != n {
            return Err(SamplerError::ShapeMismatch {
                what: "specimen labels",
                expected: n,
                got: specimens.len(),
            });
        }
        if mutation_types.len() != p {
            return Err(SamplerError::ShapeMismatch {
                what: "mutation type labels",
                expected: p,
                got: mutation_types.len(),
            });
        }
        if n == 0 || p == 0 {
            return Err(SamplerError::invalid_parameter(
                "counts",
                format!("count matrix must be non-empty, got {n}x{p}"),
            ));
        }
        Ok(Self {
            specimens,
            mutation_types,
            counts,
        })
    }

    /// Builds a count matrix with positional labels `"0"`, `"1"`, ... on both axes.
    pub fn from_array(counts: Array2<u64>) -> Result<Self> {
        let (n, p) = counts.dim();
        let specimens = (0..n).map(|i| i.to_string()).collect();
        let mutation_types = (0..p).map(|j| j.to_string()).collect();
        Self::new(specimens, mutation_types, counts)
    }

    /// Builds a count matrix from floating-point input, rejecting negative,
    /// fractional and non-finite entries.
    pub fn from_float<T: Float>(
        specimens: Vec<String>,
        mutation_types: Vec<String>,
        counts: &Array2<T>,
    ) -> Result<Self> {
        let mut out = Array2::<u64>::zeros(counts.raw_dim());
        for ((i, j), &x) in counts.indexed_iter() {
            let value = x
                .to_u64()
                .filter(|_| x.is_finite() && x >= T::zero() && x.fract() == T::zero())
                .ok_or_else(|| SamplerError::InvalidCount {
                    specimen: i,
                    class: j,
                    value: x.to_f64().unwrap_or(f64::NAN),
                })?;
            out[[i, j]] = value;
        }
        Self::new(specimens, mutation_types, out)
    }

    pub fn n_specimens(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_mutation_types(&self) -> usize {
        self.counts.ncols()
    }

    pub fn specimens(&self) -> &[String] {
        &self.specimens
    }

    pub fn mutation_types(&self) -> &[String] {
        &self.mutation_types
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Total mutation count per specimen.
    pub fn totals(&self) -> Array1<u64> {
        self.counts.sum_axis(Axis(1))
    }

    /**
    Removes specimens and mutation types without a single mutation, keeping
    the order of the remaining labels. All-zero rows or columns are the usual
    cause of degenerate conditional probabilities.
    */
    pub fn drop_empty(&self) -> Result<Self> {
        let keep_rows: Vec<usize> = self
            .counts
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&c| c > 0))
            .map(|(i, _)| i)
            .collect();
        let keep_cols: Vec<usize> = self
            .counts
            .axis_iter(Axis(1))
            .enumerate()
            .filter(|(_, col)| col.iter().any(|&c| c > 0))
            .map(|(j, _)| j)
            .collect();

        let dropped_rows = self.n_specimens() - keep_rows.len();
        let dropped_cols = self.n_mutation_types() - keep_cols.len();
        if dropped_rows > 0 || dropped_cols > 0 {
            debug!(
                "Dropping {} empty specimen(s) and {} empty mutation type(s).",
                dropped_rows, dropped_cols
            );
        }

        let counts = self
            .counts
            .select(Axis(0), &keep_rows)
            .select(Axis(1), &keep_cols);
        let specimens = keep_rows.iter().map(|&i| self.specimens[i].clone()).collect();
        let mutation_types = keep_cols
            .iter()
            .map(|&j| self.mutation_types[j].clone())
            .collect();
        Self::new(specimens, mutation_types, counts)
    }
}
