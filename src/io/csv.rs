/*!
# CSV Input and Output

Enable via the `csv` feature.

- [`load_counts`] reads a specimen × mutation-type count table.
- [`save_posterior`] writes posterior draws in long format, one value per row.
*/

use std::path::Path;

use csv::{Reader, Writer};
use log::debug;
use ndarray::Array2;

use crate::counts::CountMatrix;
use crate::error::{Result, SamplerError};
use crate::trace::{Dim, PosteriorSamples};

/// Header of the file written by [`save_posterior`].
pub const POSTERIOR_HEADER: [&str; 7] = [
    "variable",
    "chain",
    "draw",
    "specimen",
    "sig",
    "substitution",
    "value",
];

/**
Reads a count table.

The first header cell names the index column and is ignored; the remaining
header cells are the mutation types. Every following row starts with the
specimen id, followed by one count per mutation type. Counts may be written
as integers or as integral floats (`12.0`).

# Example

```rust
use signature_mcmc::io::csv::load_counts;
use std::io::Write;

let mut file = tempfile::NamedTempFile::new()?;
writeln!(file, "specimen,C>A,C>G")?;
writeln!(file, "PD1,3,0")?;
writeln!(file, "PD2,1,7")?;
let counts = load_counts(file.path())?;
assert_eq!(counts.specimens(), ["PD1", "PD2"]);
assert_eq!(counts.counts()[[1, 1]], 7);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn load_counts<P: AsRef<Path>>(path: P) -> Result<CountMatrix> {
    let mut rdr = Reader::from_path(path.as_ref())?;
    let mutation_types: Vec<String> = rdr.headers()?.iter().skip(1).map(String::from).collect();

    let mut specimens = Vec::new();
    let mut values = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let mut fields = record.iter();
        specimens.push(fields.next().unwrap_or_default().to_string());
        for (j, field) in fields.enumerate() {
            let value = field
                .trim()
                .parse::<f64>()
                .map_err(|_| SamplerError::InvalidCount {
                    specimen: i,
                    class: j,
                    value: f64::NAN,
                })?;
            values.push(value);
        }
    }

    let counts = count_table((specimens.len(), mutation_types.len()), values)?;
    debug!(
        "Loaded {} specimens x {} mutation types from {}.",
        counts.nrows(),
        counts.ncols(),
        path.as_ref().display()
    );
    CountMatrix::from_float(specimens, mutation_types, &counts)
}

fn count_table(shape: (usize, usize), values: Vec<f64>) -> Result<Array2<f64>> {
    let n_values = values.len();
    Array2::from_shape_vec(shape, values).map_err(|_| SamplerError::ShapeMismatch {
        what: "count table",
        expected: shape.0 * shape.1,
        got: n_values,
    })
}

/**
Writes every variable of `posterior` in long format.

Columns are [`POSTERIOR_HEADER`]. Cells of dimensions a variable does not
have are left empty, e.g. the `lambda_*` rows only fill `chain` and `draw`.
*/
pub fn save_posterior<P: AsRef<Path>>(posterior: &PosteriorSamples, path: P) -> Result<()> {
    let mut wtr = Writer::from_path(path.as_ref())?;
    wtr.write_record(POSTERIOR_HEADER)?;

    let coords = posterior.coords();
    let columns = [Dim::Chain, Dim::Draw, Dim::Specimen, Dim::Sig, Dim::Substitution];
    let mut rows = 0_usize;
    for variable in posterior.variables() {
        for (index, value) in variable.values.indexed_iter() {
            let mut row = vec![variable.name.to_string()];
            for column in columns {
                let cell = variable
                    .dims
                    .iter()
                    .position(|&d| d == column)
                    .and_then(|axis| coords.label(column, index[axis]))
                    .unwrap_or_default();
                row.push(cell);
            }
            row.push(value.to_string());
            wtr.write_record(&row)?;
            rows += 1;
        }
    }

    wtr.flush()?;
    debug!("Wrote {} posterior rows to {}.", rows, path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{State, Trace};
    use std::fs;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_table(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_counts() {
        let file = write_table("id,C>A,C>G,C>T\nPD1,10,0,3\nPD2,1.0,2,0\n");
        let counts = load_counts(file.path()).unwrap();
        assert_eq!(counts.specimens(), ["PD1", "PD2"]);
        assert_eq!(counts.mutation_types(), ["C>A", "C>G", "C>T"]);
        assert_eq!(counts.totals().to_vec(), vec![13, 3]);
    }

    #[test]
    fn test_load_counts_rejects_bad_cells() {
        let file = write_table("id,a,b\nPD1,1,x\n");
        assert!(matches!(
            load_counts(file.path()),
            Err(SamplerError::InvalidCount {
                specimen: 0,
                class: 1,
                ..
            })
        ));

        let file = write_table("id,a,b\nPD1,1,2.5\n");
        assert!(matches!(
            load_counts(file.path()),
            Err(SamplerError::InvalidCount { .. })
        ));

        let file = write_table("id,a,b\nPD1,1\n");
        assert!(matches!(load_counts(file.path()), Err(SamplerError::Csv(_))));
    }

    #[test]
    fn test_count_table_reports_value_count() {
        assert!(matches!(
            count_table((2, 3), vec![1.0; 5]),
            Err(SamplerError::ShapeMismatch {
                what: "count table",
                expected: 6,
                got: 5,
            })
        ));
        assert_eq!(count_table((2, 3), vec![1.0; 6]).unwrap().dim(), (2, 3));
    }

    #[test]
    fn test_save_posterior_long_format() {
        let counts = CountMatrix::new(
            vec!["PD1".into()],
            vec!["C>A".into(), "C>G".into()],
            ndarray::arr2(&[[3, 4]]),
        )
        .unwrap();
        let initial = State::initial(1, 2, 2);
        let mut trace = Trace::new(initial.clone());
        trace.push(initial.clone());
        trace.push(initial);
        let posterior = PosteriorSamples::from_trace(&trace, &counts).unwrap();

        let file = NamedTempFile::new().unwrap();
        save_posterior(&posterior, file.path()).unwrap();
        let contents = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines[0], "variable,chain,draw,specimen,sig,substitution,value");
        // 2 draws of: exposure 1x2, signature 2x2, alpha_exposure 1x2,
        // alpha_signature 2x2, and the two rates
        assert_eq!(lines.len(), 1 + 2 * (2 + 4 + 2 + 4 + 1 + 1));
        assert_eq!(lines[1], "exposure,1,0,PD1,S1,,0.5");
        assert!(lines.contains(&"signature,1,1,,S2,C>G,0.5"));
        assert!(lines.contains(&"lambda_signature,1,1,,,,1"));
    }
}
