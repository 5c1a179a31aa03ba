//! Error type shared by every sampler component.
//!
//! Every failure is fatal to the current run: the driver never retries and
//! never returns a partial trace.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SamplerError>;

#[derive(Debug, Error)]
pub enum SamplerError {
    /// A configuration value is out of range (zero signatures, zero steps, ...).
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Array or label lengths disagree.
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// An input count is negative, fractional or not finite.
    #[error("invalid count {value} at specimen {specimen}, mutation type {class}")]
    InvalidCount {
        specimen: usize,
        class: usize,
        value: f64,
    },

    /// The conditional probability over signatures could not be normalized
    /// for a cell that carries mutations.
    #[error(
        "degenerate probability mass at specimen {specimen}, mutation type {class}; \
         drop all-zero rows/columns before sampling"
    )]
    DegenerateProbability { specimen: usize, class: usize },

    /// A primitive distribution rejected its parameters.
    #[error("cannot build {distribution} distribution: {reason}")]
    InvalidDistribution {
        distribution: &'static str,
        reason: String,
    },

    #[error("progress bar template error: {0}")]
    Progress(#[from] indicatif::style::TemplateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl SamplerError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        SamplerError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn distribution(distribution: &'static str, reason: impl ToString) -> Self {
        SamplerError::InvalidDistribution {
            distribution,
            reason: reason.to_string(),
        }
    }
}
