//! # signature-mcmc
//!
//! A Gibbs/Metropolis–Hastings sampler for mutational-signature
//! deconvolution.
//!
//! Given a specimen × mutation-type count matrix, the sampler draws from the
//! posterior of a hierarchical Dirichlet–multinomial model:
//!
//! - **exposure** (specimen × signature): how much each signature contributes
//!   to each specimen, every row a probability vector;
//! - **signature** (signature × mutation type): the mutation spectrum of each
//!   signature, every row a probability vector;
//! - **alpha_exposure**, **alpha_signature**: the Dirichlet concentrations of
//!   those rows, updated by Metropolis–Hastings;
//! - **lambda_exposure**, **lambda_signature**: the rates of the exponential
//!   priors on the concentrations, updated by conjugate Gibbs draws.
//!
//! ## Example Usage
//!
//! ```rust
//! use ndarray::arr2;
//! use signature_mcmc::counts::CountMatrix;
//! use signature_mcmc::sampler::{sample, SamplerConfig};
//!
//! let counts = CountMatrix::new(
//!     vec!["PD1".into(), "PD2".into()],
//!     vec!["C>A".into(), "C>G".into(), "C>T".into()],
//!     arr2(&[[30, 2, 51], [4, 19, 8]]),
//! )
//! .unwrap();
//!
//! let config = SamplerConfig::default()
//!     .set_n_steps(50)
//!     .set_n_signatures(2)
//!     .set_seed(42);
//! let output = sample(&counts, &config).unwrap();
//!
//! let last = output.posterior.draw("exposure", 49).unwrap();
//! assert_eq!(last.shape(), &[2, 2]);
//! println!("{}", output.stats);
//! ```
//!
//! ## Modules
//!
//! - [`counts`]: the labeled input matrix.
//! - [`random`]: the seeded random stream threaded through every update.
//! - [`gibbs`], [`metropolis_hastings`]: the update rules.
//! - [`core`]: the chain and its drivers.
//! - [`sampler`]: configuration and entry points.
//! - [`trace`]: sampler states and the labeled posterior container.
//! - [`io`]: CSV input and output (feature `csv`).

pub mod core;
pub mod counts;
pub mod distributions;
pub mod error;
pub mod gibbs;
pub mod io;
pub mod metropolis_hastings;
pub mod random;
pub mod sampler;
pub mod stats;
pub mod trace;

pub use error::{Result, SamplerError};
