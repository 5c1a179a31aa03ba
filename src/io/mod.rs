//! Reading count tables and writing posterior draws.

#[cfg(feature = "csv")]
pub mod csv;
