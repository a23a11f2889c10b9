//! Readers, schemas and run-directory indexing for UppASD output files.
//!
//! - [`schema`]: file-name prefixes and canonical column lists
//! - [`reader`]: whitespace-delimited parsers producing [`table::Table`]s
//! - [`run_dir`]: simulation-identifier resolution and per-kind file lookup
//! - [`summary`]: derived counts and final per-ensemble configurations
//! - [`structure`]: neighbor lookups on the exchange neighbor list

pub mod error;
pub mod reader;
pub mod run_dir;
pub mod schema;
pub mod structure;
pub mod summary;
pub mod table;

pub use error::{ReadError, Result, UppoutError};
pub use run_dir::RunDirectory;
pub use schema::OutputKind;
pub use summary::{atom_type, final_configurations, DerivedCounts};
pub use table::{ProjectedTables, Table};

#[cfg(test)]
mod _tests_reader;
#[cfg(test)]
mod _tests_run_dir;
#[cfg(test)]
mod _tests_structure;
