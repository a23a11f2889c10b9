//! Parameter-sweep aggregation of UppASD output directories.
//!
//! A sweep is a root directory with one subdirectory per simulation run, each
//! named after a template such as `bccFe_temp_T{T}`. This crate matches those
//! names, reads one output kind from every run and reduces it to a single row
//! of column means:
//!
//! - **Templates**: `{field}` placeholders become typed parameters
//! - **Aggregation**: sequential or rayon-parallel, strict or lenient
//! - **Results**: sorted tables with CSV output
//! - **Configuration**: a TOML file with `[collect]`, `[rows]` and `[output]`
//!
//! # Usage
//!
//! ```no_run
//! use uppout_collect::{collect_averages, CollectOptions};
//!
//! let options = CollectOptions { start: Some(100), ..CollectOptions::default() };
//! let result = collect_averages("runs/bccFe_thermal", "bccFe_temp_T{T}", &options)?;
//! result.write_csv(&mut std::io::stdout())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod result;
pub mod template;

pub use aggregate::{
    collect, collect_averages, collect_cumulants, collect_energies, collect_projavgs,
    collect_projcumulants, collect_projected, CollectOptions, SimIdStrategy,
};
pub use config::{CollectConfig, ConfigError};
pub use result::{AggregatedRow, AggregationResult};
pub use template::{ParamValue, RunNameTemplate};
