//! File-name prefixes and column schemas of the UppASD output files.
//!
//! Every reader and the aggregation layer take their column names from here,
//! so a schema change only ever happens in one place.
//!
//! | kind            | file                        | header | layout notes                          |
//! |-----------------|-----------------------------|--------|---------------------------------------|
//! | `averages`      | `averages.<simid>.out`      | yes    |                                       |
//! | `cumulants`     | `cumulants.<simid>.out`     | yes    |                                       |
//! | `energy`        | `stdenergy.<simid>.out`     | yes    |                                       |
//! | `coord`         | `coord.<simid>.out`         | no     |                                       |
//! | `restart`       | `restart.<simid>.out`       | no     | 7 preamble lines, leading label column|
//! | `struct`        | `struct.<simid>.out`        | no     | `#` comments                          |
//! | `projavgs`      | `projavgs.<simid>.out`      | no     | `#` comments, grouped by `proj`       |
//! | `projcumulants` | `projcumulants.<simid>.out` | no     | `#` comments, grouped by `proj`       |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Prefixes
// ============================================================================

pub const AVERAGES_PREFIX: &str = "averages";
pub const CUMULANTS_PREFIX: &str = "cumulants";
pub const COORD_PREFIX: &str = "coord";
pub const RESTART_PREFIX: &str = "restart";
pub const STRUCT_PREFIX: &str = "struct";
pub const ENERGY_PREFIX: &str = "stdenergy";
pub const PROJAVGS_PREFIX: &str = "projavgs";
pub const PROJCUMULANTS_PREFIX: &str = "projcumulants";

/// Extension shared by every identifier-tagged output file.
pub const OUTPUT_EXTENSION: &str = "out";

/// Length of a simulation identifier.
pub const SIMID_LEN: usize = 8;

// ============================================================================
// Column Lists
// ============================================================================

pub const ITER_COLUMN: &str = "iter";
pub const PROJ_COLUMN: &str = "proj";

pub const AVERAGES_COLUMNS: &[&str] = &["iter", "Mx", "My", "Mz", "M", "M_stdv"];

pub const CUMULANTS_COLUMNS: &[&str] = &[
    "iter", "M", "M2", "M4", "Binder", "chi", "Cv", "E", "E_exch", "E_lsf",
];

pub const COORD_COLUMNS: &[&str] = &["at_num", "x", "y", "z", "at_type", "at_num_cell"];

pub const RESTART_COLUMNS: &[&str] = &["ens_num", "at_num", "mom", "mx", "my", "mz"];

pub const STRUCT_COLUMNS: &[&str] = &[
    "at1_num", "at2_num", "at1_type", "at2_type", "rx", "ry", "rz", "Jexch", "dist",
];

pub const ENERGY_COLUMNS: &[&str] = &[
    "iter", "tot", "exch", "aniso", "DM", "PD", "BiqDM", "BQ", "dip", "Zeeman", "LSF", "chir",
    "ring", "sa",
];

pub const PROJAVGS_COLUMNS: &[&str] = &["iter", "proj", "M", "M_stdv", "Mx", "My", "Mz"];

pub const PROJCUMULANTS_COLUMNS: &[&str] =
    &["iter", "proj", "M", "M2", "M4", "Binder", "chi"];

/// Suffix of raw standard-deviation columns, renamed to `_std` on aggregation.
const RAW_STD_SUFFIX: &str = "_stdv";
const PUBLIC_STD_SUFFIX: &str = "_std";

// ============================================================================
// Output Kinds
// ============================================================================

/// The output-file kinds this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Averages,
    Cumulants,
    Coord,
    Restart,
    Struct,
    #[serde(alias = "stdenergy")]
    Energy,
    ProjAvgs,
    ProjCumulants,
}

/// On-disk layout of one output kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLayout {
    /// First non-blank line is a header to discard.
    pub header: bool,
    /// Raw lines skipped before anything else is looked at.
    pub preamble_lines: usize,
    /// Lines starting with `#` are skipped.
    pub comments: bool,
    /// Leading label columns dropped from every data row.
    pub leading_labels: usize,
}

impl OutputKind {
    pub const ALL: [OutputKind; 8] = [
        OutputKind::Averages,
        OutputKind::Cumulants,
        OutputKind::Coord,
        OutputKind::Restart,
        OutputKind::Struct,
        OutputKind::Energy,
        OutputKind::ProjAvgs,
        OutputKind::ProjCumulants,
    ];

    /// File-name prefix of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            OutputKind::Averages => AVERAGES_PREFIX,
            OutputKind::Cumulants => CUMULANTS_PREFIX,
            OutputKind::Coord => COORD_PREFIX,
            OutputKind::Restart => RESTART_PREFIX,
            OutputKind::Struct => STRUCT_PREFIX,
            OutputKind::Energy => ENERGY_PREFIX,
            OutputKind::ProjAvgs => PROJAVGS_PREFIX,
            OutputKind::ProjCumulants => PROJCUMULANTS_PREFIX,
        }
    }

    /// Canonical column list, in file order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            OutputKind::Averages => AVERAGES_COLUMNS,
            OutputKind::Cumulants => CUMULANTS_COLUMNS,
            OutputKind::Coord => COORD_COLUMNS,
            OutputKind::Restart => RESTART_COLUMNS,
            OutputKind::Struct => STRUCT_COLUMNS,
            OutputKind::Energy => ENERGY_COLUMNS,
            OutputKind::ProjAvgs => PROJAVGS_COLUMNS,
            OutputKind::ProjCumulants => PROJCUMULANTS_COLUMNS,
        }
    }

    pub fn layout(self) -> FileLayout {
        match self {
            OutputKind::Averages | OutputKind::Cumulants | OutputKind::Energy => FileLayout {
                header: true,
                preamble_lines: 0,
                comments: false,
                leading_labels: 0,
            },
            OutputKind::Coord => FileLayout {
                header: false,
                preamble_lines: 0,
                comments: false,
                leading_labels: 0,
            },
            OutputKind::Restart => FileLayout {
                header: false,
                preamble_lines: 7,
                comments: true,
                leading_labels: 1,
            },
            OutputKind::Struct | OutputKind::ProjAvgs | OutputKind::ProjCumulants => {
                FileLayout {
                    header: false,
                    preamble_lines: 0,
                    comments: true,
                    leading_labels: 0,
                }
            }
        }
    }

    /// Whether files of this kind are partitioned by the `proj` column.
    pub fn is_projected(self) -> bool {
        matches!(self, OutputKind::ProjAvgs | OutputKind::ProjCumulants)
    }

    /// Whether the kind is a per-step time series that can be averaged over runs.
    pub fn is_time_series(self) -> bool {
        matches!(
            self,
            OutputKind::Averages
                | OutputKind::Cumulants
                | OutputKind::Energy
                | OutputKind::ProjAvgs
                | OutputKind::ProjCumulants
        )
    }

    /// Columns averaged by the aggregator: everything except the step
    /// counter and the projection key.
    pub fn summary_columns(self) -> Vec<&'static str> {
        self.columns()
            .iter()
            .copied()
            .filter(|name| *name != ITER_COLUMN && *name != PROJ_COLUMN)
            .collect()
    }

    /// Lowercase name used in configuration files and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            OutputKind::Averages => "averages",
            OutputKind::Cumulants => "cumulants",
            OutputKind::Coord => "coord",
            OutputKind::Restart => "restart",
            OutputKind::Struct => "struct",
            OutputKind::Energy => "energy",
            OutputKind::ProjAvgs => "projavgs",
            OutputKind::ProjCumulants => "projcumulants",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase();
        OutputKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized || kind.prefix() == normalized)
            .ok_or_else(|| format!("unknown output kind `{s}`"))
    }
}

/// Column name used in aggregated output for a raw schema column.
///
/// `M_stdv` becomes `M_std`; every other name passes through unchanged.
pub fn public_column_name(raw: &str) -> String {
    match raw.strip_suffix(RAW_STD_SUFFIX) {
        Some(quantity) => format!("{quantity}{PUBLIC_STD_SUFFIX}"),
        None => raw.to_string(),
    }
}
