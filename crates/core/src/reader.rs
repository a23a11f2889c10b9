//! Parsers for the whitespace-delimited UppASD output files.
//!
//! Each output kind is described by a [`FileLayout`] in the schema registry;
//! a single line-oriented parser interprets that layout:
//!
//! 1. skip `preamble_lines` raw lines,
//! 2. skip blank lines (and `#` lines when the layout has comments),
//! 3. discard the first remaining line when the layout has a header,
//! 4. drop `leading_labels` tokens of every data row and parse the rest as numbers.
//!
//! Rows must all have the same width and that width must match the schema.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, error};

use crate::error::{ReadError, Result, UppoutError};
use crate::schema::{OutputKind, PROJ_COLUMN};
use crate::table::{ProjectedTables, Table};

// ============================================================================
// Public Readers
// ============================================================================

/// Read a flat (non-projected) output file of the given kind.
pub fn read_table(path: &Path, kind: OutputKind) -> Result<Table> {
    parse_file(path, kind).map_err(|err| {
        error!("failed to read {} file {}: {}", kind, path.display(), err);
        err
    })
}

/// Read a projected output file and split it by projection index.
pub fn read_projected(path: &Path, kind: OutputKind) -> Result<ProjectedTables> {
    let flat = read_table(path, kind)?;
    let partitions = flat.partition_by(PROJ_COLUMN)?;
    debug!(
        "{}: {} rows in {} projections",
        path.display(),
        flat.num_rows(),
        partitions.len()
    );
    Ok(partitions)
}

pub fn read_averages(path: &Path) -> Result<Table> {
    read_table(path, OutputKind::Averages)
}

pub fn read_cumulants(path: &Path) -> Result<Table> {
    read_table(path, OutputKind::Cumulants)
}

pub fn read_coord(path: &Path) -> Result<Table> {
    read_table(path, OutputKind::Coord)
}

pub fn read_restart(path: &Path) -> Result<Table> {
    read_table(path, OutputKind::Restart)
}

pub fn read_struct(path: &Path) -> Result<Table> {
    read_table(path, OutputKind::Struct)
}

pub fn read_energy(path: &Path) -> Result<Table> {
    read_table(path, OutputKind::Energy)
}

pub fn read_projavgs(path: &Path) -> Result<ProjectedTables> {
    read_projected(path, OutputKind::ProjAvgs)
}

pub fn read_projcumulants(path: &Path) -> Result<ProjectedTables> {
    read_projected(path, OutputKind::ProjCumulants)
}

// ============================================================================
// Line Parser
// ============================================================================

fn parse_file(path: &Path, kind: OutputKind) -> Result<Table> {
    let file = File::open(path).map_err(|source| UppoutError::Parse {
        path: path.to_path_buf(),
        source: ReadError::Io(source),
    })?;
    let reader = BufReader::new(file);

    let layout = kind.layout();
    let expected = kind.columns().len();
    let mut table = Table::new(kind.columns());
    let mut header_pending = layout.header;
    let mut width: Option<usize> = None;
    // Projection indices must be whole numbers.
    let proj_col = if kind.is_projected() {
        kind.columns().iter().position(|c| *c == PROJ_COLUMN)
    } else {
        None
    };

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| UppoutError::Parse {
            path: path.to_path_buf(),
            source: ReadError::Io(source),
        })?;

        if idx < layout.preamble_lines {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || (layout.comments && trimmed.starts_with('#')) {
            continue;
        }
        if header_pending {
            header_pending = false;
            continue;
        }

        let tokens: Vec<&str> = trimmed
            .split_whitespace()
            .skip(layout.leading_labels)
            .collect();

        match width {
            None => {
                if tokens.len() != expected {
                    return Err(UppoutError::SchemaMismatch {
                        path: path.to_path_buf(),
                        kind,
                        expected,
                        found: tokens.len(),
                    });
                }
                width = Some(tokens.len());
            }
            Some(w) if w != tokens.len() => {
                return Err(UppoutError::Parse {
                    path: path.to_path_buf(),
                    source: ReadError::RaggedRow {
                        line: line_no,
                        expected: w,
                        found: tokens.len(),
                    },
                });
            }
            Some(_) => {}
        }

        let row = tokens
            .iter()
            .map(|token| {
                parse_number(token).ok_or_else(|| UppoutError::Parse {
                    path: path.to_path_buf(),
                    source: ReadError::InvalidNumber {
                        line: line_no,
                        token: (*token).to_string(),
                    },
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if let Some(col) = proj_col {
            let value = row[col];
            if !value.is_finite() || value.fract() != 0.0 {
                return Err(UppoutError::Parse {
                    path: path.to_path_buf(),
                    source: ReadError::InvalidNumber {
                        line: line_no,
                        token: tokens[col].to_string(),
                    },
                });
            }
        }
        table.push_row(&row);
    }

    Ok(table)
}

/// Parse a numeric token, accepting Fortran `D` exponents.
pub(crate) fn parse_number(token: &str) -> Option<f64> {
    if let Ok(value) = token.parse::<f64>() {
        return Some(value);
    }
    if token.contains(['D', 'd']) {
        return token.replace(['D', 'd'], "E").parse::<f64>().ok();
    }
    None
}
