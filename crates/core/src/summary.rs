//! Directory-level derived quantities and final per-ensemble configurations.

use std::collections::HashMap;

use log::debug;

use crate::error::{Result, UppoutError};
use crate::run_dir::RunDirectory;
use crate::schema::COORD_COLUMNS;
use crate::table::Table;

// ============================================================================
// Derived Counts
// ============================================================================

/// Counts derived from the coordinate and restart tables.
///
/// Fields stay `None` when the backing file is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedCounts {
    /// Total number of atoms (rows of the coord file).
    pub num_atoms: Option<usize>,
    /// Number of atoms in the unit cell (distinct `at_num_cell`).
    pub num_atoms_cell: Option<usize>,
    /// Number of distinct atom types.
    pub num_atom_types: Option<usize>,
    /// Number of ensembles (distinct `ens_num` of the restart file).
    pub num_ens: Option<usize>,
    pub xrange: Option<(f64, f64)>,
    pub yrange: Option<(f64, f64)>,
    pub zrange: Option<(f64, f64)>,
}

impl DerivedCounts {
    pub fn from_tables(coord: Option<&Table>, restart: Option<&Table>) -> Result<Self> {
        let mut counts = Self::default();

        if let Some(coord) = coord {
            counts.num_atoms = Some(coord.num_rows());
            counts.num_atoms_cell = Some(distinct(coord, "at_num_cell")?);
            counts.num_atom_types = Some(distinct(coord, "at_type")?);
            counts.xrange = coord.min_max("x");
            counts.yrange = coord.min_max("y");
            counts.zrange = coord.min_max("z");
        }

        if let Some(restart) = restart {
            counts.num_ens = Some(distinct(restart, "ens_num")?);
        }

        Ok(counts)
    }
}

fn distinct(table: &Table, column: &str) -> Result<usize> {
    table
        .distinct_count(column)
        .ok_or_else(|| UppoutError::MissingColumn(column.to_string()))
}

// ============================================================================
// Final Configurations
// ============================================================================

/// Final magnetic configuration of every ensemble in the restart file.
///
/// One table per distinct `ens_num`, in order of first appearance. Each holds
/// that ensemble's restart rows left-joined with the coordinate table on
/// `at_num`; the `ens_num` column is dropped. Atoms absent from the coord
/// table keep missing (NaN) coordinate cells.
pub fn final_configurations(run: &RunDirectory) -> Result<Vec<Table>> {
    let coord = run.read_coord()?;
    let restart = run.read_restart()?;
    join_configurations(&restart, &coord)
}

pub(crate) fn join_configurations(restart: &Table, coord: &Table) -> Result<Vec<Table>> {
    let ensembles = restart
        .unique_in_order("ens_num")
        .ok_or_else(|| UppoutError::MissingColumn("ens_num".to_string()))?;
    let ens_column = restart.require_column("ens_num")?;
    let restart_atoms = restart.require_column("at_num")?;

    // First coord row wins for duplicated atom numbers.
    let mut coord_rows: HashMap<i64, usize> = HashMap::with_capacity(coord.num_rows());
    for (idx, at_num) in coord.require_column("at_num")?.iter().enumerate() {
        coord_rows.entry(*at_num as i64).or_insert(idx);
    }
    let joined_columns: Vec<&str> = COORD_COLUMNS
        .iter()
        .copied()
        .filter(|name| *name != "at_num")
        .collect();
    let coord_data = joined_columns
        .iter()
        .map(|name| coord.require_column(name))
        .collect::<Result<Vec<_>>>()?;

    let mut configs = Vec::with_capacity(ensembles.len());
    for ens in ensembles {
        let mut config = restart.filter_rows(|idx| ens_column[idx] == ens);
        config.drop_column("ens_num");

        let atom_rows: Vec<Option<usize>> = (0..restart.num_rows())
            .filter(|&idx| ens_column[idx] == ens)
            .map(|idx| coord_rows.get(&(restart_atoms[idx] as i64)).copied())
            .collect();

        let misses = atom_rows.iter().filter(|row| row.is_none()).count();
        if misses > 0 {
            debug!("ensemble {ens}: {misses} restart atoms have no coordinates");
        }

        for (name, values) in joined_columns.iter().zip(&coord_data) {
            let column = atom_rows
                .iter()
                .map(|row| row.map_or(f64::NAN, |r| values[r]))
                .collect();
            config.push_column(name, column);
        }
        configs.push(config);
    }

    Ok(configs)
}

// ============================================================================
// Lookups
// ============================================================================

/// Atom type of `at_num` according to the coordinate table.
pub fn atom_type(run: &RunDirectory, at_num: i64) -> Result<i64> {
    lookup_atom_type(&run.read_coord()?, at_num)
}

pub(crate) fn lookup_atom_type(coord: &Table, at_num: i64) -> Result<i64> {
    let atoms = coord.require_column("at_num")?;
    let types = coord.require_column("at_type")?;
    atoms
        .iter()
        .position(|&a| a as i64 == at_num)
        .map(|idx| types[idx] as i64)
        .ok_or(UppoutError::AtomNotFound(at_num))
}
