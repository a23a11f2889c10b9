//! Neighbor lookups on the `struct` (exchange neighbor list) file.

use std::collections::BTreeMap;

use crate::error::{Result, UppoutError};
use crate::run_dir::RunDirectory;
use crate::table::Table;

/// One neighbor of a central atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub at_num: i64,
    pub at_type: i64,
    /// Position relative to the central atom.
    pub position: [f64; 3],
    pub jexch: f64,
    pub dist: f64,
}

/// Neighbors of one type sharing a distance and exchange coupling.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborShell {
    /// Mean of the unrounded distances in the shell.
    pub dist: f64,
    pub count: usize,
    /// Mean of the unrounded couplings in the shell.
    pub jexch: f64,
}

/// Neighbors of `at_num` in file order.
pub fn neighbors(run: &RunDirectory, at_num: i64) -> Result<Vec<Neighbor>> {
    neighbors_in(&run.read_struct()?, at_num)
}

/// Neighbor shells of `at_num`, keyed by neighbor type.
///
/// Distances and couplings are rounded to the given number of decimals before
/// grouping so that tiny precision differences do not split a shell; `None`
/// groups on the exact values.
pub fn neighbor_shells(
    run: &RunDirectory,
    at_num: i64,
    dist_decimals: Option<u32>,
    jexch_decimals: Option<u32>,
) -> Result<BTreeMap<i64, Vec<NeighborShell>>> {
    let found = neighbors_in(&run.read_struct()?, at_num)?;
    Ok(group_shells(&found, dist_decimals, jexch_decimals))
}

pub(crate) fn neighbors_in(table: &Table, at_num: i64) -> Result<Vec<Neighbor>> {
    let col = |name: &str| table.require_column(name);
    let (center, other, other_type) = (col("at1_num")?, col("at2_num")?, col("at2_type")?);
    let (rx, ry, rz) = (col("rx")?, col("ry")?, col("rz")?);
    let (jexch, dist) = (col("Jexch")?, col("dist")?);

    let found: Vec<Neighbor> = (0..table.num_rows())
        .filter(|&idx| center[idx] as i64 == at_num)
        .map(|idx| Neighbor {
            at_num: other[idx] as i64,
            at_type: other_type[idx] as i64,
            position: [rx[idx], ry[idx], rz[idx]],
            jexch: jexch[idx],
            dist: dist[idx],
        })
        .collect();

    if found.is_empty() {
        return Err(UppoutError::AtomNotFound(at_num));
    }
    Ok(found)
}

fn group_shells(
    found: &[Neighbor],
    dist_decimals: Option<u32>,
    jexch_decimals: Option<u32>,
) -> BTreeMap<i64, Vec<NeighborShell>> {
    struct Acc {
        dist_key: f64,
        jexch_key: f64,
        dist_sum: f64,
        jexch_sum: f64,
        count: usize,
    }

    let mut by_type: BTreeMap<i64, Vec<Acc>> = BTreeMap::new();
    for neighbor in found {
        let dist = neighbor.dist;
        let dist_key = round_to(dist, dist_decimals);
        let jexch_key = round_to(neighbor.jexch, jexch_decimals);
        let shells = by_type.entry(neighbor.at_type).or_default();
        match shells
            .iter_mut()
            .find(|s| s.dist_key == dist_key && s.jexch_key == jexch_key)
        {
            Some(shell) => {
                shell.dist_sum += dist;
                shell.jexch_sum += neighbor.jexch;
                shell.count += 1;
            }
            None => shells.push(Acc {
                dist_key,
                jexch_key,
                dist_sum: dist,
                jexch_sum: neighbor.jexch,
                count: 1,
            }),
        }
    }

    by_type
        .into_iter()
        .map(|(at_type, mut shells)| {
            shells.sort_by(|a, b| {
                a.dist_key
                    .total_cmp(&b.dist_key)
                    .then(a.jexch_key.total_cmp(&b.jexch_key))
            });
            let shells = shells
                .into_iter()
                .map(|s| NeighborShell {
                    dist: s.dist_sum / s.count as f64,
                    count: s.count,
                    jexch: s.jexch_sum / s.count as f64,
                })
                .collect();
            (at_type, shells)
        })
        .collect()
}

fn round_to(value: f64, decimals: Option<u32>) -> f64 {
    match decimals {
        Some(d) => {
            let scale = 10f64.powi(d as i32);
            (value * scale).round() / scale
        }
        None => value,
    }
}
