//! Batch aggregation over a tree of run directories.
//!
//! Every immediate subdirectory of the root whose name matches the run-name
//! template is treated as one run. For each run the requested output file is
//! read, restricted to a row range and reduced to the mean of every summary
//! column; the run's template parameters become the leading columns of the
//! row.
//!
//! # Failure Policy
//!
//! In strict mode (the default) the first failing run, in discovery order,
//! aborts the whole collection with its error. In lenient mode failing runs
//! are logged at `warn` level and skipped.
//!
//! # Parallelism
//!
//! With `parallel` set, runs are processed on the rayon global pool and rows
//! are gathered in discovery order, so the sorted result matches a sequential
//! run. In strict mode outstanding runs are cancelled once one fails and the
//! first failure observed is returned; when several runs fail this need not be
//! the first in discovery order.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use rayon::prelude::*;
use uppout_core::schema::{public_column_name, SIMID_LEN};
use uppout_core::{OutputKind, Result, RunDirectory, Table, UppoutError};

use crate::result::{AggregatedRow, AggregationResult};
use crate::template::{ParamValue, RunNameTemplate};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

// ============================================================================
// Options
// ============================================================================

/// How the simulation identifier of each run directory is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SimIdStrategy {
    /// Use the single identifier found in the directory.
    #[default]
    Auto,
    /// Use the given identifier in every directory.
    Explicit(String),
    /// Use the identifier of the most recently modified file of the
    /// collected kind.
    Newest,
}

impl FromStr for SimIdStrategy {
    type Err = UppoutError;

    /// `auto`, `newest` or an eight-character identifier.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(SimIdStrategy::Auto),
            "newest" => Ok(SimIdStrategy::Newest),
            id if id.chars().count() == SIMID_LEN => Ok(SimIdStrategy::Explicit(id.to_string())),
            other => Err(UppoutError::InvalidSimId(other.to_string())),
        }
    }
}

/// Options shared by all collect functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    pub simid: SimIdStrategy,
    /// Row range `[start:end:step]` applied before averaging.
    pub start: Option<isize>,
    pub end: Option<isize>,
    pub step: Option<isize>,
    /// Abort on the first failing run instead of skipping it.
    pub strict: bool,
    /// Show a progress bar on stderr.
    pub progress: bool,
    /// Process runs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            simid: SimIdStrategy::Auto,
            start: None,
            end: None,
            step: None,
            strict: true,
            progress: false,
            parallel: false,
        }
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Aggregate a flat time-series kind over every run under `root`.
pub fn collect(
    root: impl AsRef<Path>,
    template: &str,
    kind: OutputKind,
    options: &CollectOptions,
) -> Result<AggregationResult> {
    if kind.is_projected() || !kind.is_time_series() {
        return Err(UppoutError::UnsupportedKind(kind));
    }
    let template = RunNameTemplate::new(template)?;
    check_step(options)?;
    let runs = discover_runs(root.as_ref(), &template)?;
    let columns = kind.summary_columns();

    let rows = process_runs(&runs, options, |run| {
        let table = open_run(&run.path, &options.simid, kind)?.read(kind)?;
        let values = summarize(&table, &columns, options, &run.path, kind)?;
        Ok(vec![AggregatedRow {
            params: run.params.clone(),
            values,
        }])
    })?;

    debug!("collected {} {} rows under {}", rows.len(), kind, root.as_ref().display());
    Ok(AggregationResult::new(
        template.fields().to_vec(),
        public_columns(&columns),
        rows,
    ))
}

/// Aggregate a projected kind, producing one result per projection index.
///
/// Runs contribute one row to every projection index present in their file.
pub fn collect_projected(
    root: impl AsRef<Path>,
    template: &str,
    kind: OutputKind,
    options: &CollectOptions,
) -> Result<BTreeMap<i64, AggregationResult>> {
    if !kind.is_projected() {
        return Err(UppoutError::UnsupportedKind(kind));
    }
    let template = RunNameTemplate::new(template)?;
    check_step(options)?;
    let runs = discover_runs(root.as_ref(), &template)?;
    let columns = kind.summary_columns();

    let rows = process_runs(&runs, options, |run| {
        let parts = open_run(&run.path, &options.simid, kind)?.read_projected(kind)?;
        if parts.is_empty() {
            return Err(UppoutError::EmptyTable(format!(
                "{kind} file in \"{}\" has no rows",
                run.path.display()
            )));
        }
        parts
            .iter()
            .map(|(proj, table)| {
                let values = summarize(table, &columns, options, &run.path, kind)?;
                Ok((
                    *proj,
                    AggregatedRow {
                        params: run.params.clone(),
                        values,
                    },
                ))
            })
            .collect()
    })?;

    let mut grouped: BTreeMap<i64, Vec<AggregatedRow>> = BTreeMap::new();
    for (proj, row) in rows {
        grouped.entry(proj).or_default().push(row);
    }
    debug!(
        "collected {} projection indices of {} under {}",
        grouped.len(),
        kind,
        root.as_ref().display()
    );

    let value_columns = public_columns(&columns);
    Ok(grouped
        .into_iter()
        .map(|(proj, rows)| {
            let result =
                AggregationResult::new(template.fields().to_vec(), value_columns.clone(), rows);
            (proj, result)
        })
        .collect())
}

pub fn collect_averages(
    root: impl AsRef<Path>,
    template: &str,
    options: &CollectOptions,
) -> Result<AggregationResult> {
    collect(root, template, OutputKind::Averages, options)
}

pub fn collect_cumulants(
    root: impl AsRef<Path>,
    template: &str,
    options: &CollectOptions,
) -> Result<AggregationResult> {
    collect(root, template, OutputKind::Cumulants, options)
}

pub fn collect_energies(
    root: impl AsRef<Path>,
    template: &str,
    options: &CollectOptions,
) -> Result<AggregationResult> {
    collect(root, template, OutputKind::Energy, options)
}

pub fn collect_projavgs(
    root: impl AsRef<Path>,
    template: &str,
    options: &CollectOptions,
) -> Result<BTreeMap<i64, AggregationResult>> {
    collect_projected(root, template, OutputKind::ProjAvgs, options)
}

pub fn collect_projcumulants(
    root: impl AsRef<Path>,
    template: &str,
    options: &CollectOptions,
) -> Result<BTreeMap<i64, AggregationResult>> {
    collect_projected(root, template, OutputKind::ProjCumulants, options)
}

// ============================================================================
// Discovery
// ============================================================================

/// A subdirectory whose name matched the template.
#[derive(Debug, Clone)]
struct MatchedRun {
    path: PathBuf,
    params: Vec<ParamValue>,
}

/// Matching subdirectories of `root`, sorted by name.
fn discover_runs(root: &Path, template: &RunNameTemplate) -> Result<Vec<MatchedRun>> {
    if !root.is_dir() {
        return Err(UppoutError::DirectoryNotFound(root.to_path_buf()));
    }
    let io_err = |source| UppoutError::Io {
        path: root.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if path.is_dir() {
            entries.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let runs: Vec<MatchedRun> = entries
        .into_iter()
        .filter_map(|(name, path)| {
            template
                .match_name(&name)
                .map(|params| MatchedRun { path, params })
        })
        .collect();

    debug!(
        "{} run directories under {} match \"{}\"",
        runs.len(),
        root.display(),
        template
    );
    Ok(runs)
}

fn open_run(path: &Path, strategy: &SimIdStrategy, kind: OutputKind) -> Result<RunDirectory> {
    match strategy {
        SimIdStrategy::Auto => RunDirectory::open(path, None),
        SimIdStrategy::Explicit(simid) => RunDirectory::open(path, Some(simid)),
        SimIdStrategy::Newest => {
            let simid = RunDirectory::newest_simid(path, kind)?;
            RunDirectory::open(path, Some(&simid))
        }
    }
}

// ============================================================================
// Per-Run Work
// ============================================================================

fn check_step(options: &CollectOptions) -> Result<()> {
    if options.step == Some(0) {
        return Err(UppoutError::InvalidRowStep);
    }
    Ok(())
}

/// Means of `columns` over the selected row range.
fn summarize(
    table: &Table,
    columns: &[&str],
    options: &CollectOptions,
    run: &Path,
    kind: OutputKind,
) -> Result<Vec<f64>> {
    if table.is_empty() {
        return Err(UppoutError::EmptyTable(format!(
            "{kind} file in \"{}\" has no rows",
            run.display()
        )));
    }
    let selected = table.slice_rows(options.start, options.end, options.step)?;
    if selected.is_empty() {
        return Err(UppoutError::EmptyTable(format!(
            "row range of {kind} file in \"{}\" selects no rows",
            run.display()
        )));
    }

    columns
        .iter()
        .map(|name| {
            selected.require_column(name)?;
            Ok(selected.column_mean(name).unwrap_or(f64::NAN))
        })
        .collect()
}

fn public_columns(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|name| public_column_name(name)).collect()
}

/// Run `work` on every run and apply the failure policy.
fn process_runs<T, F>(runs: &[MatchedRun], options: &CollectOptions, work: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&MatchedRun) -> Result<Vec<T>> + Sync,
{
    let pb = if options.progress {
        let pb = ProgressBar::new(runs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let tracked = |run: &MatchedRun| {
        let outcome = work(run);
        pb.inc(1);
        outcome
    };

    let outcomes: Vec<Result<Vec<T>>> = if options.parallel && options.strict {
        // Stops scheduling new runs once any run has failed.
        let gathered: Result<Vec<Vec<T>>> = runs.par_iter().map(tracked).collect();
        pb.finish_and_clear();
        return Ok(gathered?.into_iter().flatten().collect());
    } else if options.parallel {
        runs.par_iter().map(tracked).collect()
    } else if options.strict {
        let mut collected = Vec::with_capacity(runs.len());
        for run in runs {
            match tracked(run) {
                Ok(rows) => collected.push(Ok(rows)),
                Err(err) => {
                    pb.abandon();
                    return Err(err);
                }
            }
        }
        collected
    } else {
        runs.iter().map(tracked).collect()
    };
    pb.finish_and_clear();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (run, outcome) in runs.iter().zip(outcomes) {
        match outcome {
            Ok(run_rows) => rows.extend(run_rows),
            Err(err) if options.strict => return Err(err),
            Err(err) => {
                warn!("skipping run {}: {}", run.path.display(), err);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        debug!("skipped {skipped} of {} runs", runs.len());
    }
    Ok(rows)
}
