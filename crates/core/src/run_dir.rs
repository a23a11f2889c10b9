//! Indexing of a single simulation output directory.
//!
//! A run directory holds files named `<prefix>.<simid>.out`, where the
//! simulation identifier is exactly eight characters. Several output sets may
//! share a directory; [`RunDirectory::open`] resolves which identifier to use
//! and maps every output kind to the file that backs it.
//!
//! When no identifier can be found at all the directory is still usable: file
//! lookup falls back to the first file whose name starts with the prefix.

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::debug;

use crate::error::{Result, UppoutError};
use crate::reader;
use crate::schema::{OutputKind, OUTPUT_EXTENSION, SIMID_LEN};
use crate::summary::DerivedCounts;
use crate::table::{ProjectedTables, Table};

/// An opened simulation output directory.
#[derive(Debug)]
pub struct RunDirectory {
    path: PathBuf,
    simid: Option<String>,
    file_names: Vec<String>,
    prefixes: Vec<String>,
    counts: OnceCell<DerivedCounts>,
}

impl RunDirectory {
    /// Open `directory`, optionally restricted to one simulation identifier.
    ///
    /// Without an identifier, every `<prefix>.<simid>.out` file is inspected and
    /// the directory must reference at most one identifier.
    pub fn open(directory: impl AsRef<Path>, simid: Option<&str>) -> Result<Self> {
        let path = directory.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(UppoutError::DirectoryNotFound(path));
        }
        if let Some(id) = simid {
            validate_simid(id)?;
        }

        let mut file_names = list_files(&path)?;
        if let Some(id) = simid {
            file_names.retain(|name| matches!(split_output_name(name), Some((_, s)) if s == id));
            if file_names.is_empty() {
                return Err(UppoutError::NoMatchingFiles {
                    dir: path,
                    simid: id.to_string(),
                });
            }
        }

        let mut prefix_simids: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in &file_names {
            if let Some((prefix, id)) = split_output_name(name) {
                prefix_simids
                    .entry(prefix.to_string())
                    .or_default()
                    .insert(id.to_string());
            }
        }

        let resolved = match simid {
            Some(id) => Some(id.to_string()),
            None => {
                let found: BTreeSet<&String> = prefix_simids.values().flatten().collect();
                if found.len() > 1 {
                    return Err(UppoutError::AmbiguousSimId {
                        dir: path,
                        simids: found.into_iter().cloned().collect(),
                    });
                }
                found.into_iter().next().cloned()
            }
        };

        debug!(
            "opened run directory {} (simid: {}, {} files)",
            path.display(),
            resolved.as_deref().unwrap_or("<none>"),
            file_names.len()
        );

        Ok(Self {
            path,
            simid: resolved,
            file_names,
            prefixes: prefix_simids.into_keys().collect(),
            counts: OnceCell::new(),
        })
    }

    /// Identifier of the most recently modified `<prefix>.<simid>.out` file of
    /// the given kind.
    pub fn newest_simid(directory: impl AsRef<Path>, kind: OutputKind) -> Result<String> {
        let dir = directory.as_ref();
        if !dir.is_dir() {
            return Err(UppoutError::DirectoryNotFound(dir.to_path_buf()));
        }

        let mut newest: Option<(SystemTime, String)> = None;
        for name in list_files(dir)? {
            let Some((prefix, id)) = split_output_name(&name) else {
                continue;
            };
            if prefix != kind.prefix() {
                continue;
            }
            let file = dir.join(&name);
            let modified = fs::metadata(&file)
                .and_then(|meta| meta.modified())
                .map_err(|source| UppoutError::Io { path: file, source })?;
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, id.to_string()));
            }
        }

        newest.map(|(_, id)| id).ok_or_else(|| {
            UppoutError::FileNotFound(dir.join(format!("{}.*.{OUTPUT_EXTENSION}", kind.prefix())))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn simid(&self) -> Option<&str> {
        self.simid.as_deref()
    }

    /// Sorted names of the files in scope.
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// Sorted prefixes of the identifier-tagged files in scope.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether a file backs the given kind.
    pub fn has(&self, kind: OutputKind) -> bool {
        self.resolve(kind.prefix()).is_ok()
    }

    /// Path of the file backing `prefix`.
    pub fn resolve(&self, prefix: &str) -> Result<PathBuf> {
        let name = match &self.simid {
            Some(simid) => {
                let name = format!("{prefix}.{simid}.{OUTPUT_EXTENSION}");
                if !self.file_names.contains(&name) {
                    return Err(UppoutError::FileNotFound(self.path.join(name)));
                }
                name
            }
            None => self
                .file_names
                .iter()
                .find(|name| name.starts_with(prefix))
                .cloned()
                .ok_or_else(|| UppoutError::FileNotFound(self.path.join(prefix)))?,
        };

        let path = self.path.join(name);
        if !path.is_file() {
            return Err(UppoutError::FileNotFound(path));
        }
        Ok(path)
    }

    // ------------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------------

    /// Read a flat table of the given kind.
    pub fn read(&self, kind: OutputKind) -> Result<Table> {
        reader::read_table(&self.resolve(kind.prefix())?, kind)
    }

    /// Read a projected file, partitioned by projection index.
    pub fn read_projected(&self, kind: OutputKind) -> Result<ProjectedTables> {
        reader::read_projected(&self.resolve(kind.prefix())?, kind)
    }

    pub fn read_averages(&self) -> Result<Table> {
        self.read(OutputKind::Averages)
    }

    pub fn read_cumulants(&self) -> Result<Table> {
        self.read(OutputKind::Cumulants)
    }

    pub fn read_coord(&self) -> Result<Table> {
        self.read(OutputKind::Coord)
    }

    pub fn read_restart(&self) -> Result<Table> {
        self.read(OutputKind::Restart)
    }

    pub fn read_struct(&self) -> Result<Table> {
        self.read(OutputKind::Struct)
    }

    pub fn read_energy(&self) -> Result<Table> {
        self.read(OutputKind::Energy)
    }

    pub fn read_projavgs(&self) -> Result<ProjectedTables> {
        self.read_projected(OutputKind::ProjAvgs)
    }

    pub fn read_projcumulants(&self) -> Result<ProjectedTables> {
        self.read_projected(OutputKind::ProjCumulants)
    }

    // ------------------------------------------------------------------------
    // Derived Counts
    // ------------------------------------------------------------------------

    /// Atom, type and ensemble counts plus coordinate ranges, computed on
    /// first use from whichever of the coord and restart files exist.
    pub fn counts(&self) -> Result<&DerivedCounts> {
        if let Some(counts) = self.counts.get() {
            return Ok(counts);
        }
        let coord = self
            .has(OutputKind::Coord)
            .then(|| self.read_coord())
            .transpose()?;
        let restart = self
            .has(OutputKind::Restart)
            .then(|| self.read_restart())
            .transpose()?;
        let computed = DerivedCounts::from_tables(coord.as_ref(), restart.as_ref())?;
        Ok(self.counts.get_or_init(|| computed))
    }

    pub fn num_atoms(&self) -> Result<Option<usize>> {
        Ok(self.counts()?.num_atoms)
    }

    pub fn num_atoms_cell(&self) -> Result<Option<usize>> {
        Ok(self.counts()?.num_atoms_cell)
    }

    pub fn num_atom_types(&self) -> Result<Option<usize>> {
        Ok(self.counts()?.num_atom_types)
    }

    pub fn num_ens(&self) -> Result<Option<usize>> {
        Ok(self.counts()?.num_ens)
    }

    pub fn xrange(&self) -> Result<Option<(f64, f64)>> {
        Ok(self.counts()?.xrange)
    }

    pub fn yrange(&self) -> Result<Option<(f64, f64)>> {
        Ok(self.counts()?.yrange)
    }

    pub fn zrange(&self) -> Result<Option<(f64, f64)>> {
        Ok(self.counts()?.zrange)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_simid(simid: &str) -> Result<()> {
    if simid.chars().count() != SIMID_LEN {
        return Err(UppoutError::InvalidSimId(simid.to_string()));
    }
    Ok(())
}

/// Split `<prefix>.<simid>.out` into prefix and identifier.
fn split_output_name(name: &str) -> Option<(&str, &str)> {
    let mut parts = name.split('.');
    let (prefix, simid, ext) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || ext != OUTPUT_EXTENSION || prefix.is_empty() {
        return None;
    }
    (simid.chars().count() == SIMID_LEN).then_some((prefix, simid))
}

/// Sorted names of the regular files directly inside `dir`.
fn list_files(dir: &Path) -> Result<Vec<String>> {
    let io_err = |source| UppoutError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
