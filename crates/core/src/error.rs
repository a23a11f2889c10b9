//! Error taxonomy shared by the readers, the run-directory indexer and the
//! aggregation layer.

use std::io;
use std::path::PathBuf;

use crate::schema::OutputKind;

pub type Result<T> = std::result::Result<T, UppoutError>;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while locating, parsing or summarizing output files.
#[derive(Debug, thiserror::Error)]
pub enum UppoutError {
    #[error("directory not found: \"{}\"", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("file not found: \"{}\"", .0.display())]
    FileNotFound(PathBuf),

    #[error("simid must be a string with 8 characters, got \"{0}\"")]
    InvalidSimId(String),

    #[error(
        "multiple simid values detected in \"{}\": {}; please specify a simid to use",
        .dir.display(),
        .simids.join(", ")
    )]
    AmbiguousSimId { dir: PathBuf, simids: Vec<String> },

    #[error("no output files found for simid \"{simid}\" in \"{}\"", .dir.display())]
    NoMatchingFiles { dir: PathBuf, simid: String },

    #[error(
        "{kind} file \"{}\" has {found} columns, expected {expected}",
        .path.display()
    )]
    SchemaMismatch {
        path: PathBuf,
        kind: OutputKind,
        expected: usize,
        found: usize,
    },

    #[error("failed to parse \"{}\": {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("no data rows: {0}")]
    EmptyTable(String),

    #[error("atom number {0} not found")]
    AtomNotFound(i64),

    #[error("{0} files cannot be aggregated here")]
    UnsupportedKind(OutputKind),

    #[error("invalid run-name template: {0}")]
    InvalidTemplate(String),

    #[error("row step must not be zero")]
    InvalidRowStep,

    #[error("column \"{0}\" not present in table")]
    MissingColumn(String),

    #[error("IO error on \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Underlying cause of a [`UppoutError::Parse`] failure.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line {line}: cannot parse \"{token}\" as a number")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
}
