//! TOML description of one collection.
//!
//! ```toml
//! [collect]
//! root = "runs/bccFe_thermal"
//! template = "bccFe_temp_T{T}"
//! kind = "averages"
//! simid = "auto"          # "auto", "newest" or an 8-character identifier
//! strict = true
//!
//! [rows]
//! start = 10
//! end = 50
//! step = 2
//!
//! [output]
//! path = "averages.csv"
//! ```
//!
//! Only `root`, `template` and `kind` are required.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use uppout_core::OutputKind;

use crate::aggregate::{CollectOptions, SimIdStrategy};
use crate::template::RunNameTemplate;

// ============================================================================
// Sections
// ============================================================================

/// The `[collect]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectSection {
    /// Directory holding one subdirectory per run.
    pub root: PathBuf,
    pub template: String,
    pub kind: OutputKind,
    #[serde(default = "default_simid")]
    pub simid: String,
    #[serde(default = "default_true")]
    pub strict: bool,
    #[serde(default)]
    pub progress: bool,
    #[serde(default)]
    pub parallel: bool,
}

/// The `[rows]` section: slice applied to every table before averaging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: Option<isize>,
    pub end: Option<isize>,
    pub step: Option<isize>,
}

/// The `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSection {
    /// CSV destination; standard output when absent.
    pub path: Option<PathBuf>,
}

fn default_simid() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// A complete collection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectConfig {
    pub collect: CollectSection,
    #[serde(default)]
    pub rows: RowRange,
    #[serde(default)]
    pub output: OutputSection,
}

impl CollectConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        if !s.contains("[collect]") {
            return Err(ConfigError::NotCollectConfig);
        }
        let config: CollectConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let kind = self.collect.kind;
        if !kind.is_time_series() {
            return Err(ConfigError::Invalid(format!(
                "{kind} files cannot be aggregated"
            )));
        }

        if self.collect.template.trim().is_empty() {
            return Err(ConfigError::Invalid("template must not be empty".into()));
        }
        RunNameTemplate::new(&self.collect.template)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        self.simid_strategy()?;

        if self.rows.step == Some(0) {
            return Err(ConfigError::Invalid("rows.step must not be zero".into()));
        }
        Ok(())
    }

    pub fn simid_strategy(&self) -> Result<SimIdStrategy, ConfigError> {
        self.collect
            .simid
            .parse()
            .map_err(|e: uppout_core::UppoutError| ConfigError::Invalid(e.to_string()))
    }

    /// Aggregation options described by this configuration.
    pub fn options(&self) -> Result<CollectOptions, ConfigError> {
        Ok(CollectOptions {
            simid: self.simid_strategy()?,
            start: self.rows.start,
            end: self.rows.end,
            step: self.rows.step,
            strict: self.collect.strict,
            progress: self.collect.progress,
            parallel: self.collect.parallel,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML file does not contain [collect] section - not a collect configuration")]
    NotCollectConfig,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
