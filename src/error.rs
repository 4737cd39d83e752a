//! Error types shared by the pipeline stages.
//!
//! Each stage has its own enum so a failure in one stage can be reported
//! (and recovered from) without touching the others.

use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while reading or validating `config.json`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised while loading a result table. Fatal to the load: no partial
/// table is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// The bytes could not be decoded as the announced format.
    #[error("unreadable {format} input: {message}")]
    Unreadable {
        format: &'static str,
        message: String,
    },

    #[error("the workbook contains no worksheet")]
    NoWorksheet,

    #[error("the input has no header row")]
    MissingHeader,

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("column '{column}', row {row}: '{value}' is not a number")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

impl LoadError {
    pub(crate) fn unreadable(format: &'static str, err: impl std::fmt::Display) -> Self {
        LoadError::Unreadable {
            format,
            message: err.to_string(),
        }
    }
}

/// Errors raised while deriving a chart spec from a view.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChartError {
    /// Two distinct columns are required but the same one was chosen twice.
    #[error("select two different variables (got '{0}' for both axes)")]
    InvalidSelection(String),

    #[error("column '{0}' is not a configured numeric column")]
    UnknownColumn(String),
}

/// Errors raised while exporting a report document.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("report rendering failed: {0}")]
    Render(String),

    #[error("IO error while writing the report: {0}")]
    Io(#[from] std::io::Error),

    #[error("report export did not finish within {0:?}")]
    Timeout(Duration),

    #[error("report worker stopped before delivering a result")]
    WorkerLost,
}
