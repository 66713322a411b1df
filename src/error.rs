use std::path::PathBuf;

use thiserror::Error;

use crate::models::Dataset;

/// Errors raised while reading a tabular source.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("entry '{entry}' not found in archive {archive}")]
    EntryNotFound { archive: PathBuf, entry: String },

    #[error("sheet '{sheet}' not found in {path}")]
    SheetNotFound { path: PathBuf, sheet: String },

    #[error("unreadable container {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("{path} is not valid {encoding}")]
    Encoding { path: PathBuf, encoding: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Fatal errors of the import pipeline.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("required column '{column}' is missing in the source table")]
    MissingColumn { column: String },

    #[error("invalid import command for key '{key}': {command}")]
    InvalidCommand { key: String, command: String },

    /// No variables were produced. The empty dataset is handed back to the caller.
    #[error("import produced no variables")]
    EmptyResult { dataset: Box<Dataset> },
}

/// Umbrella error for the toolbox.
#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Incompatible datasets: {0}")]
    IncompatibleDatasets(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<rust_xlsxwriter::XlsxError> for ToolboxError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ToolboxError::Excel(e.to_string())
    }
}

impl From<toml::de::Error> for ToolboxError {
    fn from(e: toml::de::Error) -> Self {
        ToolboxError::Config(e.to_string())
    }
}
