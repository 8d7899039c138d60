//! # Error Types
//!
//! Every fallible operation in the pipeline returns [`PlotResult`]. The variants
//! follow the error classes the web layer needs to tell apart:
//!
//! - **User input** ([`PlotError::InvalidRequest`]): shown next to the form, the
//!   pipeline never starts.
//! - **Data availability** ([`PlotError::NoDataFound`]): an operational problem,
//!   ingestion has not run yet.
//! - **Missing file** ([`PlotError::FileNotFound`]): a specific day or month was
//!   not ingested. Reported with a path relative to the data root.
//! - **Malformed data** ([`PlotError::MalformedData`]): the source files do not
//!   have the expected schema. Not user-correctable.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, loading or reducing CFSR data
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("No data found in {}. Please run ingest.", dir.display())]
    NoDataFound { dir: PathBuf },

    #[error("File not found: {}", relative.display())]
    FileNotFound { path: PathBuf, relative: PathBuf },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Malformed source data: {0}")]
    MalformedData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for pipeline operations
pub type PlotResult<T> = Result<T, PlotError>;

impl PlotError {
    /// Returns `true` when the error is caused by the request itself or by a
    /// missing day/month, i.e. something the user can act on.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PlotError::InvalidRequest(_) | PlotError::FileNotFound { .. }
        )
    }

    /// Message suitable for display to an end user.
    ///
    /// Missing files only ever expose the path relative to the data root.
    /// Internal errors collapse to a generic message; the details belong in
    /// the log.
    pub fn user_message(&self) -> String {
        match self {
            PlotError::InvalidRequest(msg) => msg.clone(),
            PlotError::FileNotFound { relative, .. } => {
                format!("File not found: {}", relative.display())
            }
            PlotError::NoDataFound { .. } => {
                "No data is available yet. Please run ingest.".to_string()
            }
            _ => "Internal error while preparing the plot.".to_string(),
        }
    }
}
