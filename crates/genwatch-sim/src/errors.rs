//! ---
//! gw_section: "03-simulation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation feed: synthetic readings, fault injection, scenario replay."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unsupported scenario format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("scenario {path} is empty")]
    EmptyScenario { path: PathBuf },
    #[error("scenario {path}: row {row}, column '{column}' is not a number: {value}")]
    BadCsvValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
    #[error("unknown fault mode '{0}'")]
    UnknownFault(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}
