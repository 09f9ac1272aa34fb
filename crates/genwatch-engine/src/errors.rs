//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("duplicate parameter key '{0}' in registry")]
    DuplicateKey(String),
    #[error("parameter '{key}': normal band [{low}, {high}] must satisfy min <= low <= high <= max (bounds [{min}, {max}])")]
    NormalOutsideBounds {
        key: String,
        low: f64,
        high: f64,
        min: f64,
        max: f64,
    },
    #[error("parameter '{key}': alarm bound {bound} lies inside the normal band")]
    AlarmInsideNormal { key: String, bound: f64 },
    #[error("parameter '{key}': shutdown bound {bound} does not lie outside the alarm bound on the same side")]
    ShutdownInsideAlarm { key: String, bound: f64 },
    #[error("registry has no definitions for the cylinder exhaust bank")]
    MissingCylinderBank,
    #[error("unsupported registry file format: {0}")]
    UnsupportedFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
