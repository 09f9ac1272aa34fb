//! ---
//! gw_section: "01-shared-runtime"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Shared primitives and utilities for the monitor runtime."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
//! Shared runtime primitives for the GenWatch workspace: configuration
//! loading, tracing initialisation, and time helpers.

pub mod config;
pub mod logging;
pub mod time;
pub mod version;

pub use config::{
    AppConfig, HistoryConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, Mode,
    SimulationConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
