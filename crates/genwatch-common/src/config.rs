//! ---
//! gw_section: "01-shared-runtime"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Shared primitives and utilities for the monitor runtime."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_mode() -> Mode {
    Mode::Simulation
}

fn default_history_window() -> usize {
    60
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    "0.0.0.0:9898"
        .parse()
        .expect("valid default metrics address")
}

fn default_simulation_seed() -> u64 {
    0x6123_30Bu64
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(2)
}

/// Primary configuration object for the GenWatch runtime.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Optional registry definition file; the built-in MAN 6L23/30H catalog
    /// is used when absent.
    #[serde(default)]
    pub registry_file: Option<PathBuf>,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "GENWATCH_CONFIG";

    /// Load configuration from disk, respecting the `GENWATCH_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.history.window == 0 {
            return Err(anyhow!("history window must be at least one reading"));
        }
        self.simulation.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            registry_file: None,
            history: HistoryConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Source of the reading stream driven by the daemon.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Readings arrive as NDJSON records on stdin from the acquisition side.
    Production,
    /// Readings are synthesised by the simulation engine.
    #[default]
    Simulation,
    /// Readings are replayed from recorded scenario files.
    Replay,
}

impl Mode {
    pub fn is_simulation(&self) -> bool {
        matches!(self, Mode::Simulation)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Mode::Production),
            "simulation" => Ok(Mode::Simulation),
            "replay" => Ok(Mode::Replay),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// Depth of the recent-readings window kept for trend display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_window")]
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

/// Settings for the synthetic reading generator and scenario replay.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
    #[serde(default = "default_tick_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,
    /// Scenario files (`.json` or `.csv`) consumed in replay mode.
    #[serde(default)]
    pub scenario_files: Vec<PathBuf>,
    /// Fault injection mode by wire name (e.g. `fouled_injector_cyl3`);
    /// parsed by the simulation crate.
    #[serde(default)]
    pub fault_inject: Option<String>,
    /// Engine speed setpoint in RPM.
    #[serde(default)]
    pub speed_setpoint_rpm: Option<f64>,
    /// Generator load setpoint as a percentage of rated power.
    #[serde(default)]
    pub load_setpoint_pct: Option<f64>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("simulation tick interval must be non-zero"));
        }
        if let Some(pct) = self.load_setpoint_pct {
            if !(0.0..=110.0).contains(&pct) {
                return Err(anyhow!("load setpoint must be within 0..=110 percent"));
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            random_seed: default_simulation_seed(),
            tick_interval: default_tick_interval(),
            scenario_files: Vec::new(),
            fault_inject: None,
            speed_setpoint_rpm: None,
            load_setpoint_pct: None,
        }
    }
}
