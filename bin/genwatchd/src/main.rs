//! ---
//! gw_section: "05-daemon"
//! gw_subsection: "binary"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Binary entrypoint for the GenWatch daemon."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use genwatch_common::config::{AppConfig, Mode};
use genwatch_common::logging::init_tracing;
use genwatch_common::version::VersionInfo;
use genwatch_engine::model::Reading;
use genwatch_engine::monitor::EngineMonitor;
use genwatch_engine::registry::Registry;
use genwatch_metrics::{new_registry, spawn_http_server, DaemonMetrics, MonitorMetrics};
use genwatch_sim::{
    generator_stream, replay_stream, ReadingStream, ReplayEngine, SimControls, SimulationEngine,
};

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "GenWatch genset monitoring daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[arg(long, value_enum, help = "Override reading source mode")]
    mode: Option<CliMode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Production,
    Simulation,
    Replay,
}

impl From<CliMode> for Mode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Production => Mode::Production,
            CliMode::Simulation => Mode::Simulation,
            CliMode::Replay => Mode::Replay,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the monitor")]
    Run,
    #[command(about = "Print the effective channel catalog as TOML and exit")]
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.prod.toml"));
    candidates.push(PathBuf::from("configs/example.dev.toml"));

    let load_started = Instant::now();
    let loaded_config = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded_config.config;
    let config_path = loaded_config.source;
    let load_duration = load_started.elapsed();

    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {}
        Commands::Catalog => {
            let registry = load_registry(&config)?;
            println!("{}", toml::to_string_pretty(&registry)?);
            return Ok(());
        }
    }

    init_tracing("genwatchd", &config.logging)?;
    info!(
        version = %version.cli_string(),
        config_path = %config_path.display(),
        mode = ?config.mode,
        "configuration loaded"
    );

    let metrics_registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(metrics_registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(&version.semver, &version.git_sha, &version.profile);

    run_daemon(config, metrics_registry).await
}

async fn run_daemon(
    config: AppConfig,
    metrics_registry: genwatch_metrics::SharedRegistry,
) -> Result<()> {
    let registry = Arc::new(load_registry(&config)?);
    info!(channels = registry.len(), "channel catalog ready");

    let metrics_server = if config.metrics.enabled {
        info!(address = %config.metrics.listen, "metrics exporter enabled");
        Some(spawn_http_server(
            metrics_registry.clone(),
            config.metrics.listen,
        )?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let monitor_metrics = Arc::new(MonitorMetrics::new(metrics_registry)?);
    let mut monitor =
        EngineMonitor::new(Arc::clone(&registry)).with_window(config.history.window);
    monitor.subscribe(monitor_metrics);

    let readings = reading_stream(&config, Arc::clone(&registry))?;

    info!(mode = ?config.mode, "monitor running; waiting for termination signal");
    tokio::select! {
        _ = monitor.run(readings) => {
            info!("reading source exhausted");
        }
        result = signal::ctrl_c() => {
            result?;
            info!("ctrl-c received; shutting down");
        }
    }
    info!(
        readings = monitor.readings_seen(),
        last_state = ?monitor.last_state().map(|state| state.to_string()),
        "monitor stopped"
    );

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}

fn load_registry(config: &AppConfig) -> Result<Registry> {
    match &config.registry_file {
        Some(path) => Registry::from_path(path)
            .with_context(|| format!("unable to load registry file {}", path.display())),
        None => Ok(Registry::man_6l23_30h()),
    }
}

/// Build the reading source for the configured mode.
fn reading_stream(config: &AppConfig, registry: Arc<Registry>) -> Result<ReadingStream> {
    match config.mode {
        Mode::Production => Ok(stdin_stream()),
        Mode::Simulation => {
            let controls = controls_from_config(config)?;
            let engine = SimulationEngine::new(registry, controls, config.simulation.random_seed);
            Ok(generator_stream(engine, config.simulation.tick_interval))
        }
        Mode::Replay => {
            if config.simulation.scenario_files.is_empty() {
                return Err(anyhow!("replay mode requires simulation.scenario_files"));
            }
            let replay = ReplayEngine::from_paths(&config.simulation.scenario_files)?;
            info!(readings = replay.len(), "scenario timeline loaded");
            Ok(replay_stream(replay, config.simulation.tick_interval))
        }
    }
}

fn controls_from_config(config: &AppConfig) -> Result<SimControls> {
    let mut controls = SimControls {
        running: true,
        tick_interval: config.simulation.tick_interval,
        ..SimControls::default()
    };
    if let Some(rpm) = config.simulation.speed_setpoint_rpm {
        controls.engine_speed_setpoint = rpm;
    }
    if let Some(pct) = config.simulation.load_setpoint_pct {
        controls.load_setpoint_pct = pct;
    }
    if let Some(fault) = &config.simulation.fault_inject {
        controls = controls
            .with_fault_name(fault)
            .context("invalid simulation.fault_inject")?;
    }
    Ok(controls)
}

/// NDJSON readings on stdin from the acquisition side. Malformed lines are
/// logged and skipped so one bad record cannot stall the feed.
fn stdin_stream() -> ReadingStream {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    Box::pin(stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Reading>(&line) {
                        Ok(reading) => return Some((reading, lines)),
                        Err(err) => {
                            warn!(error = %err, "skipping malformed reading record");
                        }
                    }
                }
                Ok(None) => return None,
                Err(err) => {
                    warn!(error = %err, "stdin read failed; closing reading source");
                    return None;
                }
            }
        }
    }))
}
