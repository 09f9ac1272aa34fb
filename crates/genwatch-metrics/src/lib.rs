//! ---
//! gw_section: "04-metrics"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Metrics collection and export utilities."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use chrono::{DateTime, Utc};
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use genwatch_engine::aggregate::StatusObserver;
use genwatch_engine::model::EngineState;
use genwatch_engine::EvalSummary;

/// Shared Prometheus registry used across the daemon.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let addr = std_listener
        .local_addr()
        .context("failed to resolve bound metrics address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %addr, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

/// Prometheus scrape endpoint. Returns `text/plain` metrics even on large registries.
async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_str(encoder.format_type())
                    .expect("prometheus format type is a valid header value"),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("metrics encoding error"),
            )
                .into_response()
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Return the bound address for convenience.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Metrics recorded by the daemon process itself.
#[derive(Clone)]
pub struct DaemonMetrics {
    registry: SharedRegistry,
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "genwatchd_starts_total",
            "Total number of times the GenWatch daemon has initialised",
        ))?;
        registry.register(Box::new(starts_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "genwatchd_config_load_seconds",
                "Time spent loading and validating configuration",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(config_load_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new(
                "genwatchd_build_info",
                "Build metadata for the running daemon binary",
            ),
            &["version", "git_sha", "profile"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, git_sha: &str, profile: &str) {
        self.build_info
            .with_label_values(&[version, git_sha, profile])
            .set(1.0);
    }
}

const ENGINE_STATES: [EngineState; 4] = [
    EngineState::Running,
    EngineState::Warning,
    EngineState::Alarm,
    EngineState::Shutdown,
];

/// Per-reading evaluation metrics, fed by the monitor runtime through the
/// [`StatusObserver`] hook.
#[derive(Clone)]
pub struct MonitorMetrics {
    registry: SharedRegistry,
    readings_total: IntCounter,
    engine_state: IntGaugeVec,
    active_alarms: IntGauge,
    flagged_cylinders: IntGauge,
    param_value: GaugeVec,
    param_severity: IntGaugeVec,
}

impl MonitorMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let readings_total = IntCounter::with_opts(Opts::new(
            "genwatch_readings_total",
            "Total readings evaluated by the monitor",
        ))?;
        registry.register(Box::new(readings_total.clone()))?;

        let engine_state = IntGaugeVec::new(
            Opts::new(
                "genwatch_engine_state",
                "Indicator (0/1) per overall engine state label",
            ),
            &["state"],
        )?;
        registry.register(Box::new(engine_state.clone()))?;

        let active_alarms = IntGauge::with_opts(Opts::new(
            "genwatch_active_alarms",
            "Entries in the active alarm log for the latest reading",
        ))?;
        registry.register(Box::new(active_alarms.clone()))?;

        let flagged_cylinders = IntGauge::with_opts(Opts::new(
            "genwatch_flagged_cylinders",
            "Cylinders whose exhaust temperature deviates beyond the limit",
        ))?;
        registry.register(Box::new(flagged_cylinders.clone()))?;

        let param_value = GaugeVec::new(
            Opts::new(
                "genwatch_param_value",
                "Latest observed value per monitored channel",
            ),
            &["key"],
        )?;
        registry.register(Box::new(param_value.clone()))?;

        let param_severity = IntGaugeVec::new(
            Opts::new(
                "genwatch_param_severity",
                "Severity rank per channel (0 unknown, 1 normal, 2 warn, 3 alarm, 4 shutdown)",
            ),
            &["key"],
        )?;
        registry.register(Box::new(param_severity.clone()))?;

        Ok(Self {
            registry,
            readings_total,
            engine_state,
            active_alarms,
            flagged_cylinders,
            param_value,
            param_severity,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn set_state(&self, state: EngineState) {
        for candidate in ENGINE_STATES {
            let active = candidate == state;
            self.engine_state
                .with_label_values(&[candidate.to_string().as_str()])
                .set(if active { 1 } else { 0 });
        }
    }

    pub fn record_evaluation(&self, summary: &EvalSummary) {
        self.readings_total.inc();
        self.active_alarms.set(summary.alarms.len() as i64);
        let flagged = summary
            .deviation
            .as_ref()
            .map(|report| report.flagged().count())
            .unwrap_or(0);
        self.flagged_cylinders.set(flagged as i64);
        for (key, tier) in &summary.tiers {
            self.param_severity
                .with_label_values(&[key.as_str()])
                .set(*tier as i64);
        }
    }

    pub fn set_param_value(&self, key: &str, value: f64) {
        self.param_value.with_label_values(&[key]).set(value);
    }
}

impl StatusObserver for MonitorMetrics {
    fn on_status(&self, state: EngineState, _at: DateTime<Utc>) {
        self.set_state(state);
    }

    fn on_evaluation(&self, summary: &EvalSummary) {
        self.record_evaluation(summary);
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;

    use genwatch_engine::model::Reading;
    use genwatch_engine::registry::Registry as ParamRegistry;
    use genwatch_engine::evaluate;

    #[test]
    fn monitor_metrics_track_the_latest_evaluation() {
        let registry = new_registry();
        let metrics = MonitorMetrics::new(registry.clone()).unwrap();
        let params = ParamRegistry::man_6l23_30h();
        let mut reading = Reading::now();
        for def in params.iter() {
            reading = reading.with_value(def.key.clone(), def.nominal);
        }
        let reading = reading.with_value("oil_mist_level_pct", 85.0);
        let summary = evaluate(&params, &reading);

        metrics.on_status(summary.state, summary.timestamp);
        metrics.on_evaluation(&summary);

        let families = registry.gather();
        let state = families
            .iter()
            .find(|family| family.get_name() == "genwatch_engine_state")
            .expect("engine state family");
        let shutdown = state
            .get_metric()
            .iter()
            .find(|metric| metric.get_label()[0].get_value() == "SHUTDOWN")
            .expect("shutdown label");
        assert_eq!(shutdown.get_gauge().get_value(), 1.0);

        let alarms = families
            .iter()
            .find(|family| family.get_name() == "genwatch_active_alarms")
            .expect("alarm gauge family");
        assert_eq!(alarms.get_metric()[0].get_gauge().get_value(), 1.0);
    }

    #[test]
    fn readings_counter_accumulates() {
        let registry = new_registry();
        let metrics = MonitorMetrics::new(registry.clone()).unwrap();
        let params = ParamRegistry::man_6l23_30h();
        let reading = Reading::now().with_value("engine_speed_rpm", 720.0);
        let summary = evaluate(&params, &reading);
        metrics.on_evaluation(&summary);
        metrics.on_evaluation(&summary);

        let families = registry.gather();
        let total = families
            .iter()
            .find(|family| family.get_name() == "genwatch_readings_total")
            .expect("counter family");
        assert_eq!(total.get_metric()[0].get_counter().get_value(), 2.0);
    }

    #[tokio::test]
    async fn http_server_serves_and_shuts_down() {
        let registry = new_registry();
        let metrics = DaemonMetrics::new(registry.clone()).unwrap();
        metrics.inc_start();
        let server =
            spawn_http_server(registry, "127.0.0.1:0".parse().unwrap()).expect("server spawns");
        assert_ne!(server.addr().port(), 0);
        server.shutdown().await.expect("clean shutdown");
    }
}
