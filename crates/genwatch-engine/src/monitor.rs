//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use crate::aggregate::StatusObserver;
use crate::evaluate;
use crate::model::{EngineState, Reading};
use crate::registry::Registry;
use crate::EvalSummary;

/// Readings kept in the recent-history window, matching the trend depth of
/// the operator dashboard.
pub const DEFAULT_HISTORY_WINDOW: usize = 60;

/// Drives evaluation from a stream of readings.
///
/// Each reading is evaluated synchronously and exactly once; observers are
/// notified once per reading. The bounded history window supports trend
/// display only and never influences classification.
pub struct EngineMonitor {
    registry: Arc<Registry>,
    window: usize,
    history: VecDeque<Reading>,
    observers: Vec<Arc<dyn StatusObserver>>,
    last_state: Option<EngineState>,
    readings_seen: u64,
}

impl EngineMonitor {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            window: DEFAULT_HISTORY_WINDOW,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_WINDOW),
            observers: Vec::new(),
            last_state: None,
            readings_seen: 0,
        }
    }

    /// Override the history window depth. A window of zero is clamped to one.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn subscribe(&mut self, observer: Arc<dyn StatusObserver>) {
        self.observers.push(observer);
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Evaluate one reading: update the window, report the mapped state, log
    /// transitions.
    pub fn ingest(&mut self, reading: Reading) -> EvalSummary {
        let summary = evaluate(&self.registry, &reading);
        self.readings_seen += 1;

        while self.history.len() >= self.window {
            self.history.pop_front();
        }
        self.history.push_back(reading);

        match self.last_state {
            Some(previous) if previous == summary.state => {
                debug!(state = %summary.state, alarms = summary.alarms.len(), "reading evaluated");
            }
            previous => {
                info!(
                    state = %summary.state,
                    previous = ?previous.map(|state| state.to_string()),
                    alarms = summary.alarms.len(),
                    at = %summary.timestamp,
                    "engine state transition"
                );
            }
        }
        self.last_state = Some(summary.state);

        for observer in &self.observers {
            observer.on_status(summary.state, summary.timestamp);
            observer.on_evaluation(&summary);
        }
        summary
    }

    /// Consume readings from the acquisition stream until it ends.
    pub async fn run<S>(&mut self, mut readings: S)
    where
        S: Stream<Item = Reading> + Unpin,
    {
        while let Some(reading) = readings.next().await {
            self.ingest(reading);
        }
        info!(readings = self.readings_seen, "reading stream ended");
    }

    /// Recent readings, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Reading> {
        self.history.iter()
    }

    pub fn last_state(&self) -> Option<EngineState> {
        self.last_state
    }

    pub fn readings_seen(&self) -> u64 {
        self.readings_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        reports: Mutex<Vec<(EngineState, chrono::DateTime<Utc>)>>,
    }

    impl StatusObserver for RecordingObserver {
        fn on_status(&self, state: EngineState, at: chrono::DateTime<Utc>) {
            self.reports.lock().unwrap().push((state, at));
        }
    }

    fn monitor() -> EngineMonitor {
        EngineMonitor::new(Arc::new(Registry::man_6l23_30h()))
    }

    #[test]
    fn observer_is_notified_once_per_reading() {
        let mut monitor = monitor();
        let observer = Arc::new(RecordingObserver::default());
        monitor.subscribe(observer.clone());

        monitor.ingest(Reading::now().with_value("engine_speed_rpm", 720.0));
        monitor.ingest(Reading::now().with_value("engine_speed_rpm", 826.0));
        // Duplicate state: still reported, never deduplicated.
        monitor.ingest(Reading::now().with_value("engine_speed_rpm", 830.0));

        let reports = observer.reports.lock().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].0, EngineState::Running);
        assert_eq!(reports[1].0, EngineState::Shutdown);
        assert_eq!(reports[2].0, EngineState::Shutdown);
    }

    #[test]
    fn history_window_is_bounded() {
        let mut monitor = monitor().with_window(3);
        for speed in [700.0, 710.0, 720.0, 730.0, 740.0] {
            monitor.ingest(Reading::now().with_value("engine_speed_rpm", speed));
        }
        let speeds: Vec<f64> = monitor
            .history()
            .filter_map(|r| r.value("engine_speed_rpm"))
            .collect();
        assert_eq!(speeds, vec![720.0, 730.0, 740.0]);
        assert_eq!(monitor.readings_seen(), 5);
    }

    #[test]
    fn last_state_tracks_latest_reading() {
        let mut monitor = monitor();
        assert_eq!(monitor.last_state(), None);
        monitor.ingest(Reading::now().with_value("engine_speed_rpm", 780.0));
        assert_eq!(monitor.last_state(), Some(EngineState::Warning));
        monitor.ingest(Reading::now().with_value("engine_speed_rpm", 720.0));
        assert_eq!(monitor.last_state(), Some(EngineState::Running));
    }

    #[tokio::test]
    async fn run_drains_a_bounded_stream() {
        let mut monitor = monitor();
        let readings = vec![
            Reading::now().with_value("engine_speed_rpm", 720.0),
            Reading::now().with_value("engine_speed_rpm", 725.0),
            Reading::now().with_value("engine_speed_rpm", 730.0),
        ];
        monitor.run(futures::stream::iter(readings)).await;
        assert_eq!(monitor.readings_seen(), 3);
        assert_eq!(monitor.last_state(), Some(EngineState::Running));
    }
}
