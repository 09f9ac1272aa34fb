//! ---
//! gw_section: "06-testing"
//! gw_subsection: "integration-tests"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Integration and validation tests for the GenWatch stack."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use genwatch_engine::model::EngineState;
use genwatch_engine::monitor::EngineMonitor;
use genwatch_engine::registry::Registry;
use genwatch_sim::{replay_stream, ReplayEngine};

fn escalation_scenario() -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".json").unwrap();
    writeln!(
        file,
        "{}",
        r#"[
            {"timestamp":"2024-05-01T08:00:00Z","engine_speed_rpm":720.0,"lo_pressure_after_filter_bar":3.8},
            {"timestamp":"2024-05-01T08:00:02Z","engine_speed_rpm":722.0,"lo_pressure_after_filter_bar":3.05},
            {"timestamp":"2024-05-01T08:00:04Z","engine_speed_rpm":724.0,"lo_pressure_after_filter_bar":2.9},
            {"timestamp":"2024-05-01T08:00:06Z","engine_speed_rpm":725.0,"lo_pressure_after_filter_bar":2.4}
        ]"#
    )
    .unwrap();
    file.flush().unwrap();
    file
}

fn states_for(scenario: &NamedTempFile, ticks: usize) -> Vec<EngineState> {
    let mut replay = ReplayEngine::from_path(scenario.path()).unwrap();
    let registry = Arc::new(Registry::man_6l23_30h());
    let mut monitor = EngineMonitor::new(registry);
    (0..ticks)
        .map(|_| monitor.ingest(replay.next_reading().unwrap()).state)
        .collect()
}

#[test]
fn lube_oil_escalation_walks_the_state_ladder() {
    let scenario = escalation_scenario();
    let states = states_for(&scenario, 4);
    assert_eq!(
        states,
        vec![
            EngineState::Running,
            EngineState::Warning,
            EngineState::Alarm,
            EngineState::Shutdown,
        ]
    );
}

#[test]
fn replay_is_deterministic_across_runs() {
    let scenario = escalation_scenario();
    assert_eq!(states_for(&scenario, 8), states_for(&scenario, 8));
}

#[test]
fn scenario_loops_past_its_end() {
    let scenario = escalation_scenario();
    let states = states_for(&scenario, 5);
    assert_eq!(states[4], states[0]);
}

#[test]
fn multiple_files_form_one_timeline() {
    let first = escalation_scenario();
    let mut second = NamedTempFile::with_suffix(".csv").unwrap();
    writeln!(second, "timestamp,engine_speed_rpm").unwrap();
    writeln!(second, "2024-05-01T08:00:08Z,718.0").unwrap();
    second.flush().unwrap();

    let replay =
        ReplayEngine::from_paths(&[first.path().to_path_buf(), second.path().to_path_buf()])
            .unwrap();
    assert_eq!(replay.len(), 5);
}

#[tokio::test]
async fn replay_stream_drives_the_monitor() {
    use futures::StreamExt;

    let scenario = escalation_scenario();
    let replay = ReplayEngine::from_path(scenario.path()).unwrap();
    let readings = replay_stream(replay, Duration::from_millis(1));

    let registry = Arc::new(Registry::man_6l23_30h());
    let mut monitor = EngineMonitor::new(registry);
    monitor.run(readings.take(4)).await;

    assert_eq!(monitor.readings_seen(), 4);
    assert_eq!(monitor.last_state(), Some(EngineState::Shutdown));
}
