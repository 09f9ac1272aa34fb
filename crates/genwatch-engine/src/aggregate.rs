//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};

use crate::classify::classify;
use crate::model::{EngineState, Reading, Tier};
use crate::registry::Registry;
use crate::EvalSummary;

/// Reduce every classifiable parameter of one reading to the overall engine
/// state.
///
/// Registry keys absent from the reading are skipped entirely; they do not
/// contribute an `unknown` tier to the reduction. When nothing is evaluable
/// the default state is [`EngineState::Running`].
pub fn aggregate(registry: &Registry, reading: &Reading) -> EngineState {
    EngineState::from(worst_tier(registry, reading))
}

/// Maximum-severity tier across the parameters present in the reading.
pub fn worst_tier(registry: &Registry, reading: &Reading) -> Tier {
    let mut worst = Tier::Normal;
    for def in registry.iter() {
        let Some(value) = reading.value(&def.key) else {
            continue;
        };
        worst = worst.max(classify(def, Some(value)));
    }
    worst
}

/// Collaborator notified once per evaluated reading.
///
/// Reports overwrite one another; they are never batched or deduplicated.
pub trait StatusObserver: Send + Sync {
    /// Mapped engine-state label plus the evaluation timestamp.
    fn on_status(&self, state: EngineState, at: DateTime<Utc>);

    /// Optional richer hook carrying the full per-reading evaluation.
    fn on_evaluation(&self, _summary: &EvalSummary) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reading;

    fn all_normal_reading(registry: &Registry) -> Reading {
        let mut reading = Reading::now();
        for def in registry.iter() {
            reading = reading.with_value(def.key.clone(), def.nominal);
        }
        reading
    }

    #[test]
    fn nominal_reading_aggregates_to_running() {
        let registry = Registry::man_6l23_30h();
        let reading = all_normal_reading(&registry);
        assert_eq!(aggregate(&registry, &reading), EngineState::Running);
    }

    #[test]
    fn single_alarm_parameter_dominates() {
        let registry = Registry::man_6l23_30h();
        let reading = all_normal_reading(&registry).with_value("engine_speed_rpm", 820.0);
        assert_eq!(aggregate(&registry, &reading), EngineState::Alarm);
    }

    #[test]
    fn shutdown_outranks_alarm_and_warn() {
        let registry = Registry::man_6l23_30h();
        let reading = all_normal_reading(&registry)
            .with_value("engine_speed_rpm", 780.0)
            .with_value("ht_cw_temp_outlet_c", 91.0)
            .with_value("oil_mist_level_pct", 85.0);
        assert_eq!(worst_tier(&registry, &reading), Tier::Shutdown);
        assert_eq!(aggregate(&registry, &reading), EngineState::Shutdown);
    }

    #[test]
    fn missing_keys_are_skipped_not_unknown() {
        let registry = Registry::man_6l23_30h();
        let reading = Reading::now().with_value("engine_speed_rpm", 720.0);
        assert_eq!(aggregate(&registry, &reading), EngineState::Running);
    }

    #[test]
    fn empty_reading_defaults_to_running() {
        let registry = Registry::man_6l23_30h();
        assert_eq!(aggregate(&registry, &Reading::now()), EngineState::Running);
    }

    #[test]
    fn unregistered_keys_are_ignored() {
        let registry = Registry::man_6l23_30h();
        let reading = Reading::now().with_value("not_a_channel", 1.0e9);
        assert_eq!(aggregate(&registry, &reading), EngineState::Running);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let registry = Registry::man_6l23_30h();
        let reading = all_normal_reading(&registry).with_value("engine_speed_rpm", 826.0);
        assert_eq!(
            aggregate(&registry, &reading),
            aggregate(&registry, &reading)
        );
    }
}
