//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
//! Parameter evaluation core for the GenWatch genset monitor.
//!
//! The registry of monitored channels, the per-parameter status classifier,
//! the engine-state aggregator, the cylinder deviation detector, and the
//! monitor runtime that drives them from a stream of readings.

pub mod aggregate;
pub mod alarms;
pub mod classify;
pub mod deviation;
pub mod errors;
pub mod model;
pub mod monitor;
pub mod registry;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::aggregate::worst_tier;
use crate::alarms::active_alarms;
use crate::classify::classify;
use crate::deviation::{detect_deviation, DeviationReport};
use crate::model::{AlarmRecord, EngineState, Reading, Tier};
use crate::registry::Registry;

pub use errors::{EngineError, Result};

/// Complete evaluation of one reading: per-parameter tiers, overall state,
/// active alarms, and the cylinder deviation report.
#[derive(Debug, Clone, Serialize)]
pub struct EvalSummary {
    pub timestamp: DateTime<Utc>,
    pub state: EngineState,
    /// Tier per registry key present in the reading, in registry order.
    pub tiers: IndexMap<String, Tier>,
    pub alarms: Vec<AlarmRecord>,
    /// Absent when the registry carries no cylinder exhaust bank.
    pub deviation: Option<DeviationReport>,
}

/// Evaluate one reading against the registry.
///
/// Pure per-reading computation; identical inputs always produce identical
/// summaries.
pub fn evaluate(registry: &Registry, reading: &Reading) -> EvalSummary {
    let mut tiers = IndexMap::new();
    for def in registry.iter() {
        if let Some(value) = reading.value(&def.key) {
            tiers.insert(def.key.clone(), classify(def, Some(value)));
        }
    }
    EvalSummary {
        timestamp: reading.timestamp,
        state: EngineState::from(worst_tier(registry, reading)),
        tiers,
        alarms: active_alarms(registry, reading),
        deviation: detect_deviation(registry, reading).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_bundles_every_view_of_one_reading() {
        let registry = Registry::man_6l23_30h();
        let mut reading = Reading::now();
        for def in registry.iter() {
            reading = reading.with_value(def.key.clone(), def.nominal);
        }
        let reading = reading.with_value("ht_cw_temp_outlet_c", 91.0);

        let summary = evaluate(&registry, &reading);
        assert_eq!(summary.state, EngineState::Alarm);
        assert_eq!(summary.tiers.len(), registry.len());
        assert_eq!(
            summary.tiers.get("ht_cw_temp_outlet_c"),
            Some(&Tier::Alarm)
        );
        assert_eq!(summary.alarms.len(), 1);
        assert!(summary.deviation.is_some());
        assert_eq!(summary.timestamp, reading.timestamp);
    }

    #[test]
    fn partial_reading_only_scores_present_keys() {
        let registry = Registry::man_6l23_30h();
        let reading = Reading::now().with_value("engine_speed_rpm", 730.0);
        let summary = evaluate(&registry, &reading);
        assert_eq!(summary.tiers.len(), 1);
        assert_eq!(summary.state, EngineState::Running);
        assert!(summary.alarms.is_empty());
    }
}
