//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use crate::classify::classify;
use crate::model::{AlarmRecord, Reading};
use crate::registry::Registry;

/// Assemble the active alarm log for one reading.
///
/// Parameters with a present value whose tier is warn, alarm, or shutdown
/// produce one record each; normal and unknown tiers are excluded. Output
/// order is registry iteration order, not severity order.
pub fn active_alarms(registry: &Registry, reading: &Reading) -> Vec<AlarmRecord> {
    let mut records = Vec::new();
    for def in registry.iter() {
        let Some(value) = reading.value(&def.key) else {
            continue;
        };
        let tier = classify(def, Some(value));
        if !tier.is_active() {
            continue;
        }
        records.push(AlarmRecord {
            tier,
            label: def.label.clone(),
            tag: def.tag.clone(),
            value,
            unit: def.unit.clone(),
            time: reading.timestamp,
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tier;
    use chrono::{TimeZone, Utc};

    #[test]
    fn filters_to_active_tiers_only() {
        let registry = Registry::man_6l23_30h();
        let mut reading = Reading::now();
        for def in registry.iter() {
            reading = reading.with_value(def.key.clone(), def.nominal);
        }
        // One warn, one shutdown, everything else nominal.
        let reading = reading
            .with_value("engine_speed_rpm", 780.0)
            .with_value("oil_mist_level_pct", 85.0);

        let alarms = active_alarms(&registry, &reading);
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].label, "Engine Speed");
        assert_eq!(alarms[0].tier, Tier::Warn);
        assert_eq!(alarms[1].label, "Oil Mist Level");
        assert_eq!(alarms[1].tier, Tier::Shutdown);
    }

    #[test]
    fn order_follows_registry_not_severity() {
        let registry = Registry::man_6l23_30h();
        let reading = Reading::now()
            // Declared later in the registry, but more severe.
            .with_value("oil_mist_level_pct", 85.0)
            // Declared first, least severe.
            .with_value("engine_speed_rpm", 780.0);
        let alarms = active_alarms(&registry, &reading);
        let labels: Vec<&str> = alarms.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["Engine Speed", "Oil Mist Level"]);
    }

    #[test]
    fn records_carry_reading_timestamp_and_metadata() {
        let registry = Registry::man_6l23_30h();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let reading = Reading::new(at).with_value("lo_pressure_after_filter_bar", 2.4);
        let alarms = active_alarms(&registry, &reading);
        assert_eq!(alarms.len(), 1);
        let record = &alarms[0];
        assert_eq!(record.tier, Tier::Shutdown);
        assert_eq!(record.tag.as_deref(), Some("PI 22"));
        assert_eq!(record.unit, "bar");
        assert_eq!(record.value, 2.4);
        assert_eq!(record.time, at);
    }

    #[test]
    fn clear_reading_produces_empty_log() {
        let registry = Registry::man_6l23_30h();
        let reading = Reading::now().with_value("engine_speed_rpm", 720.0);
        assert!(active_alarms(&registry, &reading).is_empty());
    }
}
