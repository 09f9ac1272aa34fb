//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use serde::Serialize;

use crate::errors::Result;
use crate::model::Reading;
use crate::registry::{Registry, CYLINDER_COUNT};

/// Deviation limit applied when a cylinder channel does not carry its own
/// `alarm.deviation` threshold, in the channel unit (°C).
pub const DEFAULT_DEVIATION_LIMIT: f64 = 50.0;

/// Divergence of one cylinder's exhaust temperature from the bank mean.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct CylinderDeviation {
    /// 1-based cylinder number.
    pub cylinder: usize,
    /// Observed value, or the cylinder's nominal when the reading had none.
    pub value: f64,
    /// Absolute difference from the bank mean.
    pub deviation: f64,
    /// Whether the deviation strictly exceeds the limit.
    pub flagged: bool,
}

/// Cross-cylinder deviation report for one reading. Advisory only; never
/// feeds the engine-state aggregation.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct DeviationReport {
    pub mean: f64,
    pub cylinders: Vec<CylinderDeviation>,
}

impl DeviationReport {
    pub fn flagged(&self) -> impl Iterator<Item = &CylinderDeviation> {
        self.cylinders.iter().filter(|cyl| cyl.flagged)
    }

    pub fn any_flagged(&self) -> bool {
        self.cylinders.iter().any(|cyl| cyl.flagged)
    }
}

/// Compare each cylinder exhaust temperature against the bank mean.
///
/// Missing values substitute the cylinder's nominal before the mean is taken.
/// The mean is untrimmed: an outlier pulls the mean toward itself, which can
/// mask a second outlier on the same side.
pub fn detect_deviation(registry: &Registry, reading: &Reading) -> Result<DeviationReport> {
    let bank = registry.cylinder_exhaust_bank()?;
    let values: Vec<f64> = bank
        .iter()
        .map(|def| reading.value(&def.key).unwrap_or(def.nominal))
        .collect();
    let mean = values.iter().sum::<f64>() / CYLINDER_COUNT as f64;

    let cylinders = bank
        .iter()
        .zip(values.iter())
        .enumerate()
        .map(|(idx, (def, value))| {
            let deviation = (value - mean).abs();
            let limit = def
                .alarm
                .as_ref()
                .and_then(|band| band.deviation)
                .unwrap_or(DEFAULT_DEVIATION_LIMIT);
            CylinderDeviation {
                cylinder: idx + 1,
                value: *value,
                deviation,
                flagged: deviation > limit,
            }
        })
        .collect();

    Ok(DeviationReport { mean, cylinders })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reading;
    use crate::registry::cylinder_exhaust_key;

    fn bank_reading(values: [f64; CYLINDER_COUNT]) -> Reading {
        let mut reading = Reading::now();
        for (idx, value) in values.iter().enumerate() {
            reading = reading.with_value(cylinder_exhaust_key(idx + 1), *value);
        }
        reading
    }

    #[test]
    fn outlier_cylinder_is_flagged() {
        let registry = Registry::man_6l23_30h();
        let reading = bank_reading([370.0, 368.0, 372.0, 365.0, 480.0, 370.0]);
        let report = detect_deviation(&registry, &reading).unwrap();
        assert!((report.mean - 387.5).abs() < 1e-9);
        let flagged: Vec<usize> = report.flagged().map(|cyl| cyl.cylinder).collect();
        assert_eq!(flagged, vec![5]);
        assert!(report.cylinders[4].deviation > 50.0);
    }

    #[test]
    fn moderate_spread_is_not_flagged() {
        let registry = Registry::man_6l23_30h();
        let reading = bank_reading([415.0, 415.0, 415.0, 415.0, 415.0, 366.0]);
        let report = detect_deviation(&registry, &reading).unwrap();
        // Cylinder 6 sits ~40.8 below the mean, under the 50 limit.
        assert!(!report.any_flagged());
        assert!(report.cylinders[5].deviation < 50.0);
    }

    #[test]
    fn deviation_of_exactly_fifty_is_not_flagged() {
        let registry = Registry::man_6l23_30h();
        let reading = bank_reading([400.0, 400.0, 400.0, 400.0, 400.0, 460.0]);
        let report = detect_deviation(&registry, &reading).unwrap();
        assert_eq!(report.mean, 410.0);
        assert_eq!(report.cylinders[5].deviation, 50.0);
        assert!(!report.cylinders[5].flagged);
    }

    #[test]
    fn flag_is_independent_of_the_absolute_band() {
        let registry = Registry::man_6l23_30h();
        // All six values inside the [300, 415] normal band, one diverging.
        let reading = bank_reading([310.0, 405.0, 405.0, 405.0, 405.0, 405.0]);
        let report = detect_deviation(&registry, &reading).unwrap();
        let flagged: Vec<usize> = report.flagged().map(|cyl| cyl.cylinder).collect();
        assert_eq!(flagged, vec![1]);
    }

    #[test]
    fn missing_cylinders_fall_back_to_nominal() {
        let registry = Registry::man_6l23_30h();
        let reading = Reading::now().with_value(cylinder_exhaust_key(1), 370.0);
        let report = detect_deviation(&registry, &reading).unwrap();
        assert_eq!(report.cylinders.len(), CYLINDER_COUNT);
        // Cylinder 2 took its nominal of 368.
        assert_eq!(report.cylinders[1].value, 368.0);
        assert!(!report.any_flagged());
    }
}
