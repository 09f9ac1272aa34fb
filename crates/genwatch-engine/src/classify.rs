//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use crate::model::{ParamDef, Tier};

/// Classify one observed value against a parameter definition.
///
/// Pure function. Rules are evaluated top-down, highest severity first, and
/// the first match wins:
///
/// 1. absent value -> [`Tier::Unknown`]
/// 2. shutdown bound breached (inclusive) -> [`Tier::Shutdown`]
/// 3. alarm bound breached (inclusive) -> [`Tier::Alarm`]
/// 4. inside the normal band (inclusive both ends) -> [`Tier::Normal`]
/// 5. normal band defined but missed -> [`Tier::Warn`]
/// 6. no normal band configured -> [`Tier::Normal`]
pub fn classify(def: &ParamDef, value: Option<f64>) -> Tier {
    let Some(value) = value else {
        return Tier::Unknown;
    };
    if def.shutdown.as_ref().is_some_and(|band| band.breached_by(value)) {
        return Tier::Shutdown;
    }
    if def.alarm.as_ref().is_some_and(|band| band.breached_by(value)) {
        return Tier::Alarm;
    }
    match def.normal {
        Some([low, high]) if value >= low && value <= high => Tier::Normal,
        Some(_) => Tier::Warn,
        // No classification policy: treated as always acceptable.
        None => Tier::Normal,
    }
}
