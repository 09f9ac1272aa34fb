//! ---
//! gw_section: "03-simulation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation feed: synthetic readings, fault injection, scenario replay."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

use crate::errors::{Result, SimError};

/// Fuel in use by the simulated engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FuelType {
    #[default]
    Mdo,
    Mgo,
    Hfo,
}

/// Injected fault scenario shaping the synthetic readings.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FaultMode {
    #[default]
    None,
    FouledInjectorCyl3,
    LubeOilDegradation,
    CoolingWaterLeak,
    TurbochargerFouling,
    Overload,
}

/// Parameter simulation control surface, mirroring the control record the
/// operator tooling uploads.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimControls {
    pub engine_speed_setpoint: f64,
    pub load_setpoint_pct: f64,
    pub ambient_temp_c: f64,
    pub fuel_type: FuelType,
    /// Crank-angle degrees relative to the nominal injection timing.
    pub injection_timing_offset: f64,
    /// 1.0 = fresh oil; lower values thin the film and drop the pressure.
    pub lo_degradation_factor: f64,
    /// 1.0 = clean coolers; lower values run the HT circuit hotter.
    pub cooling_efficiency_factor: f64,
    /// 0.0 = clean turbocharger; higher values choke the charge air path.
    pub tc_fouling_factor: f64,
    pub fault_inject: FaultMode,
    #[serde(rename = "simulation_interval_s")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,
    pub running: bool,
}

impl Default for SimControls {
    fn default() -> Self {
        Self {
            engine_speed_setpoint: 720.0,
            load_setpoint_pct: 75.0,
            ambient_temp_c: 28.0,
            fuel_type: FuelType::Mdo,
            injection_timing_offset: 0.0,
            lo_degradation_factor: 1.0,
            cooling_efficiency_factor: 1.0,
            tc_fouling_factor: 0.0,
            fault_inject: FaultMode::None,
            tick_interval: Duration::from_secs(2),
            running: false,
        }
    }
}

impl SimControls {
    /// Load fraction relative to 100 % MCR, clamped to the control range.
    pub fn load_fraction(&self) -> f64 {
        (self.load_setpoint_pct / 100.0).clamp(0.0, 1.1)
    }

    /// Set the injected fault from its wire name (e.g. `cooling_water_leak`).
    pub fn with_fault_name(mut self, name: &str) -> Result<Self> {
        self.fault_inject = name
            .parse()
            .map_err(|_| SimError::UnknownFault(name.to_owned()))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn defaults_match_the_control_record() {
        let controls = SimControls::default();
        assert_eq!(controls.engine_speed_setpoint, 720.0);
        assert_eq!(controls.load_setpoint_pct, 75.0);
        assert_eq!(controls.fuel_type, FuelType::Mdo);
        assert_eq!(controls.fault_inject, FaultMode::None);
        assert_eq!(controls.tick_interval, Duration::from_secs(2));
        assert!(!controls.running);
    }

    #[test]
    fn control_record_round_trips_wire_shape() {
        let raw = r#"{
            "engine_speed_setpoint": 720.0,
            "load_setpoint_pct": 75.0,
            "ambient_temp_c": 28.0,
            "fuel_type": "MDO",
            "injection_timing_offset": 0.0,
            "lo_degradation_factor": 1.0,
            "cooling_efficiency_factor": 1.0,
            "tc_fouling_factor": 0.0,
            "fault_inject": "fouled_injector_cyl3",
            "simulation_interval_s": 2,
            "running": true
        }"#;
        let controls: SimControls = serde_json::from_str(raw).unwrap();
        assert_eq!(controls.fault_inject, FaultMode::FouledInjectorCyl3);
        assert!(controls.running);
        let back = serde_json::to_value(&controls).unwrap();
        assert_eq!(back["fuel_type"], "MDO");
        assert_eq!(back["fault_inject"], "fouled_injector_cyl3");
        assert_eq!(back["simulation_interval_s"], 2);
    }

    #[test]
    fn fault_mode_parses_wire_names() {
        assert_eq!(
            FaultMode::from_str("cooling_water_leak").unwrap(),
            FaultMode::CoolingWaterLeak
        );
        assert_eq!(FaultMode::from_str("none").unwrap(), FaultMode::None);
        assert!(FaultMode::from_str("warp_core_breach").is_err());
    }

    #[test]
    fn with_fault_name_reports_unknown_names() {
        let controls = SimControls::default()
            .with_fault_name("turbocharger_fouling")
            .unwrap();
        assert_eq!(controls.fault_inject, FaultMode::TurbochargerFouling);
        assert!(matches!(
            SimControls::default().with_fault_name("warp_core_breach"),
            Err(SimError::UnknownFault(name)) if name == "warp_core_breach"
        ));
    }
}
