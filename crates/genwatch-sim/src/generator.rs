//! ---
//! gw_section: "03-simulation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation feed: synthetic readings, fault injection, scenario replay."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::f64::consts::PI;
use std::sync::Arc;

use rand::prelude::*;
use rand_distr::Normal;

use genwatch_engine::model::{ParamDef, Reading};
use genwatch_engine::registry::{cylinder_exhaust_key, Registry, CYLINDER_COUNT};

use crate::controls::{FaultMode, SimControls};

/// Per-channel gaussian noise, as a fraction of the display span.
const NOISE_SPAN_FRACTION: f64 = 0.004;

/// Synthesises full engine readings from a control surface, a seeded RNG,
/// and an optional injected fault.
///
/// Every registered channel gets a value on every tick, so the monitor sees
/// the same reading shape the instrumented engine would produce.
#[derive(Debug)]
pub struct SimulationEngine {
    registry: Arc<Registry>,
    controls: SimControls,
    rng: StdRng,
    noise: Normal<f64>,
    tick: u64,
}

impl SimulationEngine {
    pub fn new(registry: Arc<Registry>, controls: SimControls, seed: u64) -> Self {
        Self {
            registry,
            controls,
            rng: StdRng::seed_from_u64(seed),
            noise: Normal::new(0.0, 1.0).expect("unit sigma is positive"),
            tick: 0,
        }
    }

    pub fn controls(&self) -> &SimControls {
        &self.controls
    }

    /// Replace the control surface mid-run, e.g. on an operator upload.
    pub fn set_controls(&mut self, controls: SimControls) {
        self.controls = controls;
    }

    pub fn ticks_produced(&self) -> u64 {
        self.tick
    }

    /// Produce the next synthetic reading, stamped with the current wall
    /// clock. Deterministic per seed apart from the timestamp.
    pub fn next_reading(&mut self) -> Reading {
        let mut reading = Reading::now();
        let defs: Vec<ParamDef> = self.registry.iter().cloned().collect();
        for def in &defs {
            let target = self.target_value(def);
            let sigma = NOISE_SPAN_FRACTION * (def.max - def.min);
            let value = target + self.noise_sample() * sigma;
            reading.values.insert(def.key.clone(), value);
        }
        self.tick += 1;
        reading
    }

    /// Load fraction after fault shaping. Overload pins the engine above
    /// 100 % MCR regardless of the setpoint, with a slow swell on top.
    fn load_fraction(&self) -> f64 {
        let base = if self.controls.fault_inject == FaultMode::Overload {
            1.05
        } else {
            self.controls.load_fraction()
        };
        let t = self.tick as f64 * self.controls.tick_interval.as_secs_f64();
        (base + 0.01 * (2.0 * PI * t / 300.0).sin()).clamp(0.0, 1.1)
    }

    /// Noise-free target for one channel given controls, load, and fault.
    fn target_value(&self, def: &ParamDef) -> f64 {
        let controls = &self.controls;
        let fault = controls.fault_inject;
        let load = self.load_fraction();
        // Load relative to the 75 % reference point the nominals were taken at.
        let load_bias = load - 0.75;
        let ambient_bias = controls.ambient_temp_c - 28.0;

        let mut value = match def.key.as_str() {
            "engine_speed_rpm" => {
                // Isochronous governor with a small droop under overload.
                let droop = if load > 1.0 { 4.0 * (load - 1.0) / 0.1 } else { 0.0 };
                controls.engine_speed_setpoint - droop
            }
            "tc_speed_rpm" => {
                let base = 53_000.0 * (1.0 + 0.25 * load_bias);
                base * (1.0 - 0.06 * controls.tc_fouling_factor)
            }
            "lo_temp_before_cooler_c" => def.nominal + 10.0 * load_bias + 0.3 * ambient_bias,
            "lo_temp_after_cooler_c" => {
                def.nominal + 8.0 * load_bias + 0.3 * ambient_bias
                    + 10.0 * (1.0 - controls.lo_degradation_factor)
            }
            "lo_pressure_after_filter_bar" => def.nominal * controls.lo_degradation_factor,
            "lo_pressure_drop_filter_bar" => {
                def.nominal + 0.4 * (1.0 - controls.lo_degradation_factor)
            }
            "lo_main_bearing_temp_c" => {
                def.nominal + 9.0 * load_bias + 12.0 * (1.0 - controls.lo_degradation_factor)
            }
            "ht_cw_temp_inlet_c" => def.nominal + 0.4 * ambient_bias,
            "ht_cw_temp_outlet_c" => {
                let raise = self.ht_raise(load);
                def.nominal - 8.0 + raise + 0.4 * ambient_bias
            }
            "ht_cw_temp_raise_c" => self.ht_raise(load),
            "ht_cw_pressure_inlet_bar" => def.nominal,
            "lt_cw_pressure_inlet_bar" => def.nominal,
            "lt_cw_temp_outlet_c" => def.nominal + 0.5 * ambient_bias,
            "exh_temp_before_tc_c" => {
                def.nominal + 110.0 * load_bias + 60.0 * controls.tc_fouling_factor
                    - 4.0 * controls.injection_timing_offset
            }
            "exh_temp_after_tc_c" => {
                def.nominal + 85.0 * load_bias + 25.0 * controls.tc_fouling_factor
                    - 3.0 * controls.injection_timing_offset
            }
            "charge_air_pressure_bar" => {
                (def.nominal * (0.35 + 0.65 * load / 0.75))
                    .min(def.max)
                    * (1.0 - 0.2 * controls.tc_fouling_factor)
            }
            "charge_air_temp_c" => def.nominal + 8.0 * load_bias + 0.5 * ambient_bias,
            "fuel_pressure_inlet_bar" => def.nominal,
            "fuel_rack_position_pct" => (80.0 * load + 4.0 * controls.injection_timing_offset)
                .clamp(0.0, 100.0),
            "start_air_pressure_bar" => def.nominal,
            "alternator_load_kw" => 780.0 * load,
            "alternator_frequency_hz" => controls.engine_speed_setpoint / 720.0 * 50.0,
            "alternator_voltage_v" => def.nominal,
            "load_factor_pct" => 100.0 * load,
            "oil_mist_level_pct" => def.nominal + 6.0 * (1.0 - controls.lo_degradation_factor),
            "crankcase_pressure_mbar" => def.nominal,
            "ambient_temp_c" => controls.ambient_temp_c,
            "scavenge_air_pressure_bar" => {
                def.nominal * (0.4 + 0.6 * load / 0.75) * (1.0 - 0.2 * controls.tc_fouling_factor)
            }
            key => {
                if let Some(cyl) = cylinder_number(key) {
                    self.cylinder_target(def, cyl, load_bias)
                } else {
                    def.nominal
                }
            }
        };

        value = self.apply_fault(def, value, fault);
        value.clamp(def.min, def.max)
    }

    /// Temperature raise across the cylinders, inflated by poor cooling.
    fn ht_raise(&self, load: f64) -> f64 {
        (8.0 + 4.0 * (load - 0.75)) / self.controls.cooling_efficiency_factor.max(0.1)
    }

    fn cylinder_target(&self, def: &ParamDef, cylinder: usize, load_bias: f64) -> f64 {
        let mut value = def.nominal + 100.0 * load_bias - 4.0 * self.controls.injection_timing_offset;
        if self.controls.fault_inject == FaultMode::FouledInjectorCyl3 && cylinder == 3 {
            value += 75.0;
        }
        value
    }

    fn apply_fault(&self, def: &ParamDef, value: f64, fault: FaultMode) -> f64 {
        match (fault, def.key.as_str()) {
            (FaultMode::LubeOilDegradation, "lo_pressure_after_filter_bar") => value * 0.72,
            (FaultMode::LubeOilDegradation, "lo_temp_before_cooler_c")
            | (FaultMode::LubeOilDegradation, "lo_temp_after_cooler_c") => value + 9.0,
            (FaultMode::LubeOilDegradation, "lo_main_bearing_temp_c") => value + 14.0,
            (FaultMode::CoolingWaterLeak, "ht_cw_pressure_inlet_bar") => value - 1.9,
            (FaultMode::CoolingWaterLeak, "ht_cw_temp_outlet_c") => value + 9.0,
            (FaultMode::CoolingWaterLeak, "ht_cw_temp_raise_c") => value + 3.5,
            (FaultMode::TurbochargerFouling, "tc_speed_rpm") => value - 2_500.0,
            (FaultMode::TurbochargerFouling, "charge_air_pressure_bar") => value - 0.5,
            (FaultMode::TurbochargerFouling, "scavenge_air_pressure_bar") => value - 0.4,
            (FaultMode::TurbochargerFouling, "exh_temp_before_tc_c") => value + 45.0,
            (FaultMode::Overload, "fuel_rack_position_pct") => value.max(96.0),
            _ => value,
        }
    }

    fn noise_sample(&mut self) -> f64 {
        self.noise.sample(&mut self.rng)
    }
}

fn cylinder_number(key: &str) -> Option<usize> {
    (1..=CYLINDER_COUNT).find(|cyl| key == cylinder_exhaust_key(*cyl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use genwatch_engine::classify::classify;
    use genwatch_engine::evaluate;
    use genwatch_engine::model::{EngineState, Tier};

    fn engine_with(controls: SimControls, seed: u64) -> SimulationEngine {
        SimulationEngine::new(Arc::new(Registry::man_6l23_30h()), controls, seed)
    }

    #[test]
    fn healthy_controls_keep_every_channel_normal() {
        let mut sim = engine_with(SimControls::default(), 42);
        let registry = Registry::man_6l23_30h();
        for _ in 0..20 {
            let reading = sim.next_reading();
            assert_eq!(reading.values.len(), registry.len());
            let summary = evaluate(&registry, &reading);
            assert_eq!(summary.state, EngineState::Running, "{:?}", summary.alarms);
        }
    }

    #[test]
    fn readings_are_deterministic_per_seed() {
        let mut a = engine_with(SimControls::default(), 7);
        let mut b = engine_with(SimControls::default(), 7);
        let ra = a.next_reading();
        let rb = b.next_reading();
        assert_eq!(ra.values, rb.values);

        let mut c = engine_with(SimControls::default(), 8);
        assert_ne!(c.next_reading().values, ra.values);
    }

    #[test]
    fn fouled_injector_raises_only_cylinder_three() {
        let controls = SimControls {
            fault_inject: FaultMode::FouledInjectorCyl3,
            ..SimControls::default()
        };
        let mut sim = engine_with(controls, 42);
        let reading = sim.next_reading();
        let cyl3 = reading.value(&cylinder_exhaust_key(3)).unwrap();
        let cyl1 = reading.value(&cylinder_exhaust_key(1)).unwrap();
        assert!(cyl3 - cyl1 > 50.0, "cyl3 {cyl3} vs cyl1 {cyl1}");
    }

    #[test]
    fn overload_trips_the_load_factor_alarm() {
        let controls = SimControls {
            fault_inject: FaultMode::Overload,
            ..SimControls::default()
        };
        let mut sim = engine_with(controls, 42);
        let registry = Registry::man_6l23_30h();
        let reading = sim.next_reading();
        let load = reading.value("load_factor_pct").unwrap();
        assert!(load > 100.0, "load factor {load}");
        let def = registry.get("load_factor_pct").unwrap();
        assert_eq!(classify(def, Some(load)), Tier::Alarm);
    }

    #[test]
    fn lube_oil_degradation_drops_inlet_pressure() {
        let healthy = engine_with(SimControls::default(), 5).next_reading();
        let controls = SimControls {
            fault_inject: FaultMode::LubeOilDegradation,
            ..SimControls::default()
        };
        let degraded = engine_with(controls, 5).next_reading();
        let before = healthy.value("lo_pressure_after_filter_bar").unwrap();
        let after = degraded.value("lo_pressure_after_filter_bar").unwrap();
        assert!(after < before * 0.85, "pressure {after} vs {before}");
    }

    #[test]
    fn control_updates_take_effect_on_the_next_tick() {
        let mut sim = engine_with(SimControls::default(), 11);
        let _ = sim.next_reading();
        sim.set_controls(SimControls {
            ambient_temp_c: 45.0,
            ..SimControls::default()
        });
        let reading = sim.next_reading();
        let ambient = reading.value("ambient_temp_c").unwrap();
        assert!((ambient - 45.0).abs() < 2.0, "ambient {ambient}");
        assert_eq!(sim.ticks_produced(), 2);
    }
}
