//! ---
//! gw_section: "02-parameter-evaluation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Status classification and aggregation for the genset monitoring core."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::model::{Band, ParamDef};

/// Number of cylinders on the monitored engine.
pub const CYLINDER_COUNT: usize = 6;

/// Nameplate data for the monitored engine.
/// Source: MAN Energy Solutions L23/30H project guide, Tier II variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSpec {
    pub model: String,
    pub manufacturer: String,
    pub cylinders: usize,
    pub bore_mm: f64,
    pub stroke_mm: f64,
    pub rated_speed_rpm: f64,
    pub rated_power_kw: f64,
    pub mean_piston_speed_ms: f64,
    pub compression_ratio: f64,
    pub firing_order: Vec<usize>,
}

impl EngineSpec {
    pub fn man_6l23_30h() -> Self {
        Self {
            model: "6L23/30H".to_owned(),
            manufacturer: "MAN Energy Solutions".to_owned(),
            cylinders: CYLINDER_COUNT,
            bore_mm: 225.0,
            stroke_mm: 300.0,
            rated_speed_rpm: 720.0,
            rated_power_kw: 780.0,
            mean_piston_speed_ms: 7.2,
            compression_ratio: 14.5,
            firing_order: vec![1, 4, 2, 6, 3, 5],
        }
    }
}

/// Key of the per-cylinder exhaust temperature channel for a 1-based cylinder
/// number.
pub fn cylinder_exhaust_key(cylinder: usize) -> String {
    format!("exh_temp_cyl_{}_c", cylinder)
}

/// Static catalog of monitored measurement channels.
///
/// Constructed once at process start, validated, and shared read-only (via
/// `Arc`) with every consumer. Iteration order is the declaration order and
/// is the contract for alarm-log ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RegistryDoc", into = "RegistryDoc")]
pub struct Registry {
    params: IndexMap<String, ParamDef>,
}

/// On-disk shape of a registry definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryDoc {
    param: Vec<ParamDef>,
}

impl TryFrom<RegistryDoc> for Registry {
    type Error = EngineError;

    fn try_from(doc: RegistryDoc) -> Result<Self> {
        Registry::new(doc.param)
    }
}

impl From<Registry> for RegistryDoc {
    fn from(registry: Registry) -> Self {
        Self {
            param: registry.params.into_values().collect(),
        }
    }
}

impl Registry {
    /// Build a registry from parameter definitions, enforcing the band
    /// nesting invariants for every channel.
    pub fn new(defs: Vec<ParamDef>) -> Result<Self> {
        let mut params = IndexMap::with_capacity(defs.len());
        for def in defs {
            validate_def(&def)?;
            if params.contains_key(&def.key) {
                return Err(EngineError::DuplicateKey(def.key));
            }
            params.insert(def.key.clone(), def);
        }
        Ok(Self { params })
    }

    /// Load a registry definition file (`.toml` or `.json`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let doc: RegistryDoc = toml::from_str(&contents)?;
                Self::try_from(doc)
            }
            Some("json") => {
                let doc: RegistryDoc = serde_json::from_str(&contents)?;
                Self::try_from(doc)
            }
            other => Err(EngineError::UnsupportedFormat(
                other.unwrap_or("<none>").to_owned(),
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamDef> {
        self.params.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamDef> {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Channels rendered as main dashboard gauges.
    pub fn gauge_params(&self) -> impl Iterator<Item = &ParamDef> {
        self.params.values().filter(|def| def.gauge)
    }

    /// The six per-cylinder exhaust temperature definitions, cylinder 1 first.
    pub fn cylinder_exhaust_bank(&self) -> Result<Vec<&ParamDef>> {
        let bank: Vec<&ParamDef> = (1..=CYLINDER_COUNT)
            .filter_map(|cyl| self.params.get(cylinder_exhaust_key(cyl).as_str()))
            .collect();
        if bank.len() != CYLINDER_COUNT {
            return Err(EngineError::MissingCylinderBank);
        }
        Ok(bank)
    }

    /// The built-in MAN 6L23/30H channel catalog.
    ///
    /// Limits follow the engine's operation data & set points sheet
    /// (B 19 00 0, Tier II). Two set points are normalised against that
    /// sheet so the band nesting invariant holds: the LO inlet pressure
    /// alarm/shutdown pair is ordered alarm-first as pressure falls, and the
    /// TC speed normal band tops out at the overspeed alarm.
    pub fn man_6l23_30h() -> Self {
        let mut defs = vec![
            // Speed system
            ParamDef::new("engine_speed_rpm", "Engine Speed", "RPM", 0.0, 900.0, 720.0)
                .normal(700.0, 760.0)
                .alarm(Band::high(815.0))
                .shutdown(Band::high(825.0))
                .gauge(),
            ParamDef::new("tc_speed_rpm", "TC Speed", "RPM", 0.0, 70_000.0, 53_000.0)
                .normal(50_000.0, 55_000.0)
                .alarm(Band::high(55_290.0)),
            // Lubricating oil system
            ParamDef::new("lo_temp_before_cooler_c", "LO Temp (Before Cooler)", "°C", 0.0, 120.0, 68.0)
                .normal(60.0, 75.0)
                .alarm(Band::high(85.0))
                .shutdown(Band::high(95.0))
                .tag("TI 20")
                .gauge(),
            ParamDef::new("lo_temp_after_cooler_c", "LO Temp (Inlet Engine)", "°C", 0.0, 100.0, 55.0)
                .normal(45.0, 65.0)
                .alarm(Band::high(75.0))
                .shutdown(Band::high(85.0))
                .tag("TI 22")
                .gauge(),
            ParamDef::new("lo_pressure_after_filter_bar", "LO Pressure (Inlet Engine)", "bar", 0.0, 7.0, 3.8)
                .normal(3.1, 4.5)
                .alarm(Band::low(3.0))
                .shutdown(Band::low(2.5))
                .tag("PI 22")
                .gauge(),
            ParamDef::new("lo_pressure_drop_filter_bar", "LO Filter ΔP", "bar", 0.0, 2.0, 0.7)
                .normal(0.5, 1.0)
                .alarm(Band::high(1.5))
                .tag("PDI 21-22"),
            ParamDef::new("lo_level_pct", "LO Level", "%", 0.0, 100.0, 65.0)
                .normal(40.0, 90.0)
                .alarm(Band::low_high(20.0, 95.0))
                .tag("LI 25"),
            ParamDef::new("lo_main_bearing_temp_c", "Main Bearing Temp", "°C", 0.0, 120.0, 72.0)
                .normal(60.0, 85.0)
                .alarm(Band::high(95.0))
                .tag("TE 29"),
            // Cooling water, HT circuit
            ParamDef::new("ht_cw_temp_inlet_c", "HT CW Temp (Inlet)", "°C", 0.0, 120.0, 68.0)
                .normal(60.0, 75.0)
                .alarm(Band::high(90.0))
                .tag("TI 10")
                .gauge(),
            ParamDef::new("ht_cw_temp_outlet_c", "HT CW Temp (Outlet)", "°C", 0.0, 120.0, 82.0)
                .normal(70.0, 85.0)
                .alarm(Band::high(90.0))
                .shutdown(Band::high(93.0))
                .tag("TI 12")
                .gauge(),
            ParamDef::new("ht_cw_pressure_inlet_bar", "HT CW Pressure", "bar", 0.0, 6.0, 2.5)
                .normal(1.5, 4.6)
                .alarm(Band::low(0.4))
                .tag("PI 10"),
            ParamDef::new("ht_cw_temp_raise_c", "HT CW ΔT", "°C", 0.0, 20.0, 8.0)
                .normal(5.0, 10.0)
                .alarm(Band::high(12.0))
                .tag("ΔT CYL"),
            // Cooling water, LT circuit
            ParamDef::new("lt_cw_pressure_inlet_bar", "LT CW Pressure", "bar", 0.0, 4.0, 1.8)
                .normal(1.0, 2.5)
                .alarm(Band::low(0.4))
                .tag("PI 01"),
            ParamDef::new("lt_cw_temp_outlet_c", "LT CW Temp (Outlet)", "°C", 0.0, 60.0, 35.0)
                .normal(29.0, 41.0)
                .tag("TI LT"),
            // Exhaust gas system
            ParamDef::new("exh_temp_before_tc_c", "Exh Temp (Before TC)", "°C", 0.0, 700.0, 450.0)
                .normal(425.0, 475.0)
                .alarm(Band::high(550.0))
                .shutdown(Band::high(600.0))
                .tag("TI 62")
                .gauge(),
            ParamDef::new("exh_temp_after_tc_c", "Exh Temp (After TC)", "°C", 0.0, 500.0, 342.0)
                .normal(290.0, 370.0)
                .alarm(Band::high(450.0))
                .tag("TI 61")
                .gauge(),
        ];

        // Individual cylinder exhaust temperatures, TI 60-1 .. TI 60-6.
        const CYL_NOMINALS: [f64; CYLINDER_COUNT] = [370.0, 368.0, 372.0, 365.0, 375.0, 370.0];
        for (idx, nominal) in CYL_NOMINALS.iter().enumerate() {
            let cyl = idx + 1;
            defs.push(
                ParamDef::new(
                    cylinder_exhaust_key(cyl),
                    format!("Exh Cyl #{}", cyl),
                    "°C",
                    200.0,
                    600.0,
                    *nominal,
                )
                .normal(300.0, 415.0)
                .alarm(Band::high(500.0).with_deviation(50.0))
                .tag(format!("TI 60-{}", cyl)),
            );
        }

        defs.extend([
            // Charge air system
            ParamDef::new("charge_air_pressure_bar", "Charge Air Pressure", "bar", 0.0, 4.0, 2.3)
                .normal(2.0, 2.5)
                .alarm(Band::low(1.5))
                .tag("PI 31")
                .gauge(),
            ParamDef::new("charge_air_temp_c", "Charge Air Temp", "°C", 0.0, 100.0, 45.0)
                .normal(35.0, 55.0)
                .alarm(Band::high(65.0))
                .tag("TI 31"),
            // Fuel oil system
            ParamDef::new("fuel_pressure_inlet_bar", "Fuel Oil Pressure", "bar", 0.0, 10.0, 4.0)
                .normal(2.5, 5.0)
                .alarm(Band::low(1.5))
                .tag("PI 40"),
            ParamDef::new("fuel_rack_position_pct", "Fuel Rack Position", "%", 0.0, 100.0, 60.0)
                .normal(20.0, 85.0)
                .alarm(Band::high(95.0))
                .tag("FI 44"),
            // Compressed air system
            ParamDef::new("start_air_pressure_bar", "Start Air Pressure", "bar", 0.0, 35.0, 25.0)
                .normal(7.0, 30.0)
                .alarm(Band::low(7.0))
                .tag("PI 70"),
            // Alternator / electrical
            ParamDef::new("alternator_load_kw", "Generator Load", "kW", 0.0, 900.0, 600.0)
                .normal(0.0, 780.0)
                .alarm(Band::high(810.0))
                .tag("PI 59")
                .gauge(),
            ParamDef::new("alternator_frequency_hz", "Frequency", "Hz", 45.0, 55.0, 50.0)
                .normal(49.5, 50.5)
                .alarm(Band::low_high(48.5, 51.5))
                .tag("FI 59"),
            ParamDef::new("alternator_voltage_v", "Voltage", "V", 0.0, 480.0, 400.0)
                .normal(385.0, 415.0)
                .alarm(Band::low_high(370.0, 420.0))
                .tag("VI 59"),
            ParamDef::new("load_factor_pct", "Load Factor", "%", 0.0, 110.0, 75.0)
                .normal(0.0, 100.0)
                .alarm(Band::high(100.0))
                .tag("LF")
                .gauge(),
            // Crankcase / safety
            ParamDef::new("oil_mist_level_pct", "Oil Mist Level", "%", 0.0, 100.0, 5.0)
                .normal(0.0, 30.0)
                .alarm(Band::high(50.0))
                .shutdown(Band::high(80.0))
                .tag("OMD 92"),
            ParamDef::new("crankcase_pressure_mbar", "Crankcase Pressure", "mbar", -5.0, 20.0, 1.0)
                .normal(-2.0, 5.0)
                .alarm(Band::high(10.0))
                .tag("PI CC"),
            // Ambient
            ParamDef::new("ambient_temp_c", "Ambient Temp", "°C", -10.0, 60.0, 25.0)
                .normal(15.0, 45.0)
                .tag("TI 39"),
            ParamDef::new("scavenge_air_pressure_bar", "Scavenge Air Press", "bar", 0.0, 4.0, 2.1)
                .normal(1.8, 2.5)
                .alarm(Band::low(1.5))
                .tag("PI 32"),
        ]);

        Self::new(defs).expect("built-in catalog satisfies registry invariants")
    }
}

fn validate_def(def: &ParamDef) -> Result<()> {
    let normal = match def.normal {
        Some(normal) => normal,
        None => return Ok(()),
    };
    let [low, high] = normal;
    if !(def.min <= low && low <= high && high <= def.max) {
        return Err(EngineError::NormalOutsideBounds {
            key: def.key.clone(),
            low,
            high,
            min: def.min,
            max: def.max,
        });
    }
    if let Some(alarm) = &def.alarm {
        if let Some(bound) = alarm.high {
            if bound < high {
                return Err(EngineError::AlarmInsideNormal {
                    key: def.key.clone(),
                    bound,
                });
            }
        }
        if let Some(bound) = alarm.low {
            if bound > low {
                return Err(EngineError::AlarmInsideNormal {
                    key: def.key.clone(),
                    bound,
                });
            }
        }
    }
    if let Some(shutdown) = &def.shutdown {
        // Compare against the alarm bound on the same side when one exists,
        // otherwise directly against the normal band.
        if let Some(bound) = shutdown.high {
            let floor = def.alarm.as_ref().and_then(|band| band.high).unwrap_or(high);
            if bound < floor {
                return Err(EngineError::ShutdownInsideAlarm {
                    key: def.key.clone(),
                    bound,
                });
            }
        }
        if let Some(bound) = shutdown.low {
            let ceiling = def.alarm.as_ref().and_then(|band| band.low).unwrap_or(low);
            if bound > ceiling {
                return Err(EngineError::ShutdownInsideAlarm {
                    key: def.key.clone(),
                    bound,
                });
            }
        }
    }
    Ok(())
}
