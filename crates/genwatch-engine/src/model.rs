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
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Severity tier assigned to one observed parameter value.
///
/// The derived `Ord` is the aggregation order: `Unknown < Normal < Warn <
/// Alarm < Shutdown`.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    /// No reading available for the parameter yet. Distinct from any alarm
    /// tier and never folded into `Normal`.
    #[default]
    Unknown,
    Normal,
    Warn,
    Alarm,
    Shutdown,
}

impl Tier {
    /// Whether the tier belongs in the active alarm log.
    pub fn is_active(self) -> bool {
        matches!(self, Tier::Warn | Tier::Alarm | Tier::Shutdown)
    }

    /// Fixed status palette shared by every view (gauges, cards, cylinder bars).
    pub fn color_hex(self) -> &'static str {
        match self {
            Tier::Unknown => "#4b5563",
            Tier::Normal => "#10b981",
            Tier::Warn => "#f59e0b",
            Tier::Alarm => "#f97316",
            Tier::Shutdown => "#ef4444",
        }
    }
}

/// Overall engine state derived from the worst parameter tier of one reading.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EngineState {
    #[default]
    Running,
    Warning,
    Alarm,
    Shutdown,
}

impl From<Tier> for EngineState {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Unknown | Tier::Normal => EngineState::Running,
            Tier::Warn => EngineState::Warning,
            Tier::Alarm => EngineState::Alarm,
            Tier::Shutdown => EngineState::Shutdown,
        }
    }
}

/// One-sided or two-sided threshold band for alarm and shutdown limits.
///
/// A bound that is `None` simply never fires; comparisons at defined bounds
/// are inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Band {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    /// Cross-cylinder deviation limit, only meaningful on the cylinder
    /// exhaust channels.
    #[serde(default)]
    pub deviation: Option<f64>,
}

impl Band {
    pub fn high(value: f64) -> Self {
        Self {
            high: Some(value),
            ..Self::default()
        }
    }

    pub fn low(value: f64) -> Self {
        Self {
            low: Some(value),
            ..Self::default()
        }
    }

    pub fn low_high(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
            deviation: None,
        }
    }

    pub fn with_deviation(mut self, limit: f64) -> Self {
        self.deviation = Some(limit);
        self
    }

    /// Inclusive breach test on whichever bounds are defined.
    pub fn breached_by(&self, value: f64) -> bool {
        self.high.is_some_and(|high| value >= high) || self.low.is_some_and(|low| value <= low)
    }
}

/// Immutable definition of one monitored measurement channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamDef {
    /// Unique channel identifier used to look up observed values in a reading.
    pub key: String,
    pub label: String,
    pub unit: String,
    /// Instrument tag from the P&I diagram, display-only.
    #[serde(default)]
    pub tag: Option<String>,
    /// Display/normalization bounds for gauge rendering; not alarm bounds.
    pub min: f64,
    pub max: f64,
    /// Closed interval of acceptable values. Absent means the channel has no
    /// classification policy and always reads `Normal`.
    #[serde(default)]
    pub normal: Option<[f64; 2]>,
    #[serde(default)]
    pub alarm: Option<Band>,
    #[serde(default)]
    pub shutdown: Option<Band>,
    /// Fallback display value when no live reading exists.
    pub nominal: f64,
    /// Whether the channel is rendered as a main dashboard gauge.
    #[serde(default)]
    pub gauge: bool,
}

impl ParamDef {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        min: f64,
        max: f64,
        nominal: f64,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            unit: unit.into(),
            tag: None,
            min,
            max,
            normal: None,
            alarm: None,
            shutdown: None,
            nominal,
            gauge: false,
        }
    }

    pub fn normal(mut self, low: f64, high: f64) -> Self {
        self.normal = Some([low, high]);
        self
    }

    pub fn alarm(mut self, band: Band) -> Self {
        self.alarm = Some(band);
        self
    }

    pub fn shutdown(mut self, band: Band) -> Self {
        self.shutdown = Some(band);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn gauge(mut self) -> Self {
        self.gauge = true;
        self
    }

    /// Normalised gauge position in `[0, 1]` for the display bounds.
    /// Absent values park the needle at zero.
    pub fn gauge_fraction(&self, value: Option<f64>) -> f64 {
        let Some(value) = value else { return 0.0 };
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// One timestamped snapshot of observed sensor values, keyed by parameter key.
///
/// Produced by the acquisition side at irregular intervals; consumed once and
/// never mutated. Keys that are absent from the registry are ignored by
/// classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Acquisition timestamp; defaults to the evaluation time when the
    /// source record carries none.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: IndexMap::new(),
        }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn with_value(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Entry in the active alarm log for one breached parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlarmRecord {
    pub tier: Tier,
    pub label: String,
    pub tag: Option<String>,
    pub value: f64,
    pub unit: String,
    pub time: DateTime<Utc>,
}
