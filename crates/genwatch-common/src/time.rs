//! ---
//! gw_section: "01-shared-runtime"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Shared primitives and utilities for the monitor runtime."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

/// Capture an instant suitable for tick-loop comparisons.
pub fn monotonic_now() -> Instant {
    Instant::now()
}

/// Signed difference between an actual and expected tick period, in
/// microseconds.
pub fn jitter_us(actual: Duration, expected: Duration) -> i64 {
    let actual_us = actual.as_secs_f64() * 1_000_000.0;
    let expected_us = expected.as_secs_f64() * 1_000_000.0;
    (actual_us - expected_us).round() as i64
}
