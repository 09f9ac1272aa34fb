//! ---
//! gw_section: "03-simulation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation feed: synthetic readings, fault injection, scenario replay."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::stream::{self, Stream};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use genwatch_common::time::{jitter_us, monotonic_now};
use genwatch_engine::model::Reading;

use crate::generator::SimulationEngine;
use crate::replay::ReplayEngine;

/// Boxed reading stream consumed by the monitor runtime.
pub type ReadingStream = Pin<Box<dyn Stream<Item = Reading> + Send>>;

/// Drive a synthetic generator on a fixed tick, yielding one reading per tick.
///
/// Tick jitter is logged at debug level so slow hosts are visible in traces.
pub fn generator_stream(engine: SimulationEngine, period: Duration) -> ReadingStream {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Box::pin(stream::unfold(
        (engine, ticker, None::<Instant>),
        move |(mut engine, mut ticker, last)| async move {
            ticker.tick().await;
            let now = monotonic_now();
            if let Some(last) = last {
                debug!(
                    jitter_us = jitter_us(now - last, period),
                    tick = engine.ticks_produced(),
                    "simulation tick"
                );
            }
            let reading = engine.next_reading();
            Some((reading, (engine, ticker, Some(now))))
        },
    ))
}

/// Replay a recorded scenario on a fixed tick. The scenario loops, so the
/// stream never ends on its own.
pub fn replay_stream(replay: ReplayEngine, period: Duration) -> ReadingStream {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Box::pin(stream::unfold(
        (replay, ticker),
        |(mut replay, mut ticker)| async move {
            ticker.tick().await;
            let reading = replay.next_reading()?;
            Some((reading, (replay, ticker)))
        },
    ))
}
