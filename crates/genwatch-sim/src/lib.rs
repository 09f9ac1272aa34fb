//! ---
//! gw_section: "03-simulation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation feed: synthetic readings, fault injection, scenario replay."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
//! Simulation feed for the GenWatch monitor: a physics-flavoured synthetic
//! reading generator with fault injection, deterministic scenario replay, and
//! the tick-driven streams that feed either into the monitor runtime.

pub mod controls;
pub mod errors;
pub mod generator;
pub mod replay;
pub mod stream;

pub use controls::{FaultMode, FuelType, SimControls};
pub use errors::{Result, SimError};
pub use generator::SimulationEngine;
pub use replay::ReplayEngine;
pub use stream::{generator_stream, replay_stream, ReadingStream};
