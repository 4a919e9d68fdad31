//! Built-in engines — `ScriptedEngine` and `SyntheticVitalsEngine`.
//!
//! Reference implementations of [`SimulationEngine`](crate::engine::SimulationEngine)
//! used by the tests and the demo binary. Real engine bindings live
//! outside this crate.

pub mod scripted;
pub mod synthetic;

pub use scripted::ScriptedEngine;
pub use synthetic::{SyntheticVitalsEngine, VitalsBaseline, VITALS_CHANNELS};
