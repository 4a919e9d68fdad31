//! The simulation-engine boundary.
//!
//! The physiology engine is opaque to the driver: it is reached only
//! through the [`SimulationEngine`] capability trait.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`traits`] | [`SimulationEngine`] trait |
//! | [`state`] | [`InitialState`], [`SerializationFormat`] |
//! | [`rng`] | [`DeterministicRng`] used by the built-in engines |
//! | [`builtin`] | [`ScriptedEngine`], [`SyntheticVitalsEngine`] |

pub mod builtin;
pub mod rng;
pub mod state;
pub mod traits;

pub use builtin::{ScriptedEngine, SyntheticVitalsEngine, VitalsBaseline};
pub use rng::DeterministicRng;
pub use state::{InitialState, SerializationFormat};
pub use traits::SimulationEngine;
