//! `SimulationEngine` — the capability interface over an external engine.

use crate::error::EngineError;

use super::state::InitialState;

/// An external, stepwise simulation engine.
///
/// The driver sees an engine only through these three calls. Anything that
/// can satisfy them (an in-process model, an FFI binding, a subprocess
/// bridge) can be driven.
///
/// # Contract
///
/// - `initialize` is called exactly once, before any `advance`.
/// - `advance` integrates forward by exactly `dt` seconds. It reports
///   failure by returning `false`; it must not panic for numerical trouble.
/// - `pull_results` is only called immediately after an `advance` that
///   returned `true`, and returns one value per schema channel.
///
/// # Example
///
/// ```rust
/// use tempo::engine::{InitialState, SimulationEngine};
/// use tempo::error::EngineError;
///
/// struct Constant { values: Vec<f64> }
///
/// impl SimulationEngine for Constant {
///     fn initialize(&mut self, _state: &InitialState, _start_time: f64) -> Result<(), EngineError> {
///         Ok(())
///     }
///     fn advance(&mut self, _dt: f64) -> bool { true }
///     fn pull_results(&mut self) -> &[f64] { &self.values }
/// }
/// ```
pub trait SimulationEngine {
    /// Load the starting state. `start_time` is the external time the
    /// simulation clock is seeded with.
    fn initialize(&mut self, state: &InitialState, start_time: f64) -> Result<(), EngineError>;

    /// Integrate forward by `dt` seconds. `false` means no data this step.
    fn advance(&mut self, dt: f64) -> bool;

    /// Latest channel values, in schema order.
    fn pull_results(&mut self) -> &[f64];

    /// Human-readable identifier for logs.
    fn name(&self) -> &str {
        "engine"
    }
}

impl<E: SimulationEngine + ?Sized> SimulationEngine for Box<E> {
    fn initialize(&mut self, state: &InitialState, start_time: f64) -> Result<(), EngineError> {
        (**self).initialize(state, start_time)
    }

    fn advance(&mut self, dt: f64) -> bool {
        (**self).advance(dt)
    }

    fn pull_results(&mut self) -> &[f64] {
        (**self).pull_results()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<E: SimulationEngine + ?Sized> SimulationEngine for &mut E {
    fn initialize(&mut self, state: &InitialState, start_time: f64) -> Result<(), EngineError> {
        (**self).initialize(state, start_time)
    }

    fn advance(&mut self, dt: f64) -> bool {
        (**self).advance(dt)
    }

    fn pull_results(&mut self) -> &[f64] {
        (**self).pull_results()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
