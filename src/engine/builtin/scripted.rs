//! `ScriptedEngine` — a recording engine with scripted failures.

use std::collections::BTreeSet;

use crate::engine::state::{InitialState, SerializationFormat};
use crate::engine::traits::SimulationEngine;
use crate::error::EngineError;

/// An engine whose behaviour is fixed up front.
///
/// Every successful advance publishes `[k; channel_count]` where `k` is the
/// 1-based number of that `advance` call, so a recorded sample identifies
/// the step that produced it. Selected calls can be made to fail, and every
/// interaction is recorded for assertions.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    channel_count: usize,
    failing_steps: BTreeSet<u64>,
    accepted_format: Option<SerializationFormat>,
    rejection: Option<String>,
    current: Vec<f64>,
    last_advance_ok: bool,
    /// Every `advance` duration, in call order.
    pub advances: Vec<f64>,
    /// `(format, start_time)` of every `initialize` call.
    pub initializations: Vec<(SerializationFormat, f64)>,
    /// Number of `pull_results` calls.
    pub pulls: u64,
    /// Set if `pull_results` was ever called after a failed advance.
    pub pulled_after_failure: bool,
}

impl ScriptedEngine {
    /// An engine that always succeeds and publishes `channel_count` values.
    pub fn new(channel_count: usize) -> Self {
        ScriptedEngine {
            channel_count,
            failing_steps: BTreeSet::new(),
            accepted_format: None,
            rejection: None,
            current: vec![0.0; channel_count],
            last_advance_ok: false,
            advances: Vec::new(),
            initializations: Vec::new(),
            pulls: 0,
            pulled_after_failure: false,
        }
    }

    /// Make the given 1-based `advance` calls return `false`.
    pub fn fail_on(mut self, steps: impl IntoIterator<Item = u64>) -> Self {
        self.failing_steps.extend(steps);
        self
    }

    /// Reject every initial state with `reason`.
    pub fn rejecting(mut self, reason: &str) -> Self {
        self.rejection = Some(reason.to_string());
        self
    }

    /// Accept only states encoded as `format`.
    pub fn accepting_only(mut self, format: SerializationFormat) -> Self {
        self.accepted_format = Some(format);
        self
    }

    /// Number of `advance` calls so far.
    pub fn advance_count(&self) -> u64 {
        self.advances.len() as u64
    }
}

impl SimulationEngine for ScriptedEngine {
    fn initialize(&mut self, state: &InitialState, start_time: f64) -> Result<(), EngineError> {
        self.initializations.push((state.format(), start_time));

        if let Some(reason) = &self.rejection {
            return Err(EngineError::MalformedState(reason.clone()));
        }
        if let Some(accepted) = self.accepted_format {
            if state.format() != accepted {
                return Err(EngineError::UnsupportedFormat(state.format()));
            }
        }
        Ok(())
    }

    fn advance(&mut self, dt: f64) -> bool {
        self.advances.push(dt);
        let call = self.advance_count();

        self.last_advance_ok = !self.failing_steps.contains(&call);
        if self.last_advance_ok {
            self.current.iter_mut().for_each(|v| *v = call as f64);
        }
        self.last_advance_ok
    }

    fn pull_results(&mut self) -> &[f64] {
        self.pulls += 1;
        if !self.last_advance_ok {
            self.pulled_after_failure = true;
        }
        &self.current
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_failures_and_values() {
        let mut engine = ScriptedEngine::new(2).fail_on([2]);

        assert!(engine.advance(0.02));
        assert_eq!(engine.pull_results(), &[1.0, 1.0]);
        assert!(!engine.advance(0.02));
        assert!(engine.advance(0.02));
        assert_eq!(engine.pull_results(), &[3.0, 3.0]);

        assert_eq!(engine.advances, vec![0.02, 0.02, 0.02]);
        assert_eq!(engine.pulls, 2);
        assert!(!engine.pulled_after_failure);
        assert_eq!(engine.channel_count, 2);
    }

    #[test]
    fn test_rejection_and_format_filter() {
        let json = InitialState::from_text("{}", SerializationFormat::Json);

        let mut rejecting = ScriptedEngine::new(1).rejecting("truncated");
        assert!(matches!(
            rejecting.initialize(&json, 0.0),
            Err(EngineError::MalformedState(reason)) if reason == "truncated"
        ));

        let mut binary_only = ScriptedEngine::new(1).accepting_only(SerializationFormat::Binary);
        assert!(matches!(
            binary_only.initialize(&json, 0.0),
            Err(EngineError::UnsupportedFormat(SerializationFormat::Json))
        ));
        assert_eq!(binary_only.initializations, vec![(SerializationFormat::Json, 0.0)]);
    }
}
