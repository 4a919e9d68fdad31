//! Fixed-step scheduler.
//!
//! Converts irregular external elapsed time into a whole number of
//! fixed-size steps and drives an engine one step at a time. The
//! simulation clock moves by one timestep per *attempted* step, whether or
//! not the engine succeeds, so a transient engine failure leaves a gap in
//! the recorded series but never desynchronizes simulated time from
//! external time.

use tracing::{trace, warn};

use crate::engine::SimulationEngine;
use crate::error::TempoResult;
use crate::time::{SimClock, Timestep, TimestepPolicy};

/// Ratios this close to `k + 0.5` are treated as exact ties.
const TIE_TOLERANCE: f64 = 1e-9;

/// Round a non-negative step ratio to the nearest integer, ties to even.
///
/// `0.05 / 0.02` evaluates to `2.5000000000000004`; snapping near-ties
/// first keeps that case on the tie-break rule (2 steps) instead of
/// letting representation error pick 3.
fn round_steps(ratio: f64) -> u64 {
    let floor = ratio.floor();
    let snapped = if ((ratio - floor) - 0.5).abs() <= TIE_TOLERANCE {
        floor + 0.5
    } else {
        ratio
    };
    snapped.round_ties_even() as u64
}

// ── StepOutcome ───────────────────────────────────────────────────────

/// Result of one attempted step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome<'e> {
    /// Simulation clock after the step.
    pub timestamp: f64,
    /// Engine results, or `None` if the engine reported failure.
    pub values: Option<&'e [f64]>,
}

// ── FixedStepScheduler ────────────────────────────────────────────────

/// Owns the quantized timestep and the simulation clock.
#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    policy: TimestepPolicy,
    timestep: Timestep,
    clock: SimClock,
    max_catch_up: Option<u64>,
    steps_attempted: u64,
    steps_failed: u64,
}

impl FixedStepScheduler {
    /// Create a scheduler whose clock reads `start_time`.
    ///
    /// `raw_timestep` is validated, clamped and quantized by `policy`.
    pub fn new(policy: TimestepPolicy, raw_timestep: f64, start_time: f64) -> TempoResult<Self> {
        let timestep = policy.timestep(raw_timestep)?;
        Ok(FixedStepScheduler {
            policy,
            timestep,
            clock: SimClock::starting_at(start_time, timestep.quantum()),
            max_catch_up: None,
            steps_attempted: 0,
            steps_failed: 0,
        })
    }

    /// Cap how many steps a single catch-up may run. `None` is unbounded.
    pub fn with_max_catch_up(mut self, max: Option<u64>) -> Self {
        self.max_catch_up = max;
        self
    }

    /// The current quantized timestep.
    #[inline]
    pub fn timestep(&self) -> Timestep {
        self.timestep
    }

    /// Replace the timestep. The new value is re-quantized by the same
    /// policy and takes effect from the next step.
    pub fn set_timestep(&mut self, raw: f64) -> TempoResult<Timestep> {
        self.timestep = self.policy.timestep(raw)?;
        Ok(self.timestep)
    }

    /// The policy timesteps are snapped against.
    #[inline]
    pub fn policy(&self) -> &TimestepPolicy {
        &self.policy
    }

    /// The simulation clock.
    #[inline]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Current simulation time in seconds.
    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Re-seed the clock at `start_time` and zero the step counters.
    pub fn reset_clock(&mut self, start_time: f64) {
        self.clock = SimClock::starting_at(start_time, self.timestep.quantum());
        self.steps_attempted = 0;
        self.steps_failed = 0;
    }

    /// The configured catch-up cap.
    #[inline]
    pub fn max_catch_up(&self) -> Option<u64> {
        self.max_catch_up
    }

    /// Steps attempted since the clock was last seeded.
    #[inline]
    pub fn steps_attempted(&self) -> u64 {
        self.steps_attempted
    }

    /// Steps whose engine advance failed since the clock was last seeded.
    #[inline]
    pub fn steps_failed(&self) -> u64 {
        self.steps_failed
    }

    /// Number of steps needed to cover `elapsed` seconds:
    /// `round(elapsed / timestep)`, ties to even.
    ///
    /// Returns 0 when `elapsed` is shorter than one timestep, negative, or
    /// not finite.
    pub fn steps_to_catch_up(&self, elapsed: f64) -> u64 {
        if !elapsed.is_finite() {
            warn!(elapsed, "non-finite elapsed time ignored");
            return 0;
        }
        let step = self.timestep.seconds();
        if elapsed < step {
            return 0;
        }
        round_steps(elapsed / step).max(1)
    }

    /// Apply the catch-up cap to `requested` steps.
    pub fn catch_up_budget(&self, requested: u64) -> u64 {
        match self.max_catch_up {
            Some(max) if requested > max => {
                warn!(requested, max, "catch-up capped");
                max
            }
            _ => requested,
        }
    }

    /// Run one step against `engine`.
    ///
    /// The clock advances by one timestep before the engine is asked to
    /// integrate. Results are pulled only if `advance` succeeded.
    pub fn advance_one_step<'e, E>(&mut self, engine: &'e mut E) -> StepOutcome<'e>
    where
        E: SimulationEngine + ?Sized,
    {
        let timestamp = self.clock.advance(self.timestep);
        self.steps_attempted += 1;

        if !engine.advance(self.timestep.seconds()) {
            self.steps_failed += 1;
            trace!(timestamp, "engine step failed");
            return StepOutcome {
                timestamp,
                values: None,
            };
        }

        trace!(timestamp, "engine step");
        StepOutcome {
            timestamp,
            values: Some(engine.pull_results()),
        }
    }
}
