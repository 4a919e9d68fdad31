//! Quantized simulation time.
//!
//! Durations are held as an integer number of quanta rather than as raw
//! seconds. A timestep of `0.1` against a `0.02` quantum is stored as `5`,
//! and the simulation clock is `origin + quanta * quantum`, recomputed from
//! integers on every read. Repeated stepping therefore never accumulates
//! the `0.1 * n != expected` drift of summing floats.

use tracing::warn;

use crate::error::{TempoError, TempoResult};

/// Default quantum every timestep is snapped to.
pub const DEFAULT_QUANTUM_S: f64 = 0.02;
/// Smallest supported timestep.
pub const DEFAULT_MIN_TIMESTEP_S: f64 = 0.02;
/// Largest supported timestep.
pub const DEFAULT_MAX_TIMESTEP_S: f64 = 2.0;

// ── TimestepPolicy ────────────────────────────────────────────────────

/// Rules a configured timestep is validated and snapped against.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct TimestepPolicy {
    /// Every timestep is a whole multiple of this.
    pub quantum_s: f64,
    /// Lower clamp bound (inclusive).
    pub min_s: f64,
    /// Upper clamp bound (inclusive).
    pub max_s: f64,
}

impl TimestepPolicy {
    /// Check the policy is usable: positive finite quantum and ordered
    /// bounds with at least one whole multiple of the quantum between them.
    pub fn validate(&self) -> TempoResult<()> {
        self.quanta_range().map(|_| ())
    }

    /// Smallest and largest quanta count inside `[min_s, max_s]`.
    fn quanta_range(&self) -> TempoResult<(u64, u64)> {
        if !self.quantum_s.is_finite() || self.quantum_s <= 0.0 {
            return Err(TempoError::InvalidPolicy(format!(
                "quantum must be positive and finite, got {}",
                self.quantum_s
            )));
        }
        if !self.min_s.is_finite() || !self.max_s.is_finite() || self.min_s > self.max_s {
            return Err(TempoError::InvalidPolicy(format!(
                "range [{}, {}] is not a valid interval",
                self.min_s, self.max_s
            )));
        }
        if self.max_s < self.quantum_s {
            return Err(TempoError::InvalidPolicy(format!(
                "upper bound {} is smaller than the quantum {}",
                self.max_s, self.quantum_s
            )));
        }

        // Bounds that are not quantum multiples shrink inward.
        let min_quanta = (self.min_s / self.quantum_s - 1e-9).ceil().max(1.0) as u64;
        let max_quanta = (self.max_s / self.quantum_s + 1e-9).floor().max(1.0) as u64;
        if min_quanta > max_quanta {
            return Err(TempoError::InvalidPolicy(format!(
                "range [{}, {}] holds no multiple of the quantum {}",
                self.min_s, self.max_s, self.quantum_s
            )));
        }
        Ok((min_quanta, max_quanta))
    }

    /// Clamp `raw` into range and snap it to the quantum.
    ///
    /// Zero, negative and non-finite inputs are configuration errors and
    /// are rejected before any clamping happens.
    pub fn timestep(&self, raw: f64) -> TempoResult<Timestep> {
        let (min_quanta, max_quanta) = self.quanta_range()?;
        if !raw.is_finite() || raw <= 0.0 {
            return Err(TempoError::InvalidTimestep(raw));
        }

        let clamped = raw.clamp(self.min_s, self.max_s);
        if clamped != raw {
            warn!(requested = raw, clamped, "timestep outside supported range");
        }

        // Rounding never leaves the range.
        let quanta = ((clamped / self.quantum_s).round() as u64).clamp(min_quanta, max_quanta);

        Ok(Timestep {
            quanta,
            quantum_s: self.quantum_s,
        })
    }
}

impl Default for TimestepPolicy {
    fn default() -> Self {
        TimestepPolicy {
            quantum_s: DEFAULT_QUANTUM_S,
            min_s: DEFAULT_MIN_TIMESTEP_S,
            max_s: DEFAULT_MAX_TIMESTEP_S,
        }
    }
}

// ── Timestep ──────────────────────────────────────────────────────────

/// A fixed simulation step, stored as a whole number of quanta.
///
/// Only [`TimestepPolicy::timestep`] builds one, so a `Timestep` is always
/// positive, in range, and an exact multiple of its quantum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestep {
    quanta: u64,
    quantum_s: f64,
}

impl Timestep {
    /// Number of quanta in one step.
    #[inline]
    pub fn quanta(self) -> u64 {
        self.quanta
    }

    /// The quantum this step is a multiple of.
    #[inline]
    pub fn quantum(self) -> f64 {
        self.quantum_s
    }

    /// Step length in seconds.
    #[inline]
    pub fn seconds(self) -> f64 {
        self.quanta as f64 * self.quantum_s
    }
}

impl std::fmt::Display for Timestep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.seconds())
    }
}

// ── SimClock ──────────────────────────────────────────────────────────

/// The simulation clock: an origin plus a whole number of elapsed quanta.
///
/// The clock only moves forward, and only by whole timesteps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    origin_s: f64,
    elapsed_quanta: u64,
    quantum_s: f64,
}

impl SimClock {
    /// A clock reading `origin_s`, counting in `quantum_s` increments.
    pub fn starting_at(origin_s: f64, quantum_s: f64) -> Self {
        SimClock {
            origin_s,
            elapsed_quanta: 0,
            quantum_s,
        }
    }

    /// Current reading in seconds.
    #[inline]
    pub fn now(&self) -> f64 {
        self.origin_s + self.elapsed_quanta as f64 * self.quantum_s
    }

    /// The external time the clock was seeded with.
    #[inline]
    pub fn origin(&self) -> f64 {
        self.origin_s
    }

    /// Quanta elapsed since the origin.
    #[inline]
    pub fn elapsed_quanta(&self) -> u64 {
        self.elapsed_quanta
    }

    /// Move forward by one `step`.
    ///
    /// # Panics
    /// Panics if `step` was built against a different quantum, or on
    /// quanta overflow (more than 2^64 quanta, unreachable in practice).
    pub fn advance(&mut self, step: Timestep) -> f64 {
        assert!(
            step.quantum_s == self.quantum_s,
            "timestep quantum {} does not match clock quantum {}",
            step.quantum_s,
            self.quantum_s
        );
        self.elapsed_quanta = self
            .elapsed_quanta
            .checked_add(step.quanta)
            .expect("simulation clock overflow");
        self.now()
    }

    /// Seconds from the current reading to `external_now`. Negative when
    /// the simulation is ahead of the external clock.
    #[inline]
    pub fn lag_behind(&self, external_now: f64) -> f64 {
        external_now - self.now()
    }
}

impl std::fmt::Display for SimClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={:.3}s", self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_quantize_floating_point_hazard() {
        // 0.1 / 0.02 is 4.999999999999999 in f64.
        let step = TimestepPolicy::default().timestep(0.1).unwrap();
        assert_eq!(step.quanta(), 5);
        assert_eq!(step.seconds(), 0.1);
    }

    #[test]
    fn test_quantize_rounds_to_nearest_quantum() {
        let policy = TimestepPolicy::default();
        assert_eq!(policy.timestep(0.029).unwrap().quanta(), 1);
        assert_eq!(policy.timestep(0.031).unwrap().quanta(), 2);
        assert_eq!(policy.timestep(0.5).unwrap().quanta(), 25);
    }

    #[test]
    fn test_timestep_clamped_to_range() {
        let policy = TimestepPolicy::default();
        assert_eq!(policy.timestep(0.001).unwrap().quanta(), 1);
        assert_eq!(policy.timestep(10.0).unwrap().quanta(), 100);
        assert_relative_eq!(policy.timestep(10.0).unwrap().seconds(), 2.0);
    }

    #[test]
    fn test_invalid_timesteps_rejected() {
        let policy = TimestepPolicy::default();
        for raw in [0.0, -0.02, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(policy.timestep(raw), Err(TempoError::InvalidTimestep(_))),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let zero_quantum = TimestepPolicy { quantum_s: 0.0, ..Default::default() };
        assert!(matches!(zero_quantum.validate(), Err(TempoError::InvalidPolicy(_))));

        let inverted = TimestepPolicy { min_s: 1.0, max_s: 0.5, ..Default::default() };
        assert!(matches!(inverted.timestep(0.7), Err(TempoError::InvalidPolicy(_))));

        let tiny_max = TimestepPolicy { quantum_s: 0.1, min_s: 0.01, max_s: 0.05 };
        assert!(tiny_max.validate().is_err());
    }

    #[test]
    fn test_off_grid_bounds_round_inward() {
        let policy = TimestepPolicy { quantum_s: 0.04, min_s: 0.05, max_s: 1.0 };
        let step = policy.timestep(0.05).unwrap();
        assert_eq!(step.quanta(), 2);
        assert!(step.seconds() >= policy.min_s);
        assert_eq!(policy.timestep(0.001).unwrap().quanta(), 2);

        let policy = TimestepPolicy { quantum_s: 0.04, min_s: 0.05, max_s: 0.07 };
        assert!(matches!(policy.validate(), Err(TempoError::InvalidPolicy(_))));
        assert!(matches!(policy.timestep(0.06), Err(TempoError::InvalidPolicy(_))));
    }

    #[test]
    fn test_clock_advances_exactly() {
        let step = TimestepPolicy::default().timestep(0.1).unwrap();
        let mut clock = SimClock::starting_at(0.0, step.quantum());
        for _ in 0..5 {
            clock.advance(step);
        }
        assert_eq!(clock.now(), 0.5);
        assert_eq!(clock.elapsed_quanta(), 25);
    }

    #[test]
    fn test_clock_no_drift_over_many_steps() {
        let step = TimestepPolicy::default().timestep(0.02).unwrap();
        let mut clock = SimClock::starting_at(3.0, step.quantum());
        for _ in 0..50_000 {
            clock.advance(step);
        }
        assert_relative_eq!(clock.now(), 1003.0, max_relative = 1e-15);
    }

    #[test]
    fn test_clock_lag() {
        let step = TimestepPolicy::default().timestep(0.04).unwrap();
        let mut clock = SimClock::starting_at(1.0, step.quantum());
        clock.advance(step);
        assert_relative_eq!(clock.lag_behind(1.1), 0.06, epsilon = 1e-12);
        assert!(clock.lag_behind(1.0) < 0.0);
    }

    #[test]
    #[should_panic(expected = "does not match clock quantum")]
    fn test_clock_rejects_foreign_quantum() {
        let policy = TimestepPolicy { quantum_s: 0.01, min_s: 0.01, max_s: 1.0 };
        let step = policy.timestep(0.05).unwrap();
        let mut clock = SimClock::starting_at(0.0, DEFAULT_QUANTUM_S);
        clock.advance(step);
    }

    #[test]
    fn test_display() {
        let step = TimestepPolicy::default().timestep(0.1).unwrap();
        assert_eq!(step.to_string(), "0.1s");
        let clock = SimClock::starting_at(1.5, DEFAULT_QUANTUM_S);
        assert_eq!(clock.to_string(), "t=1.500s");
    }

    proptest! {
        #[test]
        fn prop_timestep_stays_in_range(raw in 1e-4f64..10.0, quantum in prop::sample::select(vec![0.01, 0.02, 0.03, 0.04])) {
            let policy = TimestepPolicy { quantum_s: quantum, min_s: 0.05, max_s: 1.0 };
            let step = policy.timestep(raw).unwrap();
            prop_assert!(step.seconds() >= policy.min_s - 1e-12);
            prop_assert!(step.seconds() <= policy.max_s + 1e-12);
        }

        #[test]
        fn prop_timestep_requantize_is_stable(raw in 1e-4f64..10.0) {
            let policy = TimestepPolicy::default();
            let first = policy.timestep(raw).unwrap();
            let second = policy.timestep(first.seconds()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
