//! Fixed-timestep driver.
//!
//! Owns the result buffer, the scheduler and the engine, and runs the
//! per-tick cycle: clear the buffer, work out how many steps the elapsed
//! external time calls for, run them one at a time, and record every
//! successful step. The cycle is synchronous and single-threaded; every
//! mutating entry point takes `&mut self`, so a consumer holding a borrow
//! of the buffer cannot trigger a tick re-entrantly.
//!
//! ```text
//!  Uninitialized ──setup──▶ Ready ──start──▶ Running ──stop──▶ Stopped
//!                             ▲  │             │  ▲
//!                             └──┘ init fails  └──┘ on_tick / on_frame
//! ```

use tracing::{debug, error, info, warn};

use crate::buffer::TimeSeriesBuffer;
use crate::config::DriverConfig;
use crate::engine::{InitialState, SimulationEngine};
use crate::error::{TempoError, TempoResult};
use crate::scheduler::FixedStepScheduler;
use crate::schema::ChannelSchema;
use crate::snapshot::BufferSnapshot;
use crate::time::Timestep;

// ── DriverState ───────────────────────────────────────────────────────

/// Lifecycle state of a [`Driver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DriverState {
    /// Constructed; nothing allocated yet.
    Uninitialized,
    /// Buffer and scheduler allocated; waiting for an engine.
    Ready,
    /// Engine loaded; accepting ticks.
    Running,
    /// Engine released; no further ticks.
    Stopped,
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DriverState::Uninitialized => "Uninitialized",
            DriverState::Ready => "Ready",
            DriverState::Running => "Running",
            DriverState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

// ── Reports ───────────────────────────────────────────────────────────

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TickReport {
    /// Steps the elapsed time called for (`round(elapsed / timestep)`).
    pub requested: u64,
    /// Steps actually attempted (less than `requested` only when capped).
    pub executed: u64,
    /// Samples appended to the buffer.
    pub recorded: usize,
    /// Steps whose engine advance failed.
    pub failed: u64,
    /// Simulation clock after the tick.
    pub simulation_time: f64,
}

/// Totals since the driver was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverStats {
    pub ticks: u64,
    pub steps: u64,
    pub failed_steps: u64,
    pub samples: u64,
    /// Ticks whose catch-up was cut short by `max_catch_up_steps`.
    pub capped_ticks: u64,
}

// ── Driver ────────────────────────────────────────────────────────────

/// Top-level fixed-timestep driver over an engine `E`.
#[derive(Debug)]
pub struct Driver<E> {
    config: DriverConfig,
    state: DriverState,
    buffer: Option<TimeSeriesBuffer>,
    scheduler: Option<FixedStepScheduler>,
    engine: Option<E>,
    stats: DriverStats,
}

impl<E: SimulationEngine> Driver<E> {
    /// Create an uninitialized driver.
    pub fn new(config: DriverConfig) -> Self {
        Driver {
            config,
            state: DriverState::Uninitialized,
            buffer: None,
            scheduler: None,
            engine: None,
            stats: DriverStats::default(),
        }
    }

    /// `Uninitialized → Ready`.
    ///
    /// Validates the configuration, allocates the buffer against the
    /// channel schema and builds the scheduler with the quantized
    /// timestep. On error the driver stays `Uninitialized`.
    pub fn setup(&mut self) -> TempoResult<()> {
        self.expect_state("set up", DriverState::Uninitialized)?;
        self.config.validate()?;

        let scheduler =
            FixedStepScheduler::new(self.config.policy, self.config.timestep_s, 0.0)?
                .with_max_catch_up(self.config.max_catch_up_steps);
        let timestep = scheduler.timestep();

        self.buffer = Some(TimeSeriesBuffer::new(self.config.channels.count()));
        self.scheduler = Some(scheduler);
        self.state = DriverState::Ready;

        info!(
            channels = self.config.channels.count(),
            timestep = %timestep,
            max_catch_up = ?self.config.max_catch_up_steps,
            "driver ready"
        );
        Ok(())
    }

    /// `Ready → Running`.
    ///
    /// Loads `state` into `engine` and seeds the simulation clock with
    /// `start_time`. If the engine rejects the state the engine is dropped,
    /// the error is returned, and the driver stays `Ready` so the caller
    /// can retry with another state.
    pub fn start(&mut self, mut engine: E, state: &InitialState, start_time: f64) -> TempoResult<()> {
        self.expect_state("start", DriverState::Ready)?;
        if !start_time.is_finite() {
            return Err(TempoError::InvalidStartTime(start_time));
        }

        if let Err(source) = engine.initialize(state, start_time) {
            warn!(
                engine = engine.name(),
                format = %state.format(),
                error = %source,
                "engine initialization failed"
            );
            return Err(TempoError::InitializationFailed {
                format: state.format(),
                source,
            });
        }

        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.reset_clock(start_time);
        }
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }

        info!(
            engine = engine.name(),
            format = %state.format(),
            bytes = state.len(),
            start_time,
            "driver running"
        );
        self.engine = Some(engine);
        self.stats = DriverStats::default();
        self.state = DriverState::Running;
        Ok(())
    }

    /// One tick with `elapsed` seconds of external time.
    ///
    /// Clears the buffer, runs `round(elapsed / timestep)` steps (none if
    /// `elapsed` is under one timestep) and appends one sample per
    /// successful step. Failed steps advance the clock but record nothing
    /// and are not reported as errors.
    ///
    /// The only error a running driver returns is
    /// [`TempoError::ArityMismatch`], when the engine publishes a
    /// different number of values than the schema declares.
    pub fn on_tick(&mut self, elapsed: f64) -> TempoResult<TickReport> {
        self.expect_state("tick", DriverState::Running)?;
        let actual = self.state;
        let (Some(scheduler), Some(buffer), Some(engine)) = (
            self.scheduler.as_mut(),
            self.buffer.as_mut(),
            self.engine.as_mut(),
        ) else {
            return Err(TempoError::InvalidState {
                operation: "tick",
                expected: DriverState::Running,
                actual,
            });
        };

        buffer.clear();
        self.stats.ticks += 1;

        let requested = scheduler.steps_to_catch_up(elapsed);
        let budget = scheduler.catch_up_budget(requested);
        if budget < requested {
            self.stats.capped_ticks += 1;
        }

        let mut report = TickReport {
            requested,
            ..TickReport::default()
        };

        for _ in 0..budget {
            let outcome = scheduler.advance_one_step(&mut *engine);
            report.executed += 1;
            self.stats.steps += 1;

            let Some(values) = outcome.values else {
                report.failed += 1;
                self.stats.failed_steps += 1;
                debug!(timestamp = outcome.timestamp, "step failed, no sample recorded");
                continue;
            };

            if let Err(e) = buffer.append(outcome.timestamp, values) {
                error!(error = %e, timestamp = outcome.timestamp, "engine result does not match schema");
                return Err(e);
            }
            report.recorded += 1;
            self.stats.samples += 1;
        }

        report.simulation_time = scheduler.now();
        if report.executed > 0 {
            debug!(
                requested = report.requested,
                executed = report.executed,
                recorded = report.recorded,
                failed = report.failed,
                simulation_time = report.simulation_time,
                "tick"
            );
        }
        Ok(report)
    }

    /// One tick driven by the external clock reading `external_now`.
    ///
    /// Elapsed time is measured from the current simulation clock, so time
    /// left over after whole steps (or steps deferred by the catch-up cap)
    /// is carried into the next frame instead of being lost.
    pub fn on_frame(&mut self, external_now: f64) -> TempoResult<TickReport> {
        self.expect_state("tick", DriverState::Running)?;
        let elapsed = self
            .scheduler
            .as_ref()
            .map_or(0.0, |s| s.clock().lag_behind(external_now));
        self.on_tick(elapsed)
    }

    /// `Running → Stopped` (or `Ready → Stopped`).
    ///
    /// Releases and returns the engine. The last tick's buffer stays
    /// readable.
    pub fn stop(&mut self) -> TempoResult<Option<E>> {
        if !matches!(self.state, DriverState::Ready | DriverState::Running) {
            return Err(TempoError::InvalidState {
                operation: "stop",
                expected: DriverState::Running,
                actual: self.state,
            });
        }

        self.state = DriverState::Stopped;
        info!(
            ticks = self.stats.ticks,
            steps = self.stats.steps,
            failed_steps = self.stats.failed_steps,
            "driver stopped"
        );
        Ok(self.engine.take())
    }

    /// Change the timestep. The value is clamped and quantized like the
    /// configured one and takes effect from the next step.
    pub fn set_timestep(&mut self, raw: f64) -> TempoResult<Timestep> {
        let actual = self.state;
        let Some(scheduler) = self
            .scheduler
            .as_mut()
            .filter(|_| matches!(actual, DriverState::Ready | DriverState::Running))
        else {
            return Err(TempoError::InvalidState {
                operation: "change timestep",
                expected: DriverState::Running,
                actual,
            });
        };

        let timestep = scheduler.set_timestep(raw)?;
        self.config.timestep_s = timestep.seconds();
        info!(requested = raw, timestep = %timestep, "timestep changed");
        Ok(timestep)
    }

    // ── Accessors ─────────────────────────────────────────────

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// The configuration this driver was built with.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The channel schema.
    pub fn schema(&self) -> &ChannelSchema {
        &self.config.channels
    }

    /// Results of the most recent tick. `None` before `setup`.
    pub fn buffer(&self) -> Option<&TimeSeriesBuffer> {
        self.buffer.as_ref()
    }

    /// The quantized timestep. `None` before `setup`.
    pub fn timestep(&self) -> Option<Timestep> {
        self.scheduler.as_ref().map(FixedStepScheduler::timestep)
    }

    /// Current simulation clock. `None` before `setup`.
    pub fn simulation_time(&self) -> Option<f64> {
        self.scheduler.as_ref().map(FixedStepScheduler::now)
    }

    /// Totals since `start`.
    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// The engine, while running.
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Copy the current buffer out together with channel names.
    pub fn snapshot(&self) -> Option<BufferSnapshot> {
        let buffer = self.buffer.as_ref()?;
        Some(BufferSnapshot::capture(&self.config.channels, buffer))
    }

    fn expect_state(&self, operation: &'static str, expected: DriverState) -> TempoResult<()> {
        if self.state != expected {
            return Err(TempoError::InvalidState {
                operation,
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ScriptedEngine, SerializationFormat};

    fn state() -> InitialState {
        InitialState::from_text("{}", SerializationFormat::Json)
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DriverState::Uninitialized.to_string(), "Uninitialized");
        assert_eq!(DriverState::Stopped.to_string(), "Stopped");
    }

    #[test]
    fn test_new_driver_is_uninitialized() {
        let driver: Driver<ScriptedEngine> = Driver::new(DriverConfig::default());
        assert_eq!(driver.state(), DriverState::Uninitialized);
        assert!(driver.buffer().is_none());
        assert!(driver.timestep().is_none());
        assert!(driver.simulation_time().is_none());
        assert!(driver.snapshot().is_none());
    }

    #[test]
    fn test_setup_allocates() {
        let mut driver: Driver<ScriptedEngine> = Driver::new(DriverConfig::default());
        driver.setup().unwrap();
        assert_eq!(driver.state(), DriverState::Ready);
        assert_eq!(driver.buffer().unwrap().channel_count(), 13);
        assert_eq!(driver.timestep().unwrap().quanta(), 1);
    }

    #[test]
    fn test_setup_twice_rejected() {
        let mut driver: Driver<ScriptedEngine> = Driver::new(DriverConfig::default());
        driver.setup().unwrap();
        assert!(matches!(
            driver.setup(),
            Err(TempoError::InvalidState { expected: DriverState::Uninitialized, actual: DriverState::Ready, .. })
        ));
    }

    #[test]
    fn test_setup_rejects_bad_config() {
        let config = DriverConfig {
            timestep_s: -0.1,
            ..DriverConfig::default()
        };
        let mut driver: Driver<ScriptedEngine> = Driver::new(config);
        assert!(matches!(driver.setup(), Err(TempoError::InvalidTimestep(_))));
        assert_eq!(driver.state(), DriverState::Uninitialized);
        assert!(driver.buffer().is_none());
    }

    #[test]
    fn test_tick_before_start_rejected() {
        let mut driver: Driver<ScriptedEngine> = Driver::new(DriverConfig::default());
        assert!(driver.on_tick(0.1).is_err());
        driver.setup().unwrap();
        assert!(matches!(
            driver.on_tick(0.1),
            Err(TempoError::InvalidState { actual: DriverState::Ready, .. })
        ));
    }

    #[test]
    fn test_start_rejects_non_finite_time() {
        let mut driver = Driver::new(DriverConfig::default());
        driver.setup().unwrap();
        let err = driver.start(ScriptedEngine::new(13), &state(), f64::NAN).unwrap_err();
        assert!(matches!(err, TempoError::InvalidStartTime(_)));
        assert_eq!(driver.state(), DriverState::Ready);
    }

    #[test]
    fn test_stop_from_uninitialized_rejected() {
        let mut driver: Driver<ScriptedEngine> = Driver::new(DriverConfig::default());
        assert!(driver.stop().is_err());
    }

    #[test]
    fn test_set_timestep_requires_setup() {
        let mut driver: Driver<ScriptedEngine> = Driver::new(DriverConfig::default());
        assert!(driver.set_timestep(0.1).is_err());
        driver.setup().unwrap();
        let step = driver.set_timestep(0.1).unwrap();
        assert_eq!(step.quanta(), 5);
        assert_eq!(driver.config().timestep_s, 0.1);
    }
}
