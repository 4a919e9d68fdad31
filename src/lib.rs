//! # Tempo — Fixed-Timestep Simulation Driver
//!
//! Drives an opaque physiology engine forward in fixed, quantized steps in
//! response to irregular external time, and records one multi-channel
//! sample per successful step. A host calls [`Driver::on_tick`] with the
//! time elapsed since the last tick (or [`Driver::on_frame`] with an
//! absolute clock reading) and then reads the tick's results from the
//! [`TimeSeriesBuffer`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │            Driver             │ ← lifecycle, per-tick cycle
//! │  ┌────────────────────────┐  │
//! │  │  FixedStepScheduler     │  │ ← catch-up step count
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ Timestep/SimClock│  │  │ ← integer quanta, no drift
//! │  │  └──────────────────┘  │  │
//! │  └────────────────────────┘  │
//! │  ┌────────────────────────┐  │
//! │  │  TimeSeriesBuffer       │  │ ← one tick's samples
//! │  └────────────────────────┘  │
//! │  ┌────────────────────────┐  │
//! │  │  SimulationEngine       │  │ ← opaque physiology engine
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tempo::{Driver, DriverConfig, InitialState, ScriptedEngine, SerializationFormat};
//!
//! let config = DriverConfig::builder()
//!     .channels(["Heart Rate", "Core Temperature", "Oxygen Saturation"])
//!     .timestep(0.02)
//!     .build()
//!     .unwrap();
//!
//! let mut driver = Driver::new(config);
//! driver.setup().unwrap();
//!
//! let state = InitialState::from_text("{}", SerializationFormat::Json);
//! driver.start(ScriptedEngine::new(3), &state, 0.0).unwrap();
//!
//! // 0.05 s is two and a half steps; the tie rounds to even.
//! driver.on_tick(0.05).unwrap();
//! assert_eq!(driver.buffer().unwrap().len(), 2);
//! ```

pub mod buffer;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod schema;
pub mod snapshot;
pub mod time;

// Re-exports for convenience.
pub use buffer::{Row, Rows, TimeSeriesBuffer};
pub use config::{DriverConfig, DriverConfigBuilder};
pub use driver::{Driver, DriverState, DriverStats, TickReport};
pub use engine::{
    InitialState, ScriptedEngine, SerializationFormat, SimulationEngine, SyntheticVitalsEngine,
    VitalsBaseline,
};
pub use error::{EngineError, TempoError, TempoResult};
pub use scheduler::{FixedStepScheduler, StepOutcome};
pub use schema::ChannelSchema;
pub use snapshot::{BufferSnapshot, ChannelSeries};
pub use time::{SimClock, Timestep, TimestepPolicy};
