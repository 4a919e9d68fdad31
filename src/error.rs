//! Structured error types for Tempo.
//!
//! All fallible public APIs return `Result<T, TempoError>`. Configuration
//! and initialization failures are environmental and the caller is expected
//! to handle them; arity and bounds errors indicate a wiring defect and are
//! reported rather than panicked on.

use thiserror::Error;

use crate::driver::DriverState;
use crate::engine::SerializationFormat;

/// Failure reported by a [`SimulationEngine`](crate::engine::SimulationEngine)
/// while loading its initial state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The state blob could not be decoded.
    #[error("malformed initial state: {0}")]
    MalformedState(String),

    /// The engine does not understand the requested serialization format.
    #[error("serialization format {0} is not supported by this engine")]
    UnsupportedFormat(SerializationFormat),

    /// The engine could not be constructed or seeded.
    #[error("engine construction failed: {0}")]
    Construction(String),

    /// The state file could not be read.
    #[error("failed to read initial state: {0}")]
    Io(#[from] std::io::Error),
}

/// The top-level error type for the Tempo driver.
#[derive(Debug, Error)]
pub enum TempoError {
    // ── Configuration errors ──────────────────────────────

    /// The channel schema has no channels.
    #[error("channel schema is empty")]
    EmptySchema,

    /// The same channel name appears twice in the schema.
    #[error("channel {0:?} is declared more than once")]
    DuplicateChannel(String),

    /// The configured timestep is zero, negative or not finite.
    #[error("timestep must be a positive finite number of seconds, got {0}")]
    InvalidTimestep(f64),

    /// The timestep policy itself is inconsistent.
    #[error("invalid timestep policy: {0}")]
    InvalidPolicy(String),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Lifecycle errors ──────────────────────────────────

    /// An entry point was called in a state that does not accept it.
    #[error("cannot {operation} while driver is {actual} (expected {expected})")]
    InvalidState {
        operation: &'static str,
        expected: DriverState,
        actual: DriverState,
    },

    /// The external time used to seed the simulation clock is not finite.
    #[error("start time must be finite, got {0}")]
    InvalidStartTime(f64),

    // ── Engine errors ─────────────────────────────────────

    /// The engine rejected the initial state; the driver stays `Ready`.
    #[error("engine initialization from {format} state failed: {source}")]
    InitializationFailed {
        format: SerializationFormat,
        #[source]
        source: EngineError,
    },

    // ── Buffer errors ─────────────────────────────────────

    /// A sample carried a different number of values than the schema.
    #[error("sample has {actual} values but the schema declares {expected} channels")]
    ArityMismatch { expected: usize, actual: usize },

    /// A sample index outside `[0, len)` was requested.
    #[error("sample index {index} out of range (buffer holds {len} samples)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A channel index outside `[0, channel_count)` was requested.
    #[error("channel index {channel} out of range (schema has {count} channels)")]
    ChannelOutOfRange { channel: usize, count: usize },
}

/// Convenience alias for `Result<T, TempoError>`.
pub type TempoResult<T> = Result<T, TempoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_arity() {
        let e = TempoError::ArityMismatch { expected: 13, actual: 12 };
        let s = e.to_string();
        assert!(s.contains("12 values"));
        assert!(s.contains("13 channels"));
    }

    #[test]
    fn test_error_display_invalid_state() {
        let e = TempoError::InvalidState {
            operation: "tick",
            expected: DriverState::Running,
            actual: DriverState::Ready,
        };
        assert_eq!(e.to_string(), "cannot tick while driver is Ready (expected Running)");
    }

    #[test]
    fn test_initialization_failure_keeps_source() {
        let e = TempoError::InitializationFailed {
            format: SerializationFormat::Json,
            source: EngineError::MalformedState("unexpected end of input".into()),
        };
        assert!(e.to_string().contains("json"));
        let source = std::error::Error::source(&e).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("malformed initial state: unexpected end of input"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(TempoError::EmptySchema);
        assert!(!e.to_string().is_empty());
    }

    #[test]
    fn test_engine_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let e: EngineError = io.into();
        assert!(e.to_string().contains("missing.json"));
    }
}
