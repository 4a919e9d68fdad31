//! Driver configuration and its fluent builder.
//!
//! ```rust
//! use tempo::config::DriverConfig;
//!
//! let config = DriverConfig::builder()
//!     .channels(["Heart Rate", "Core Temperature"])
//!     .timestep(0.1)
//!     .max_catch_up(Some(50))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.channels.count(), 2);
//! ```

use crate::error::{TempoError, TempoResult};
use crate::schema::ChannelSchema;
use crate::time::{TimestepPolicy, DEFAULT_QUANTUM_S};

// ── DriverConfig ──────────────────────────────────────────────────────

/// Everything the driver needs before `setup`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct DriverConfig {
    /// Output channels, in engine order.
    pub channels: ChannelSchema,
    /// Requested timestep in seconds, before clamping and quantization.
    pub timestep_s: f64,
    /// Range and quantum the timestep is snapped against.
    pub policy: TimestepPolicy,
    /// Upper bound on steps run by one tick. `None` is unbounded.
    pub max_catch_up_steps: Option<u64>,
}

impl DriverConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder::new()
    }

    /// Check the configuration without building anything.
    pub fn validate(&self) -> TempoResult<()> {
        self.policy.timestep(self.timestep_s)?;
        if self.max_catch_up_steps == Some(0) {
            return Err(TempoError::InvalidConfig(
                "max_catch_up_steps must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse a JSON document. Missing fields take their defaults.
    #[cfg(feature = "serialize")]
    pub fn from_json_str(json: &str) -> TempoResult<Self> {
        let config: DriverConfig =
            serde_json::from_str(json).map_err(|e| TempoError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    #[cfg(feature = "serialize")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> TempoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TempoError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            channels: ChannelSchema::pulse_vitals(),
            timestep_s: DEFAULT_QUANTUM_S,
            policy: TimestepPolicy::default(),
            max_catch_up_steps: None,
        }
    }
}

// ── DriverConfigBuilder ───────────────────────────────────────────────

/// Fluent builder for [`DriverConfig`].
///
/// Channel-name errors are held until [`build`](Self::build) so calls can
/// be chained.
#[derive(Debug)]
pub struct DriverConfigBuilder {
    channels: TempoResult<ChannelSchema>,
    timestep_s: f64,
    policy: TimestepPolicy,
    max_catch_up_steps: Option<u64>,
}

impl DriverConfigBuilder {
    /// A builder holding the default configuration.
    pub fn new() -> Self {
        let defaults = DriverConfig::default();
        DriverConfigBuilder {
            channels: Ok(defaults.channels),
            timestep_s: defaults.timestep_s,
            policy: defaults.policy,
            max_catch_up_steps: defaults.max_catch_up_steps,
        }
    }

    /// Use these channel names, in order.
    pub fn channels<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = ChannelSchema::new(names);
        self
    }

    /// Use an existing schema.
    pub fn schema(mut self, schema: ChannelSchema) -> Self {
        self.channels = Ok(schema);
        self
    }

    /// Requested timestep in seconds.
    pub fn timestep(mut self, seconds: f64) -> Self {
        self.timestep_s = seconds;
        self
    }

    /// Quantum every timestep is snapped to.
    pub fn quantum(mut self, seconds: f64) -> Self {
        self.policy.quantum_s = seconds;
        self
    }

    /// Supported timestep range.
    pub fn timestep_range(mut self, min_s: f64, max_s: f64) -> Self {
        self.policy.min_s = min_s;
        self.policy.max_s = max_s;
        self
    }

    /// Cap the steps one tick may run.
    pub fn max_catch_up(mut self, steps: Option<u64>) -> Self {
        self.max_catch_up_steps = steps;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> TempoResult<DriverConfig> {
        let config = DriverConfig {
            channels: self.channels?,
            timestep_s: self.timestep_s,
            policy: self.policy,
            max_catch_up_steps: self.max_catch_up_steps,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for DriverConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.channels.count(), 13);
        assert_eq!(config.timestep_s, 0.02);
        assert_eq!(config.max_catch_up_steps, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_builder_overrides() {
        let config = DriverConfig::builder()
            .channels(["a", "b", "c"])
            .timestep(0.5)
            .quantum(0.05)
            .timestep_range(0.05, 1.0)
            .max_catch_up(Some(4))
            .build()
            .unwrap();

        assert_eq!(config.channels.count(), 3);
        assert_eq!(config.policy.quantum_s, 0.05);
        assert_eq!(config.max_catch_up_steps, Some(4));
    }

    #[test]
    fn test_builder_surfaces_schema_errors() {
        let err = DriverConfig::builder().channels(["hr", "hr"]).build().unwrap_err();
        assert!(matches!(err, TempoError::DuplicateChannel(_)));

        let err = DriverConfig::builder().channels(Vec::<String>::new()).build().unwrap_err();
        assert!(matches!(err, TempoError::EmptySchema));
    }

    #[test]
    fn test_builder_surfaces_timestep_errors() {
        let err = DriverConfig::builder().timestep(0.0).build().unwrap_err();
        assert!(matches!(err, TempoError::InvalidTimestep(_)));

        let err = DriverConfig::builder().quantum(-1.0).build().unwrap_err();
        assert!(matches!(err, TempoError::InvalidPolicy(_)));
    }

    #[test]
    fn test_zero_catch_up_rejected() {
        let err = DriverConfig::builder().max_catch_up(Some(0)).build().unwrap_err();
        assert!(matches!(err, TempoError::InvalidConfig(_)));
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_partial_document() {
        let config = DriverConfig::from_json_str(
            r#"{ "channels": ["Heart Rate", "SpO2"], "timestep_s": 0.1, "max_catch_up_steps": 10 }"#,
        )
        .unwrap();
        assert_eq!(config.channels.count(), 2);
        assert_eq!(config.timestep_s, 0.1);
        assert_eq!(config.policy, TimestepPolicy::default());
        assert_eq!(config.max_catch_up_steps, Some(10));
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_errors() {
        assert!(matches!(
            DriverConfig::from_json_str("{ not json"),
            Err(TempoError::InvalidConfig(_))
        ));
        assert!(matches!(
            DriverConfig::from_json_str(r#"{ "timestep_s": -0.5 }"#),
            Err(TempoError::InvalidTimestep(_))
        ));
        assert!(DriverConfig::from_json_str(r#"{ "channels": [] }"#).is_err());
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_round_trip() {
        let config = DriverConfig::builder().timestep(0.4).build().unwrap();
        let parsed = DriverConfig::from_json_str(&config.to_json()).unwrap();
        assert_eq!(parsed, config);
    }
}
