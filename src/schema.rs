//! The fixed, ordered set of named output channels.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{TempoError, TempoResult};

/// Channels produced by the Pulse vitals data request, in engine order.
const PULSE_VITALS: [&str; 13] = [
    "Simulation Time (s)",
    "ECG Signal (mV)",
    "Heart Rate (1/min)",
    "Arterial Blood Pressure (mmHg)",
    "Mean Arterial Blood Pressure (mmHg)",
    "Systolic Arterial Blood Pressure (mmHg)",
    "Diastolic Arterial Blood Pressure (mmHg)",
    "Oxygen Saturation",
    "End Tidal Carbon Dioxide (mmHg)",
    "Respiration Rate (1/min)",
    "Core Temperature (degC)",
    "Airway Carbon Dioxide (mmHg)",
    "Blood Volume (mL)",
];

/// An ordered, immutable list of channel names.
///
/// Index `i` of every buffer row and every engine result refers to
/// `names()[i]`. The names are shared behind an `Arc`, so cloning a schema
/// to hand it to several drivers or consumers does not copy them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<String>", into = "Vec<String>")
)]
pub struct ChannelSchema {
    names: Arc<[String]>,
}

impl ChannelSchema {
    /// Build a schema from an ordered list of names.
    ///
    /// Fails with [`TempoError::EmptySchema`] when no names are given and
    /// [`TempoError::DuplicateChannel`] when a name repeats.
    pub fn new<I, S>(names: I) -> TempoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(TempoError::EmptySchema);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(TempoError::DuplicateChannel(name.clone()));
            }
        }

        Ok(ChannelSchema { names: names.into() })
    }

    /// The vitals channel set the Pulse engine driver requests by default.
    pub fn pulse_vitals() -> Self {
        ChannelSchema {
            names: PULSE_VITALS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Channel names in index order.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of channels (`N`).
    #[inline]
    pub fn count(&self) -> usize {
        self.names.len()
    }

    /// Name of channel `index`, if it exists.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Index of the channel called `name`, if any.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl Default for ChannelSchema {
    fn default() -> Self {
        Self::pulse_vitals()
    }
}

impl TryFrom<Vec<String>> for ChannelSchema {
    type Error = TempoError;

    fn try_from(names: Vec<String>) -> TempoResult<Self> {
        ChannelSchema::new(names)
    }
}

impl From<ChannelSchema> for Vec<String> {
    fn from(schema: ChannelSchema) -> Self {
        schema.names.to_vec()
    }
}

impl std::fmt::Display for ChannelSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}
