//! `SyntheticVitalsEngine` — deterministic stand-in for a physiology engine.
//!
//! Produces plausible values for every channel of
//! [`ChannelSchema::pulse_vitals`](crate::schema::ChannelSchema::pulse_vitals)
//! from a small baseline, with seeded noise and optional failure injection.
//! It is a demo and test engine, not a physiology model.

use std::f64::consts::TAU;

use crate::engine::rng::DeterministicRng;
use crate::engine::state::{InitialState, SerializationFormat};
use crate::engine::traits::SimulationEngine;
use crate::error::EngineError;

/// Number of channels the engine publishes (the Pulse vitals layout).
pub const VITALS_CHANNELS: usize = 13;

const BASELINE_FIELDS: usize = 6;

// ── VitalsBaseline ────────────────────────────────────────────────────

/// Resting values the synthetic signals oscillate around.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct VitalsBaseline {
    pub heart_rate_bpm: f64,
    pub respiration_rate_bpm: f64,
    pub mean_arterial_pressure_mmhg: f64,
    pub core_temperature_c: f64,
    pub oxygen_saturation: f64,
    pub blood_volume_ml: f64,
}

impl VitalsBaseline {
    /// Encode as the binary state layout: six little-endian `f64`s in
    /// field order.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.fields().iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Decode the binary state layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        if bytes.len() != BASELINE_FIELDS * 8 {
            return Err(EngineError::MalformedState(format!(
                "binary baseline must be {} bytes, got {}",
                BASELINE_FIELDS * 8,
                bytes.len()
            )));
        }

        let mut fields = [0.0; BASELINE_FIELDS];
        for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *field = f64::from_le_bytes(raw);
        }

        Ok(VitalsBaseline {
            heart_rate_bpm: fields[0],
            respiration_rate_bpm: fields[1],
            mean_arterial_pressure_mmhg: fields[2],
            core_temperature_c: fields[3],
            oxygen_saturation: fields[4],
            blood_volume_ml: fields[5],
        })
    }

    /// Decode either state format.
    pub fn from_state(state: &InitialState) -> Result<Self, EngineError> {
        let baseline = match state.format() {
            SerializationFormat::Binary => Self::from_bytes(state.bytes())?,
            SerializationFormat::Json => Self::from_json(state)?,
        };
        baseline.validate()?;
        Ok(baseline)
    }

    #[cfg(feature = "serialize")]
    fn from_json(state: &InitialState) -> Result<Self, EngineError> {
        serde_json::from_slice(state.bytes()).map_err(|e| EngineError::MalformedState(e.to_string()))
    }

    #[cfg(not(feature = "serialize"))]
    fn from_json(_state: &InitialState) -> Result<Self, EngineError> {
        Err(EngineError::UnsupportedFormat(SerializationFormat::Json))
    }

    fn fields(&self) -> [f64; BASELINE_FIELDS] {
        [
            self.heart_rate_bpm,
            self.respiration_rate_bpm,
            self.mean_arterial_pressure_mmhg,
            self.core_temperature_c,
            self.oxygen_saturation,
            self.blood_volume_ml,
        ]
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.fields().iter().any(|v| !v.is_finite()) {
            return Err(EngineError::Construction("baseline contains non-finite values".into()));
        }
        if self.heart_rate_bpm <= 0.0 || self.respiration_rate_bpm <= 0.0 {
            return Err(EngineError::Construction(
                "heart and respiration rates must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.oxygen_saturation) {
            return Err(EngineError::Construction(format!(
                "oxygen saturation {} is not a fraction",
                self.oxygen_saturation
            )));
        }
        Ok(())
    }
}

impl Default for VitalsBaseline {
    fn default() -> Self {
        VitalsBaseline {
            heart_rate_bpm: 72.0,
            respiration_rate_bpm: 12.0,
            mean_arterial_pressure_mmhg: 93.0,
            core_temperature_c: 37.0,
            oxygen_saturation: 0.97,
            blood_volume_ml: 5000.0,
        }
    }
}

// ── SyntheticVitalsEngine ─────────────────────────────────────────────

/// Deterministic vitals generator implementing [`SimulationEngine`].
#[derive(Debug, Clone)]
pub struct SyntheticVitalsEngine {
    rng: DeterministicRng,
    failure_rate: f64,
    baseline: Option<VitalsBaseline>,
    time_s: f64,
    values: [f64; VITALS_CHANNELS],
}

impl SyntheticVitalsEngine {
    /// A new, uninitialized engine seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        SyntheticVitalsEngine {
            rng: DeterministicRng::new(seed),
            failure_rate: 0.0,
            baseline: None,
            time_s: 0.0,
            values: [0.0; VITALS_CHANNELS],
        }
    }

    /// Make each `advance` fail with probability `rate`.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Engine-internal simulation time.
    pub fn time(&self) -> f64 {
        self.time_s
    }

    /// The loaded baseline, once initialized.
    pub fn baseline(&self) -> Option<&VitalsBaseline> {
        self.baseline.as_ref()
    }

    fn sample(&mut self, b: VitalsBaseline) {
        let t = self.time_s;
        let cardiac_phase = (t * b.heart_rate_bpm / 60.0).fract();
        let breath_phase = (t * b.respiration_rate_bpm / 60.0).fract();

        // QRS spike on a small T wave.
        let qrs = (-((cardiac_phase - 0.2) / 0.015).powi(2)).exp();
        let t_wave = 0.25 * (-((cardiac_phase - 0.45) / 0.06).powi(2)).exp();
        let ecg = qrs + t_wave + self.rng.jitter(0.02);

        let systolic = b.mean_arterial_pressure_mmhg + 27.0;
        let diastolic = b.mean_arterial_pressure_mmhg - 13.0;
        let pulse = 0.5 + 0.5 * (TAU * cardiac_phase).sin();
        let arterial = diastolic + (systolic - diastolic) * pulse;

        let etco2 = 38.0 + self.rng.jitter(0.5);
        let airway_co2 = if breath_phase < 0.4 {
            0.0
        } else {
            etco2 * ((breath_phase - 0.4) / 0.6).sqrt()
        };

        self.values = [
            t,
            ecg,
            b.heart_rate_bpm + self.rng.jitter(0.5),
            arterial,
            b.mean_arterial_pressure_mmhg,
            systolic,
            diastolic,
            (b.oxygen_saturation + self.rng.jitter(0.002)).min(1.0),
            etco2,
            b.respiration_rate_bpm + self.rng.jitter(0.2),
            b.core_temperature_c + self.rng.jitter(0.01),
            airway_co2,
            b.blood_volume_ml,
        ];
    }
}

impl SimulationEngine for SyntheticVitalsEngine {
    fn initialize(&mut self, state: &InitialState, start_time: f64) -> Result<(), EngineError> {
        if self.baseline.is_some() {
            return Err(EngineError::Construction("engine is already initialized".into()));
        }
        let baseline = VitalsBaseline::from_state(state)?;
        self.baseline = Some(baseline);
        self.time_s = start_time;
        Ok(())
    }

    fn advance(&mut self, dt: f64) -> bool {
        let Some(baseline) = self.baseline else {
            return false;
        };
        if !dt.is_finite() || dt <= 0.0 {
            return false;
        }

        self.time_s += dt;
        if self.rng.chance(self.failure_rate) {
            return false;
        }
        self.sample(baseline);
        true
    }

    fn pull_results(&mut self) -> &[f64] {
        &self.values
    }

    fn name(&self) -> &str {
        "synthetic-vitals"
    }
}
