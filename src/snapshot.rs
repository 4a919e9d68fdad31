//! Owned copies of a tick's results for hand-off and export.
//!
//! The live buffer is only valid until the next tick. Consumers that need
//! to keep a tick's results (plotting, logging, sending over a wire) take a
//! [`BufferSnapshot`], which pairs each column with its channel name.

use crate::buffer::TimeSeriesBuffer;
use crate::schema::ChannelSchema;

/// One named value column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// A detached copy of a [`TimeSeriesBuffer`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferSnapshot {
    pub timestamps: Vec<f64>,
    pub channels: Vec<ChannelSeries>,
}

impl BufferSnapshot {
    /// Copy `buffer`, labelling columns from `schema`.
    ///
    /// Columns without a schema entry (a schema shorter than the buffer)
    /// are labelled by index.
    pub fn capture(schema: &ChannelSchema, buffer: &TimeSeriesBuffer) -> Self {
        let channels = (0..buffer.channel_count())
            .map(|i| ChannelSeries {
                name: schema
                    .name(i)
                    .map_or_else(|| format!("channel {}", i), str::to_string),
                values: buffer.channel(i).map(<[f64]>::to_vec).unwrap_or_default(),
            })
            .collect();

        BufferSnapshot {
            timestamps: buffer.timestamps().to_vec(),
            channels,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns `true` if the snapshot holds no samples.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The column called `name`.
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Export as pretty JSON.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }
}
