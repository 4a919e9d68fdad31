//! Per-tick result storage.
//!
//! A `TimeSeriesBuffer` holds one timestamp column and one value column
//! per channel. Columns are index-aligned: row `i` is the sample recorded
//! at `timestamps()[i]`. The buffer is cleared at the start of every tick
//! and refilled in place, so its allocations are reused for the whole
//! session.

use crate::error::{TempoError, TempoResult};

// ── TimeSeriesBuffer ──────────────────────────────────────────────────

/// Column-oriented, clear-on-demand sample storage.
///
/// All `channel_count + 1` columns have the same length at every point a
/// caller can observe: [`append`](Self::append) validates before writing
/// anything, so a rejected sample leaves the buffer untouched.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    timestamps: Vec<f64>,
    channels: Vec<Vec<f64>>,
}

impl TimeSeriesBuffer {
    /// Allocate an empty buffer for `channel_count` channels.
    pub fn new(channel_count: usize) -> Self {
        TimeSeriesBuffer {
            timestamps: Vec::new(),
            channels: vec![Vec::new(); channel_count],
        }
    }

    /// Allocate an empty buffer with room for `samples` rows per column.
    pub fn with_capacity(channel_count: usize, samples: usize) -> Self {
        TimeSeriesBuffer {
            timestamps: Vec::with_capacity(samples),
            channels: (0..channel_count).map(|_| Vec::with_capacity(samples)).collect(),
        }
    }

    /// Drop every sample; allocated capacity is kept.
    pub fn clear(&mut self) {
        self.timestamps.clear();
        for column in &mut self.channels {
            column.clear();
        }
    }

    /// Record one sample: `timestamp` plus one value per channel.
    ///
    /// Fails with [`TempoError::ArityMismatch`] if `values` does not have
    /// exactly one entry per channel. Nothing is written in that case.
    pub fn append(&mut self, timestamp: f64, values: &[f64]) -> TempoResult<()> {
        if values.len() != self.channels.len() {
            return Err(TempoError::ArityMismatch {
                expected: self.channels.len(),
                actual: values.len(),
            });
        }

        self.timestamps.push(timestamp);
        for (column, &value) in self.channels.iter_mut().zip(values) {
            column.push(value);
        }
        Ok(())
    }

    /// Number of recorded samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns `true` if no samples are recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of value columns.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Rows the timestamp column can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.timestamps.capacity()
    }

    /// Timestamp of sample `index`.
    pub fn timestamp_at(&self, index: usize) -> TempoResult<f64> {
        self.timestamps
            .get(index)
            .copied()
            .ok_or(TempoError::IndexOutOfRange { index, len: self.len() })
    }

    /// Value of `channel` in sample `index`.
    pub fn value_at(&self, channel: usize, index: usize) -> TempoResult<f64> {
        self.channel(channel)?
            .get(index)
            .copied()
            .ok_or(TempoError::IndexOutOfRange { index, len: self.len() })
    }

    /// The whole timestamp column.
    #[inline]
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// The whole value column of `channel`.
    pub fn channel(&self, channel: usize) -> TempoResult<&[f64]> {
        self.channels
            .get(channel)
            .map(Vec::as_slice)
            .ok_or(TempoError::ChannelOutOfRange {
                channel,
                count: self.channels.len(),
            })
    }

    /// Most recent sample as `(timestamp, values)`.
    pub fn last(&self) -> Option<(f64, Vec<f64>)> {
        let index = self.len().checked_sub(1)?;
        let values = self.channels.iter().map(|column| column[index]).collect();
        Some((self.timestamps[index], values))
    }

    /// Iterate over rows in recording order.
    pub fn rows(&self) -> Rows<'_> {
        Rows { buffer: self, next: 0 }
    }
}

// ── Row iteration ─────────────────────────────────────────────────────

/// One recorded sample, borrowed from a [`TimeSeriesBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    buffer: &'a TimeSeriesBuffer,
    index: usize,
}

impl<'a> Row<'a> {
    /// Position of this row in the buffer.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Timestamp of this row.
    pub fn timestamp(&self) -> f64 {
        self.buffer.timestamps[self.index]
    }

    /// Value of `channel` in this row, if the channel exists.
    pub fn value(&self, channel: usize) -> Option<f64> {
        self.buffer.channels.get(channel).map(|column| column[self.index])
    }

    /// All channel values of this row, in schema order.
    pub fn values(&self) -> impl Iterator<Item = f64> + 'a {
        let (buffer, index) = (self.buffer, self.index);
        buffer.channels.iter().map(move |column| column[index])
    }
}

/// Iterator returned by [`TimeSeriesBuffer::rows`].
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    buffer: &'a TimeSeriesBuffer,
    next: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Row<'a>> {
        if self.next >= self.buffer.len() {
            return None;
        }
        let row = Row {
            buffer: self.buffer,
            index: self.next,
        };
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}
