//! Core data model for event-based auditory recordings
//!
//! This module provides the stream containers shared by every tier:
//! - [`SpikeStream`]: parallel address/timestamp arrays with a cached
//!   min/max timestamp
//! - [`LocalizationStream`]: MSO and LSO sub-streams decoded alongside the
//!   audio events of dual-model recordings
//! - [`Side`] and [`Population`] selectors
//!
//! Streams are plain owned values. Operations that rewrite a stream take
//! `&mut SpikeStream`; transforms take `&SpikeStream` and return a new one.

use core::fmt;
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

// ============================================================================
// Events
// ============================================================================

/// A single address-event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpikeEvent {
    /// Channel/polarity/side encoded address
    pub address: i64,
    /// Timestamp (raw ticks before normalization, microseconds after)
    pub timestamp: i64,
}

impl SpikeEvent {
    /// Create a new event.
    #[inline]
    #[must_use]
    pub const fn new(address: i64, timestamp: i64) -> Self {
        Self { address, timestamp }
    }
}

/// Cached extremes of a timestamp array.
///
/// Indices point at the first occurrence of the extreme value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampBounds {
    /// Smallest timestamp
    pub min: i64,
    /// Index of the smallest timestamp
    pub min_index: usize,
    /// Largest timestamp
    pub max: i64,
    /// Index of the largest timestamp
    pub max_index: usize,
}

impl TimestampBounds {
    /// Scan a timestamp array. Returns `None` when it is empty.
    #[must_use]
    pub fn scan(timestamps: &[i64]) -> Option<Self> {
        let (&first, rest) = timestamps.split_first()?;
        let mut bounds = Self { min: first, min_index: 0, max: first, max_index: 0 };
        for (offset, &ts) in rest.iter().enumerate() {
            bounds.include(offset + 1, ts);
        }
        Some(bounds)
    }

    fn include(&mut self, index: usize, ts: i64) {
        if ts < self.min {
            self.min = ts;
            self.min_index = index;
        }
        if ts > self.max {
            self.max = ts;
            self.max_index = index;
        }
    }

    /// Time covered between the extremes.
    #[inline]
    #[must_use]
    pub const fn span(&self) -> i64 {
        self.max - self.min
    }
}

// ============================================================================
// Spike Stream
// ============================================================================

/// Ordered pair of parallel address and timestamp arrays.
///
/// `addresses.len() == timestamps.len()` always holds. Timestamp order is
/// expected but not enforced; see [`crate::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpikeStream {
    addresses: Vec<i64>,
    timestamps: Vec<i64>,
    bounds: Option<TimestampBounds>,
}

impl SpikeStream {
    /// Build a stream from parallel arrays.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::LengthMismatch`] if the arrays differ in length.
    pub fn new(addresses: Vec<i64>, timestamps: Vec<i64>) -> Result<Self, StreamError> {
        if addresses.len() != timestamps.len() {
            return Err(StreamError::LengthMismatch {
                addresses: addresses.len(),
                timestamps: timestamps.len(),
            });
        }
        let bounds = TimestampBounds::scan(&timestamps);
        Ok(Self { addresses, timestamps, bounds })
    }

    /// Empty stream with room for `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            addresses: Vec::with_capacity(capacity),
            timestamps: Vec::with_capacity(capacity),
            bounds: None,
        }
    }

    /// Collect events into a stream.
    pub fn from_events<I: IntoIterator<Item = SpikeEvent>>(events: I) -> Self {
        let mut stream = Self::default();
        stream.extend(events);
        stream
    }

    /// Append one event, keeping the bounds cache current.
    pub fn push(&mut self, event: SpikeEvent) {
        let index = self.timestamps.len();
        self.addresses.push(event.address);
        self.timestamps.push(event.timestamp);
        match self.bounds.as_mut() {
            Some(bounds) => bounds.include(index, event.timestamp),
            None => {
                self.bounds = Some(TimestampBounds {
                    min: event.timestamp,
                    min_index: index,
                    max: event.timestamp,
                    max_index: index,
                });
            }
        }
    }

    /// Number of events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the stream holds no events.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Address array.
    #[inline]
    #[must_use]
    pub fn addresses(&self) -> &[i64] {
        &self.addresses
    }

    /// Timestamp array.
    #[inline]
    #[must_use]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Event at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<SpikeEvent> {
        Some(SpikeEvent::new(*self.addresses.get(index)?, *self.timestamps.get(index)?))
    }

    /// Iterate over events in storage order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = SpikeEvent> + '_ {
        self.addresses
            .iter()
            .zip(&self.timestamps)
            .map(|(&address, &timestamp)| SpikeEvent { address, timestamp })
    }

    /// Cached timestamp extremes (`None` for an empty stream).
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Option<TimestampBounds> {
        self.bounds
    }

    /// Smallest timestamp.
    #[inline]
    #[must_use]
    pub fn min_timestamp(&self) -> Option<i64> {
        self.bounds.map(|b| b.min)
    }

    /// Largest timestamp.
    #[inline]
    #[must_use]
    pub fn max_timestamp(&self) -> Option<i64> {
        self.bounds.map(|b| b.max)
    }

    /// Split into `(addresses, timestamps)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<i64>, Vec<i64>) {
        (self.addresses, self.timestamps)
    }

    /// Whether timestamps are non-decreasing in storage order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        is_non_decreasing(&self.timestamps)
    }

    /// Stable in-place sort by timestamp.
    pub fn sort_by_timestamp(&mut self) {
        if self.is_sorted() {
            return;
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);
        self.addresses = order.iter().map(|&i| self.addresses[i]).collect();
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        self.bounds = TimestampBounds::scan(&self.timestamps);
    }

    /// Borrow the stream if it is already time-ordered, otherwise sort a copy.
    #[must_use]
    pub fn time_ordered(&self) -> Cow<'_, Self> {
        if self.is_sorted() {
            Cow::Borrowed(self)
        } else {
            let mut sorted = self.clone();
            sorted.sort_by_timestamp();
            Cow::Owned(sorted)
        }
    }

    /// Add `offset` to every timestamp.
    pub fn shift_timestamps(&mut self, offset: i64) {
        for ts in &mut self.timestamps {
            *ts += offset;
        }
        if let Some(bounds) = self.bounds.as_mut() {
            bounds.min += offset;
            bounds.max += offset;
        }
    }

    /// Rewrite every timestamp with `f` and install the caller-computed bounds.
    ///
    /// `f` must be monotonic so that the cached extreme indices stay valid.
    pub(crate) fn rewrite_timestamps(
        &mut self,
        f: impl Fn(i64) -> i64,
        bounds: Option<TimestampBounds>,
    ) {
        for ts in &mut self.timestamps {
            *ts = f(*ts);
        }
        self.bounds = bounds;
    }

    /// Successive timestamp differences (inter-spike intervals).
    #[must_use]
    pub fn inter_spike_intervals(&self) -> Vec<i64> {
        self.timestamps.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Event count and time extent.
    #[must_use]
    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            events: self.len(),
            first_timestamp: self.min_timestamp(),
            last_timestamp: self.max_timestamp(),
            duration: self.bounds.map_or(0, |b| b.span()),
        }
    }
}

impl Extend<SpikeEvent> for SpikeStream {
    fn extend<I: IntoIterator<Item = SpikeEvent>>(&mut self, iter: I) {
        for event in iter {
            self.push(event);
        }
    }
}

impl FromIterator<SpikeEvent> for SpikeStream {
    fn from_iter<I: IntoIterator<Item = SpikeEvent>>(iter: I) -> Self {
        Self::from_events(iter)
    }
}

/// Event count and time extent of a stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    /// Number of events
    pub events: usize,
    /// Smallest timestamp
    pub first_timestamp: Option<i64>,
    /// Largest timestamp
    pub last_timestamp: Option<i64>,
    /// Difference between the extremes
    pub duration: i64,
}

impl fmt::Display for StreamSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => write!(
                f,
                "{} events from {first} to {last} ({} us)",
                self.events, self.duration
            ),
            _ => write!(f, "{} events", self.events),
        }
    }
}

pub(crate) fn is_non_decreasing(timestamps: &[i64]) -> bool {
    timestamps.windows(2).all(|w| w[0] <= w[1])
}

// ============================================================================
// Selectors
// ============================================================================

/// Ear selector for stereo recordings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left cochlea (lower half of the address space)
    Left,
    /// Right cochlea (upper half of the address space)
    Right,
}

impl Side {
    /// 0 for left, 1 for right.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// Sound-source localization neuron population.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Population {
    /// Medial superior olive
    Mso,
    /// Lateral superior olive
    Lso,
}

impl Population {
    /// Both populations in decode order.
    pub const ALL: [Self; 2] = [Self::Mso, Self::Lso];

    /// Population selected by the MSO/LSO discriminator bit.
    #[inline]
    #[must_use]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Self::Lso
        } else {
            Self::Mso
        }
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mso => f.write_str("MSO"),
            Self::Lso => f.write_str("LSO"),
        }
    }
}

// ============================================================================
// Localization Streams
// ============================================================================

/// Parallel neuron-id/channel/timestamp arrays for one population.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulationStream {
    neuron_ids: Vec<i64>,
    channels: Vec<i64>,
    timestamps: Vec<i64>,
}

impl PopulationStream {
    /// Build from parallel arrays.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::LengthMismatch`] if the arrays differ in length.
    pub fn new(
        neuron_ids: Vec<i64>,
        channels: Vec<i64>,
        timestamps: Vec<i64>,
    ) -> Result<Self, StreamError> {
        if neuron_ids.len() != timestamps.len() || channels.len() != timestamps.len() {
            return Err(StreamError::LengthMismatch {
                addresses: neuron_ids.len().min(channels.len()),
                timestamps: timestamps.len(),
            });
        }
        Ok(Self { neuron_ids, channels, timestamps })
    }

    /// Append one event.
    pub fn push(&mut self, neuron_id: i64, channel: i64, timestamp: i64) {
        self.neuron_ids.push(neuron_id);
        self.channels.push(channel);
        self.timestamps.push(timestamp);
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether there are no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Neuron ids.
    #[must_use]
    pub fn neuron_ids(&self) -> &[i64] {
        &self.neuron_ids
    }

    /// Frequency channels.
    #[must_use]
    pub fn channels(&self) -> &[i64] {
        &self.channels
    }

    /// Timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Timestamp extremes, scanned on demand.
    #[must_use]
    pub fn bounds(&self) -> Option<TimestampBounds> {
        TimestampBounds::scan(&self.timestamps)
    }

    /// Whether timestamps are non-decreasing.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        is_non_decreasing(&self.timestamps)
    }

    /// Stable in-place sort by timestamp.
    pub fn sort_by_timestamp(&mut self) {
        if self.is_sorted() {
            return;
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);
        self.neuron_ids = order.iter().map(|&i| self.neuron_ids[i]).collect();
        self.channels = order.iter().map(|&i| self.channels[i]).collect();
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
    }

    /// Borrow if time-ordered, otherwise sort a copy.
    #[must_use]
    pub fn time_ordered(&self) -> Cow<'_, Self> {
        if self.is_sorted() {
            Cow::Borrowed(self)
        } else {
            let mut sorted = self.clone();
            sorted.sort_by_timestamp();
            Cow::Owned(sorted)
        }
    }

    pub(crate) fn rewrite_timestamps(&mut self, f: impl Fn(i64) -> i64) {
        for ts in &mut self.timestamps {
            *ts = f(*ts);
        }
    }
}

/// MSO and LSO sub-streams of a dual-model recording.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalizationStream {
    /// Medial superior olive events
    pub mso: PopulationStream,
    /// Lateral superior olive events
    pub lso: PopulationStream,
}

impl LocalizationStream {
    /// Sub-stream of one population.
    #[must_use]
    pub fn population(&self, population: Population) -> &PopulationStream {
        match population {
            Population::Mso => &self.mso,
            Population::Lso => &self.lso,
        }
    }

    /// Mutable sub-stream of one population.
    pub fn population_mut(&mut self, population: Population) -> &mut PopulationStream {
        match population {
            Population::Mso => &mut self.mso,
            Population::Lso => &mut self.lso,
        }
    }

    /// Total events across both populations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mso.len() + self.lso.len()
    }

    /// Whether both populations are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mso.is_empty() && self.lso.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_rejected() {
        let result = SpikeStream::new(vec![1, 2, 3], vec![10, 20]);
        assert!(matches!(
            result,
            Err(StreamError::LengthMismatch { addresses: 3, timestamps: 2 })
        ));
    }

    #[test]
    fn test_bounds_cached_on_construction() {
        let stream = SpikeStream::new(vec![0, 1, 2, 3], vec![40, 10, 90, 10]).unwrap();
        let bounds = stream.bounds().unwrap();
        assert_eq!(bounds.min, 10);
        assert_eq!(bounds.min_index, 1);
        assert_eq!(bounds.max, 90);
        assert_eq!(bounds.max_index, 2);
    }

    #[test]
    fn test_push_updates_bounds() {
        let mut stream = SpikeStream::default();
        assert!(stream.bounds().is_none());
        stream.push(SpikeEvent::new(3, 50));
        stream.push(SpikeEvent::new(1, 20));
        stream.push(SpikeEvent::new(2, 70));
        assert_eq!(stream.min_timestamp(), Some(20));
        assert_eq!(stream.max_timestamp(), Some(70));
        assert_eq!(stream.bounds().unwrap().max_index, 2);
    }

    #[test]
    fn test_stable_sort_by_timestamp() {
        let mut stream = SpikeStream::new(vec![5, 1, 7, 2], vec![30, 10, 10, 20]).unwrap();
        assert!(!stream.is_sorted());
        stream.sort_by_timestamp();
        assert!(stream.is_sorted());
        // Equal timestamps keep their storage order
        assert_eq!(stream.addresses(), &[1, 7, 2, 5]);
        assert_eq!(stream.timestamps(), &[10, 10, 20, 30]);
        assert_eq!(stream.bounds().unwrap().min_index, 0);
    }

    #[test]
    fn test_time_ordered_borrows_sorted_stream() {
        let stream = SpikeStream::new(vec![0, 1], vec![1, 2]).unwrap();
        assert!(matches!(stream.time_ordered(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_inter_spike_intervals() {
        let stream = SpikeStream::new(vec![0, 0, 0, 0], vec![0, 5, 15, 16]).unwrap();
        assert_eq!(stream.inter_spike_intervals(), vec![5, 10, 1]);
    }

    #[test]
    fn test_summary() {
        let stream = SpikeStream::new(vec![0, 1], vec![100, 350]).unwrap();
        let summary = stream.summary();
        assert_eq!(summary.events, 2);
        assert_eq!(summary.duration, 250);
        assert_eq!(summary.to_string(), "2 events from 100 to 350 (250 us)");
    }

    #[test]
    fn test_shift_timestamps() {
        let mut stream = SpikeStream::new(vec![0, 1], vec![-20, 10]).unwrap();
        stream.shift_timestamps(20);
        assert_eq!(stream.timestamps(), &[0, 30]);
        assert_eq!(stream.min_timestamp(), Some(0));
    }

    #[test]
    fn test_population_stream_sort() {
        let mut mso = PopulationStream::new(vec![1, 2], vec![33, 34], vec![20, 10]).unwrap();
        mso.sort_by_timestamp();
        assert_eq!(mso.neuron_ids(), &[2, 1]);
        assert_eq!(mso.channels(), &[34, 33]);
        assert_eq!(mso.timestamps(), &[10, 20]);
    }
}
