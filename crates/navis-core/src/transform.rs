//! Stream transforms
//!
//! Every transform borrows its input and returns a new stream. Pair the
//! result with the matching [`RecordingConfig`] helper (`as_stereo`,
//! `as_mono`, `as_single_polarity`) when the topology changes.

use std::collections::{HashSet, VecDeque};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RecordingConfig;
use crate::error::{Result, UsageError};
use crate::types::{Side, SpikeEvent, SpikeStream};

// ============================================================================
// Phase Lock
// ============================================================================

/// Which polarity transitions emit a phase-locked spike.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseLockMode {
    /// Polarity bit 0 followed by 1 on the same channel
    #[default]
    OnToOff,
    /// Any polarity change on the same channel
    BothEdges,
}

/// Emit one spike per qualifying polarity transition on each channel.
///
/// The first event seen on a channel only primes its state. Output addresses
/// are channel ids (`address / 2`), so the result lives in the
/// [`RecordingConfig::as_single_polarity`] topology. Events are processed in
/// storage order.
///
/// # Errors
///
/// Returns [`UsageError::RequiresBothPolarities`] for single-polarity input
/// and [`UsageError::AddressOutOfRange`] for an address outside the topology.
pub fn phase_lock(
    stream: &SpikeStream,
    config: &RecordingConfig,
    mode: PhaseLockMode,
) -> Result<SpikeStream> {
    if !config.on_off_both.is_both() {
        return Err(UsageError::RequiresBothPolarities { operation: "phase_lock" }.into());
    }
    let num_channels = config.num_channels as usize * config.mono_stereo.factor();
    let mut previous: Vec<Option<i64>> = vec![None; num_channels];
    let mut out = SpikeStream::with_capacity(stream.len() / 2);

    for event in stream.iter() {
        let channel = event.address.div_euclid(2);
        let polarity = event.address.rem_euclid(2);
        let slot = usize::try_from(channel)
            .ok()
            .and_then(|c| previous.get_mut(c))
            .ok_or(UsageError::AddressOutOfRange {
                operation: "phase_lock",
                address: event.address,
                limit: config.num_addresses(),
            })?;

        let emit = match (*slot, mode) {
            (Some(0), _) => polarity == 1,
            (Some(_), PhaseLockMode::BothEdges) => polarity == 0,
            _ => false,
        };
        if emit {
            out.push(SpikeEvent::new(channel, event.timestamp));
        }
        *slot = Some(polarity);
    }
    Ok(out)
}

// ============================================================================
// Mono / Stereo
// ============================================================================

/// Duplicate a mono stream into both ears, delaying the right ear by `delay` us.
///
/// Right-ear addresses are offset by [`RecordingConfig::addresses_per_ear`].
/// With a negative delay every timestamp is then raised by `-delay`. The
/// merged stream is ordered by timestamp, with coinciding events shuffled by
/// `rng`.
///
/// # Errors
///
/// Returns [`UsageError::RequiresMono`] for a stereo configuration.
pub fn mono_to_stereo<R: Rng + ?Sized>(
    stream: &SpikeStream,
    config: &RecordingConfig,
    delay: i64,
    rng: &mut R,
) -> Result<SpikeStream> {
    if config.mono_stereo.is_stereo() {
        return Err(UsageError::RequiresMono { operation: "mono_to_stereo" }.into());
    }
    let offset = config.addresses_per_ear() as i64;
    let shift = if delay < 0 { -delay } else { 0 };

    let mut merged: Vec<(i64, u64, SpikeEvent)> = Vec::with_capacity(stream.len() * 2);
    for event in stream.iter() {
        let left = SpikeEvent::new(event.address, event.timestamp + shift);
        let right = SpikeEvent::new(event.address + offset, event.timestamp + delay + shift);
        merged.push((left.timestamp, rng.gen(), left));
        merged.push((right.timestamp, rng.gen(), right));
    }
    merged.sort_by_key(|&(timestamp, tiebreak, _)| (timestamp, tiebreak));

    Ok(merged.into_iter().map(|(_, _, event)| event).collect())
}

/// Keep one ear of a stereo stream, rebasing right-ear addresses to start at 0.
///
/// # Errors
///
/// Returns [`UsageError::RequiresStereo`] for a mono configuration.
pub fn stereo_to_mono(
    stream: &SpikeStream,
    config: &RecordingConfig,
    side: Side,
) -> Result<SpikeStream> {
    if !config.mono_stereo.is_stereo() {
        return Err(UsageError::RequiresStereo { operation: "stereo_to_mono" }.into());
    }
    let half = config.addresses_per_ear() as i64;
    let lower = side.index() as i64 * half;
    let upper = lower + half;

    Ok(stream
        .iter()
        .filter(|e| (lower..upper).contains(&e.address))
        .map(|e| SpikeEvent::new(e.address - lower, e.timestamp))
        .collect())
}

// ============================================================================
// Channel Extraction
// ============================================================================

/// Keep only events whose address is in `addresses`.
///
/// With `rebase` the smallest requested address becomes 0. The result is
/// stably sorted by timestamp.
///
/// # Errors
///
/// Returns [`UsageError::EmptyAddressSet`] when `addresses` is empty.
pub fn extract_channels(
    stream: &SpikeStream,
    addresses: &[i64],
    rebase: bool,
) -> Result<SpikeStream> {
    let Some(&base) = addresses.iter().min() else {
        return Err(UsageError::EmptyAddressSet.into());
    };
    let base = if rebase { base } else { 0 };
    let wanted: HashSet<i64> = addresses.iter().copied().collect();

    let mut out: SpikeStream = stream
        .iter()
        .filter(|e| wanted.contains(&e.address))
        .map(|e| SpikeEvent::new(e.address - base, e.timestamp))
        .collect();
    out.sort_by_timestamp();
    Ok(out)
}

// ============================================================================
// Time Split
// ============================================================================

/// Slice the events with timestamps in `[init, end)`.
///
/// `end` defaults to one past the largest timestamp so the last event is kept.
/// Unsorted input is sorted first. With `rezero` the slice is shifted so its
/// first event sits at 0.
///
/// # Errors
///
/// Returns [`UsageError::InvalidTimeRange`] when `init > end`.
pub fn split_time_range(
    stream: &SpikeStream,
    init: i64,
    end: Option<i64>,
    rezero: bool,
) -> Result<SpikeStream> {
    let end = end.unwrap_or_else(|| stream.max_timestamp().map_or(init, |max| max + 1));
    if init > end {
        return Err(UsageError::InvalidTimeRange { init, end }.into());
    }
    let sorted = stream.time_ordered();
    let timestamps = sorted.timestamps();
    let lo = timestamps.partition_point(|&ts| ts < init);
    let hi = timestamps.partition_point(|&ts| ts < end);

    let mut out = SpikeStream::new(sorted.addresses()[lo..hi].to_vec(), timestamps[lo..hi].to_vec())?;
    if rezero {
        if let Some(first) = out.min_timestamp() {
            out.shift_timestamps(-first);
        }
    }
    Ok(out)
}

// ============================================================================
// Noise Segmenter
// ============================================================================

/// Streaming density filter over the last `capacity` timestamps.
///
/// An event is admitted once the window is full and the span between the
/// oldest buffered timestamp and the current one is at most `bin_width`.
#[derive(Clone, Debug)]
pub struct NoiseSegmenter {
    window: VecDeque<i64>,
    capacity: usize,
    bin_width: i64,
}

impl NoiseSegmenter {
    /// Create a segmenter with an empty window.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidParameter`] for a zero capacity or a
    /// negative width.
    pub fn new(capacity: usize, bin_width: i64) -> Result<Self> {
        if capacity == 0 {
            return Err(UsageError::InvalidParameter {
                operation: "segment",
                reason: "window capacity must be greater than zero",
            }
            .into());
        }
        if bin_width < 0 {
            return Err(UsageError::InvalidParameter {
                operation: "segment",
                reason: "bin width must not be negative",
            }
            .into());
        }
        Ok(Self { window: VecDeque::with_capacity(capacity), capacity, bin_width })
    }

    /// Feed one timestamp; returns whether its event is kept.
    pub fn admit(&mut self, timestamp: i64) -> bool {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(timestamp);
        if self.window.len() < self.capacity {
            return false;
        }
        self.window.front().is_some_and(|&oldest| timestamp - oldest <= self.bin_width)
    }

    /// Span of the current window, if it is full.
    #[must_use]
    pub fn span(&self) -> Option<i64> {
        if self.window.len() < self.capacity {
            return None;
        }
        Some(self.window.back()? - self.window.front()?)
    }

    /// Forget every buffered timestamp.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

/// Drop events that are not part of a dense run of `capacity` events.
///
/// # Errors
///
/// Fails as [`NoiseSegmenter::new`] does.
pub fn segment(stream: &SpikeStream, capacity: usize, bin_width: i64) -> Result<SpikeStream> {
    let mut segmenter = NoiseSegmenter::new(capacity, bin_width)?;
    Ok(stream.iter().filter(|e| segmenter.admit(e.timestamp)).collect())
}
