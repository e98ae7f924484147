//! Timestamp normalization
//!
//! Converts raw decoder ticks into microseconds. With `reset_timestamp` the
//! stream is zero-based first. The cached bounds are carried through the
//! rewrite instead of being rescanned.

use crate::config::RecordingConfig;
use crate::types::{LocalizationStream, SpikeStream, TimestampBounds};

/// Slack added before flooring so that exact tick multiples survive float error.
const TICK_EPSILON: f64 = 1e-6;

/// Convert raw ticks to microseconds, rounding toward negative infinity.
#[inline]
#[must_use]
pub fn ticks_to_micros(ticks: i64, tick: f64) -> i64 {
    (ticks as f64 * tick + TICK_EPSILON).floor() as i64
}

/// Convert microseconds to raw ticks with floor division.
#[inline]
#[must_use]
pub fn micros_to_ticks(micros: i64, tick: f64) -> i64 {
    (micros as f64 / tick + TICK_EPSILON).floor() as i64
}

/// Outcome of [`normalize`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Normalization {
    /// Timestamps were rewritten; `offset` raw ticks were subtracted first
    Applied {
        /// Raw minimum subtracted before scaling (0 without reset)
        offset: i64,
    },
    /// Nothing to do on an empty stream
    Empty,
}

/// Zero-base (if `config.reset_timestamp`) and tick-scale every timestamp in place.
///
/// An empty stream is left untouched and reported as [`Normalization::Empty`].
pub fn normalize(stream: &mut SpikeStream, config: &RecordingConfig) -> Normalization {
    let Some(bounds) = stream.bounds() else {
        return Normalization::Empty;
    };
    let offset = if config.reset_timestamp { bounds.min } else { 0 };
    let tick = config.timestamp_tick;
    let scale = move |ts: i64| ticks_to_micros(ts - offset, tick);

    // Monotonic rewrite: extreme indices stay where they are.
    let scaled = TimestampBounds {
        min: scale(bounds.min),
        max: scale(bounds.max),
        ..bounds
    };
    stream.rewrite_timestamps(scale, Some(scaled));
    Normalization::Applied { offset }
}

/// Normalize an audio stream and its localization sub-streams on a shared time base.
///
/// The zero point is the smallest timestamp across all three streams, so
/// events that were simultaneous stay simultaneous.
pub fn normalize_dual(
    audio: &mut SpikeStream,
    localization: &mut LocalizationStream,
    config: &RecordingConfig,
) -> Normalization {
    let min = [
        audio.min_timestamp(),
        localization.mso.bounds().map(|b| b.min),
        localization.lso.bounds().map(|b| b.min),
    ]
    .into_iter()
    .flatten()
    .min();
    let Some(min) = min else {
        return Normalization::Empty;
    };
    let offset = if config.reset_timestamp { min } else { 0 };
    let tick = config.timestamp_tick;
    let scale = move |ts: i64| ticks_to_micros(ts - offset, tick);

    if let Some(bounds) = audio.bounds() {
        let scaled = TimestampBounds { min: scale(bounds.min), max: scale(bounds.max), ..bounds };
        audio.rewrite_timestamps(scale, Some(scaled));
    }
    localization.mso.rewrite_timestamps(scale);
    localization.lso.rewrite_timestamps(scale);
    Normalization::Applied { offset }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tick: f64, reset: bool) -> RecordingConfig {
        RecordingConfig::builder(4)
            .timestamp_tick(tick)
            .reset_timestamp(reset)
            .build()
            .unwrap()
    }

    #[test]
    fn test_reset_and_scale() {
        let mut stream = SpikeStream::new(vec![0, 1, 2], vec![1000, 1005, 1050]).unwrap();
        let outcome = normalize(&mut stream, &config(0.2, true));
        assert_eq!(outcome, Normalization::Applied { offset: 1000 });
        assert_eq!(stream.timestamps(), &[0, 1, 10]);
        assert_eq!(stream.min_timestamp(), Some(0));
        assert_eq!(stream.max_timestamp(), Some(10));
    }

    #[test]
    fn test_scale_without_reset() {
        let mut stream = SpikeStream::new(vec![0, 1], vec![50, 10]).unwrap();
        normalize(&mut stream, &config(0.2, false));
        assert_eq!(stream.timestamps(), &[10, 2]);
        let bounds = stream.bounds().unwrap();
        assert_eq!((bounds.min, bounds.min_index), (2, 1));
        assert_eq!((bounds.max, bounds.max_index), (10, 0));
    }

    #[test]
    fn test_idempotent_on_normalized_stream() {
        let original = SpikeStream::new(vec![3, 1, 2], vec![0, 7, 19]).unwrap();
        let mut stream = original.clone();
        normalize(&mut stream, &config(1.0, true));
        assert_eq!(stream, original);
    }

    #[test]
    fn test_empty_stream_reported() {
        let mut stream = SpikeStream::default();
        assert_eq!(normalize(&mut stream, &config(0.2, true)), Normalization::Empty);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_tick_conversion_survives_float_error() {
        for ticks in [0_i64, 5, 35, 50, 12_345_675] {
            let micros = ticks_to_micros(ticks, 0.2);
            assert_eq!(micros_to_ticks(micros, 0.2), ticks - ticks % 5);
        }
        assert_eq!(ticks_to_micros(3, 0.1), 0);
        assert_eq!(ticks_to_micros(30, 0.1), 3);
    }

    #[test]
    fn test_dual_shares_time_base() {
        let mut audio = SpikeStream::new(vec![1], vec![400]).unwrap();
        let mut localization = LocalizationStream::default();
        localization.mso.push(2, 10, 200);
        localization.lso.push(1, 11, 600);

        normalize_dual(&mut audio, &mut localization, &config(1.0, true));
        assert_eq!(audio.timestamps(), &[200]);
        assert_eq!(localization.mso.timestamps(), &[0]);
        assert_eq!(localization.lso.timestamps(), &[400]);
    }
}
