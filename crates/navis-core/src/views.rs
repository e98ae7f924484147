//! Analysis views over spike streams
//!
//! Every time-binned view is a reduction of the matrix returned by
//! [`crate::aggregate::aggregate`]. Unsorted input is sorted on a private copy
//! first; the caller's stream is never touched.

use serde::Serialize;

use crate::aggregate::{aggregate, ActivityMatrix};
use crate::config::{LocalizationConfig, RecordingConfig};
use crate::error::{Result, UsageError};
use crate::types::{LocalizationStream, Side, SpikeStream};

/// Raw per-address, per-bin counts.
///
/// # Errors
///
/// Fails on an empty stream or an address outside the topology.
pub fn sonogram(
    stream: &SpikeStream,
    config: &RecordingConfig,
    start_at_zero: bool,
) -> Result<ActivityMatrix> {
    aggregate(&stream.time_ordered(), config.bin_size, config.num_addresses(), start_at_zero)
}

/// Total events per address over the whole recording.
///
/// # Errors
///
/// Fails on an empty stream or an address outside the topology.
pub fn histogram(stream: &SpikeStream, config: &RecordingConfig) -> Result<Vec<u64>> {
    Ok(sonogram(stream, config, false)?.row_sums())
}

// ============================================================================
// Average Activity
// ============================================================================

/// Events per bin summed over each ear.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AverageActivity {
    /// Bin width in microseconds
    pub bin_size: u64,
    /// Start time of the first bin
    pub origin: i64,
    /// Left ear (the whole stream for mono)
    pub left: Vec<u64>,
    /// Right ear, stereo only
    pub right: Option<Vec<u64>>,
}

impl AverageActivity {
    /// Per-bin counts of one ear.
    #[must_use]
    pub fn side(&self, side: Side) -> Option<&[u64]> {
        match side {
            Side::Left => Some(&self.left),
            Side::Right => self.right.as_deref(),
        }
    }
}

/// Events per bin split by ear.
///
/// # Errors
///
/// Fails on an empty stream or an address outside the topology.
pub fn average_activity(
    stream: &SpikeStream,
    config: &RecordingConfig,
    start_at_zero: bool,
) -> Result<AverageActivity> {
    Ok(average_activity_from(&sonogram(stream, config, start_at_zero)?, config))
}

/// Events per bin split by ear, reduced from an existing sonogram.
#[must_use]
pub fn average_activity_from(matrix: &ActivityMatrix, config: &RecordingConfig) -> AverageActivity {
    let half = config.addresses_per_ear();
    let right = config.mono_stereo.is_stereo().then(|| matrix.column_sums(half..2 * half));
    AverageActivity {
        bin_size: matrix.bin_size(),
        origin: matrix.origin(),
        left: matrix.column_sums(0..half),
        right,
    }
}

// ============================================================================
// Left/Right Disparity
// ============================================================================

/// Per-channel, per-bin `left - right` counts scaled to `[-100, 100]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisparityMatrix {
    values: Vec<f64>,
    num_addresses: usize,
    num_bins: usize,
    peak: u32,
}

impl DisparityMatrix {
    /// Addresses per ear (rows).
    #[must_use]
    pub const fn num_addresses(&self) -> usize {
        self.num_addresses
    }

    /// Bins (columns).
    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Largest absolute raw difference, the value mapped to 100.
    #[must_use]
    pub const fn peak(&self) -> u32 {
        self.peak
    }

    /// Scaled disparity at `(address, bin)`.
    #[must_use]
    pub fn get(&self, address: usize, bin: usize) -> f64 {
        if address >= self.num_addresses || bin >= self.num_bins {
            return 0.0;
        }
        self.values[address * self.num_bins + bin]
    }

    /// One address across all bins.
    #[must_use]
    pub fn row(&self, address: usize) -> &[f64] {
        let start = address * self.num_bins;
        self.values.get(start..start + self.num_bins).unwrap_or(&[])
    }

    /// Every value in row-major order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Left minus right activity per channel and bin, normalized to `±100`.
///
/// A recording with identical ears yields an all-zero matrix.
///
/// # Errors
///
/// Returns [`UsageError::RequiresStereo`] for a mono configuration.
pub fn disparity(
    stream: &SpikeStream,
    config: &RecordingConfig,
    start_at_zero: bool,
) -> Result<DisparityMatrix> {
    if !config.mono_stereo.is_stereo() {
        return Err(UsageError::RequiresStereo { operation: "disparity" }.into());
    }
    disparity_from(&sonogram(stream, config, start_at_zero)?, config)
}

/// Left minus right activity reduced from an existing stereo sonogram.
///
/// # Errors
///
/// Returns [`UsageError::RequiresStereo`] for a mono configuration and
/// [`UsageError::InvalidParameter`] when `matrix` was not sized for the
/// configured topology.
pub fn disparity_from(matrix: &ActivityMatrix, config: &RecordingConfig) -> Result<DisparityMatrix> {
    if !config.mono_stereo.is_stereo() {
        return Err(UsageError::RequiresStereo { operation: "disparity" }.into());
    }
    if matrix.num_addresses() != config.num_addresses() {
        return Err(UsageError::InvalidParameter {
            operation: "disparity",
            reason: "sonogram rows do not match the configured address count",
        }
        .into());
    }
    let half = config.addresses_per_ear();
    let num_bins = matrix.num_bins();

    let mut raw = Vec::with_capacity(half * num_bins);
    for address in 0..half {
        let left = matrix.row(address);
        let right = matrix.row(address + half);
        raw.extend(left.iter().zip(right).map(|(&l, &r)| i64::from(l) - i64::from(r)));
    }
    let peak = raw.iter().map(|d| d.unsigned_abs()).max().unwrap_or(0);
    let values = if peak == 0 {
        vec![0.0; raw.len()]
    } else {
        raw.iter().map(|&d| d as f64 * 100.0 / peak as f64).collect()
    };

    Ok(DisparityMatrix {
        values,
        num_addresses: half,
        num_bins,
        peak: u32::try_from(peak).unwrap_or(u32::MAX),
    })
}

// ============================================================================
// MSO Views
// ============================================================================

/// MSO event counts per frequency channel and neuron id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MsoHeatmap {
    /// First channel (row 0)
    pub start_channel: u32,
    /// Rows, one per channel in the configured range
    pub num_channels: usize,
    /// Columns, one per neuron id
    pub num_neurons: usize,
    /// Row-major counts
    pub counts: Vec<u64>,
    /// Events outside the configured channel or neuron range
    pub skipped: usize,
}

impl MsoHeatmap {
    /// Count at `(channel, neuron_id)` with `channel` in absolute numbering.
    #[must_use]
    pub fn get(&self, channel: u32, neuron_id: usize) -> u64 {
        let Some(row) = channel.checked_sub(self.start_channel) else {
            return 0;
        };
        let row = row as usize;
        if row >= self.num_channels || neuron_id >= self.num_neurons {
            return 0;
        }
        self.counts[row * self.num_neurons + neuron_id]
    }
}

/// Channel by neuron-id activity of the MSO population.
#[must_use]
pub fn mso_heatmap(stream: &LocalizationStream, config: &LocalizationConfig) -> MsoHeatmap {
    let bounds = config.mso;
    let num_channels = bounds.num_channels();
    let num_neurons = bounds.num_neurons_channel as usize;
    let mut heatmap = MsoHeatmap {
        start_channel: bounds.start_channel,
        num_channels,
        num_neurons,
        counts: vec![0; num_channels * num_neurons],
        skipped: 0,
    };
    for (&channel, &neuron_id) in stream.mso.channels().iter().zip(stream.mso.neuron_ids()) {
        if bounds.contains_channel(channel) && bounds.contains_neuron(neuron_id) {
            let row = (channel - i64::from(bounds.start_channel)) as usize;
            heatmap.counts[row * num_neurons + neuron_id as usize] += 1;
        } else {
            heatmap.skipped += 1;
        }
    }
    heatmap
}

/// MSO events per neuron id across all channels.
#[must_use]
pub fn mso_histogram(stream: &LocalizationStream, config: &LocalizationConfig) -> Vec<u64> {
    let heatmap = mso_heatmap(stream, config);
    let mut totals = vec![0; heatmap.num_neurons];
    for row in heatmap.counts.chunks(heatmap.num_neurons.max(1)) {
        for (total, &count) in totals.iter_mut().zip(row) {
            *total += count;
        }
    }
    totals
}

/// Per-bin sound-source estimate from the MSO population.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MsoLocalization {
    /// Neuron-id by bin activity (rows are neuron ids)
    pub activity: ActivityMatrix,
    /// Most active neuron id per bin, `None` for a silent bin
    pub winners: Vec<Option<usize>>,
    /// Azimuth in degrees of each winner, `None` for a silent bin
    pub azimuths: Vec<Option<f64>>,
}

/// Centre azimuth of neuron slot `slot` out of `num_neurons`.
///
/// Slots split `[-90, 90]` degrees evenly.
#[must_use]
pub fn slot_azimuth(slot: usize, num_neurons: usize) -> f64 {
    let width = 180.0 / num_neurons as f64;
    slot as f64 * width - 90.0 + width / 2.0
}

/// Arg-max neuron id and its azimuth for each bin.
///
/// Ties resolve to the lowest neuron id.
///
/// # Errors
///
/// Fails on an empty MSO stream or a neuron id outside the configured size.
pub fn mso_localization(
    stream: &LocalizationStream,
    recording: &RecordingConfig,
    config: &LocalizationConfig,
    start_at_zero: bool,
) -> Result<MsoLocalization> {
    let mso = stream.mso.time_ordered();
    let neurons = SpikeStream::new(mso.neuron_ids().to_vec(), mso.timestamps().to_vec())?;
    let num_neurons = config.mso.num_neurons_channel as usize;
    let activity = aggregate(&neurons, recording.bin_size, num_neurons, start_at_zero)?;

    let winners: Vec<Option<usize>> = (0..activity.num_bins())
        .map(|bin| {
            let column = activity.column(bin);
            let (slot, &count) = column
                .iter()
                .enumerate()
                .rev()
                .max_by_key(|&(_, count)| *count)?;
            (count > 0).then_some(slot)
        })
        .collect();
    let azimuths = winners
        .iter()
        .map(|w| w.map(|slot| slot_azimuth(slot, num_neurons)))
        .collect();

    Ok(MsoLocalization { activity, winners, azimuths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonoStereo, OnOffBoth, PopulationBounds};

    fn stereo_config() -> RecordingConfig {
        RecordingConfig::builder(2)
            .mono_stereo(MonoStereo::Stereo)
            .on_off_both(OnOffBoth::Both)
            .bin_size(10)
            .build()
            .unwrap()
    }

    #[test]
    fn test_sonogram_sorts_private_copy() {
        let config = RecordingConfig::builder(2).bin_size(10).build().unwrap();
        let stream = SpikeStream::new(vec![3, 0], vec![15, 2]).unwrap();
        let m = sonogram(&stream, &config, true).unwrap();
        assert_eq!(m.row(0), &[1, 0]);
        assert_eq!(m.row(3), &[0, 1]);
        assert!(!stream.is_sorted());
    }

    #[test]
    fn test_histogram() {
        let config = RecordingConfig::builder(2).bin_size(10).build().unwrap();
        let stream = SpikeStream::new(vec![0, 1, 1, 3, 1], vec![0, 1, 40, 41, 90]).unwrap();
        assert_eq!(histogram(&stream, &config).unwrap(), vec![1, 3, 0, 1]);
    }

    #[test]
    fn test_average_activity_by_side() {
        let config = stereo_config();
        let stream = SpikeStream::new(vec![0, 5, 6, 1], vec![0, 3, 12, 14]).unwrap();
        let activity = average_activity(&stream, &config, true).unwrap();
        assert_eq!(activity.left, vec![1, 1]);
        assert_eq!(activity.right.as_deref(), Some(&[1, 1][..]));

        let mono = RecordingConfig::builder(4).bin_size(10).build().unwrap();
        let activity = average_activity(&stream, &mono, true).unwrap();
        assert_eq!(activity.left, vec![2, 2]);
        assert!(activity.side(Side::Right).is_none());
    }

    #[test]
    fn test_disparity_requires_stereo() {
        let mono = RecordingConfig::builder(2).bin_size(10).build().unwrap();
        let stream = SpikeStream::new(vec![0], vec![0]).unwrap();
        assert!(matches!(
            disparity(&stream, &mono, true),
            Err(crate::Error::Usage(UsageError::RequiresStereo { .. }))
        ));
    }

    #[test]
    fn test_disparity_bounds_and_balance() {
        let config = stereo_config();
        // Address 0 left vs 4 right; three left events and one right event in bin 0
        let stream = SpikeStream::new(vec![0, 0, 0, 4, 1, 5], vec![0, 1, 2, 3, 12, 13]).unwrap();
        let d = disparity(&stream, &config, true).unwrap();
        assert_eq!(d.peak(), 2);
        assert!((d.get(0, 0) - 100.0).abs() < 1e-9);
        assert!(d.get(1, 1).abs() < 1e-9);
        assert!(d.values().iter().all(|v| (-100.0..=100.0).contains(v)));

        let balanced = SpikeStream::new(vec![2, 6, 3, 7], vec![0, 0, 25, 25]).unwrap();
        let d = disparity(&balanced, &config, true).unwrap();
        assert_eq!(d.peak(), 0);
        assert!(d.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_matrix_reductions_match_stream_views() {
        let config = stereo_config();
        let stream = SpikeStream::new(vec![0, 0, 4, 1, 5, 7], vec![0, 1, 3, 12, 13, 21]).unwrap();
        let matrix = sonogram(&stream, &config, true).unwrap();

        assert_eq!(
            average_activity_from(&matrix, &config),
            average_activity(&stream, &config, true).unwrap()
        );
        assert_eq!(
            disparity_from(&matrix, &config).unwrap(),
            disparity(&stream, &config, true).unwrap()
        );

        let mono = RecordingConfig::builder(2).bin_size(10).build().unwrap();
        assert!(disparity_from(&matrix, &mono).is_err());
        let wider = RecordingConfig::builder(4)
            .mono_stereo(MonoStereo::Stereo)
            .bin_size(10)
            .build()
            .unwrap();
        assert!(matches!(
            disparity_from(&matrix, &wider),
            Err(crate::Error::Usage(UsageError::InvalidParameter { .. }))
        ));
    }

    fn localization_fixture() -> (LocalizationStream, LocalizationConfig) {
        let config = LocalizationConfig::new(
            PopulationBounds::new(10, 11, 4),
            PopulationBounds::new(0, 1, 4),
        )
        .unwrap();
        let mut stream = LocalizationStream::default();
        stream.mso.push(1, 10, 0);
        stream.mso.push(1, 11, 5);
        stream.mso.push(3, 11, 6);
        stream.mso.push(2, 10, 25);
        stream.mso.push(0, 40, 26);
        (stream, config)
    }

    #[test]
    fn test_mso_heatmap_and_histogram() {
        let (stream, config) = localization_fixture();
        let heatmap = mso_heatmap(&stream, &config);
        assert_eq!(heatmap.get(10, 1), 1);
        assert_eq!(heatmap.get(11, 1), 1);
        assert_eq!(heatmap.get(11, 3), 1);
        assert_eq!(heatmap.skipped, 1);
        assert_eq!(mso_histogram(&stream, &config), vec![0, 2, 1, 1]);
    }

    #[test]
    fn test_mso_localization() {
        let (mut stream, config) = localization_fixture();
        stream.mso = crate::types::PopulationStream::new(
            stream.mso.neuron_ids()[..4].to_vec(),
            stream.mso.channels()[..4].to_vec(),
            stream.mso.timestamps()[..4].to_vec(),
        )
        .unwrap();
        let recording = RecordingConfig::builder(16).bin_size(10).build().unwrap();
        let estimate = mso_localization(&stream, &recording, &config, true).unwrap();

        assert_eq!(estimate.winners, vec![Some(1), None, Some(2)]);
        assert_eq!(estimate.azimuths[0], Some(slot_azimuth(1, 4)));
        assert!((slot_azimuth(0, 4) + 67.5).abs() < 1e-9);
        assert!((slot_azimuth(3, 4) - 67.5).abs() < 1e-9);
    }
}
