//! Windowed aggregation
//!
//! Partitions a time-ordered stream into fixed-width bins and counts events
//! per address in each bin. Every time-binned view in [`crate::views`] is a
//! reduction over the [`ActivityMatrix`] produced here, or walks the same
//! [`BinWindows`] directly.
//!
//! # Binning
//!
//! - origin `o` is `0` with `start_at_zero`, otherwise the first timestamp
//! - bin `i` covers the half-open range `[o + i*w, o + (i+1)*w)`
//! - `num_bins = (max - o) / w + 1`, so the event at `max` always lands in a bin
//!
//! Bin edges advance by exactly `w`; they never follow the data.

use core::ops::Range;

use serde::Serialize;

use crate::error::{ConfigError, Result, UsageError};
use crate::types::SpikeStream;

// ============================================================================
// Bin Windows
// ============================================================================

/// Index ranges of the events falling into each consecutive bin.
///
/// Each step locates the upper edge of the bin with a binary search over
/// the remaining timestamps, so the walk is `O(num_bins * log n)`.
#[derive(Clone, Debug)]
pub struct BinWindows<'a> {
    timestamps: &'a [i64],
    origin: i64,
    bin_size: i64,
    bin: usize,
    num_bins: usize,
    cursor: usize,
}

impl BinWindows<'_> {
    /// Number of bins the walk will yield.
    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Start time of the first bin.
    #[must_use]
    pub const fn origin(&self) -> i64 {
        self.origin
    }
}

impl Iterator for BinWindows<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bin >= self.num_bins {
            return None;
        }
        self.bin += 1;
        let upper = self.origin + self.bin as i64 * self.bin_size;
        let start = self.cursor;
        let end = start + self.timestamps[start..].partition_point(|&ts| ts < upper);
        self.cursor = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_bins - self.bin;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BinWindows<'_> {}

// ============================================================================
// Aggregator
// ============================================================================

/// Fixed-width binning policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WindowedAggregator {
    bin_size: u64,
    start_at_zero: bool,
}

impl WindowedAggregator {
    /// Create an aggregator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroBinSize`] for a zero-width bin.
    pub fn new(bin_size: u64, start_at_zero: bool) -> Result<Self> {
        if bin_size == 0 {
            return Err(ConfigError::ZeroBinSize.into());
        }
        Ok(Self { bin_size, start_at_zero })
    }

    /// Bin width in microseconds.
    #[must_use]
    pub const fn bin_size(&self) -> u64 {
        self.bin_size
    }

    /// Walk the bins of a timestamp array sorted in non-decreasing order.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::EmptyStream`] for no timestamps and
    /// [`UsageError::InvalidParameter`] for unsorted timestamps or when
    /// `start_at_zero` meets a negative timestamp.
    pub fn windows<'a>(&self, timestamps: &'a [i64]) -> Result<BinWindows<'a>> {
        if !timestamps.windows(2).all(|w| w[0] <= w[1]) {
            return Err(UsageError::InvalidParameter {
                operation: "aggregate",
                reason: "timestamps must be sorted",
            }
            .into());
        }
        let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
            return Err(UsageError::EmptyStream { operation: "aggregate" }.into());
        };
        if self.start_at_zero && first < 0 {
            return Err(UsageError::InvalidParameter {
                operation: "aggregate",
                reason: "start_at_zero requires non-negative timestamps",
            }
            .into());
        }
        let origin = if self.start_at_zero { 0 } else { first };
        let bin_size = i64::try_from(self.bin_size).unwrap_or(i64::MAX);
        let num_bins = ((last - origin) / bin_size) as usize + 1;

        Ok(BinWindows { timestamps, origin, bin_size, bin: 0, num_bins, cursor: 0 })
    }

    /// Count events per address in each bin.
    ///
    /// `stream` must be sorted by timestamp; see
    /// [`SpikeStream::time_ordered`].
    ///
    /// # Errors
    ///
    /// Fails as [`Self::windows`] does, and with
    /// [`UsageError::AddressOutOfRange`] for an address outside
    /// `[0, num_addresses)`.
    pub fn aggregate(&self, stream: &SpikeStream, num_addresses: usize) -> Result<ActivityMatrix> {
        let windows = self.windows(stream.timestamps())?;
        if let Some(&address) = stream
            .addresses()
            .iter()
            .find(|&&a| a < 0 || a as u64 >= num_addresses as u64)
        {
            return Err(UsageError::AddressOutOfRange {
                operation: "aggregate",
                address,
                limit: num_addresses,
            }
            .into());
        }

        let mut matrix =
            ActivityMatrix::zeros(num_addresses, windows.num_bins(), windows.origin(), self.bin_size);
        let addresses = stream.addresses();
        for (bin, range) in windows.enumerate() {
            for &address in &addresses[range] {
                matrix.counts[address as usize * matrix.num_bins + bin] += 1;
            }
        }
        Ok(matrix)
    }
}

/// Aggregate a sorted stream into an `num_addresses x num_bins` count matrix.
///
/// # Errors
///
/// See [`WindowedAggregator::aggregate`].
pub fn aggregate(
    stream: &SpikeStream,
    bin_size: u64,
    num_addresses: usize,
    start_at_zero: bool,
) -> Result<ActivityMatrix> {
    WindowedAggregator::new(bin_size, start_at_zero)?.aggregate(stream, num_addresses)
}

// ============================================================================
// Activity Matrix
// ============================================================================

/// Per-address, per-bin event counts (row-major by address).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityMatrix {
    counts: Vec<u32>,
    num_addresses: usize,
    num_bins: usize,
    origin: i64,
    bin_size: u64,
}

impl ActivityMatrix {
    fn zeros(num_addresses: usize, num_bins: usize, origin: i64, bin_size: u64) -> Self {
        Self {
            counts: vec![0; num_addresses * num_bins],
            num_addresses,
            num_bins,
            origin,
            bin_size,
        }
    }

    /// Rows in the matrix.
    #[must_use]
    pub const fn num_addresses(&self) -> usize {
        self.num_addresses
    }

    /// Columns in the matrix.
    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Start time of the first bin.
    #[must_use]
    pub const fn origin(&self) -> i64 {
        self.origin
    }

    /// Bin width in microseconds.
    #[must_use]
    pub const fn bin_size(&self) -> u64 {
        self.bin_size
    }

    /// Start time of bin `bin`.
    #[must_use]
    pub fn bin_start(&self, bin: usize) -> i64 {
        self.origin + bin as i64 * self.bin_size as i64
    }

    /// Count at `(address, bin)`, zero when out of bounds.
    #[must_use]
    pub fn get(&self, address: usize, bin: usize) -> u32 {
        if address >= self.num_addresses || bin >= self.num_bins {
            return 0;
        }
        self.counts[address * self.num_bins + bin]
    }

    /// Counts of one address across all bins.
    #[must_use]
    pub fn row(&self, address: usize) -> &[u32] {
        let start = address * self.num_bins;
        self.counts.get(start..start + self.num_bins).unwrap_or(&[])
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.counts.chunks(self.num_bins.max(1)).take(self.num_addresses)
    }

    /// Counts of all addresses in one bin.
    #[must_use]
    pub fn column(&self, bin: usize) -> Vec<u32> {
        (0..self.num_addresses).map(|a| self.get(a, bin)).collect()
    }

    /// Total events per address.
    #[must_use]
    pub fn row_sums(&self) -> Vec<u64> {
        self.rows().map(|row| row.iter().map(|&c| u64::from(c)).sum()).collect()
    }

    /// Total events per bin over the address range `addresses`.
    #[must_use]
    pub fn column_sums(&self, addresses: Range<usize>) -> Vec<u64> {
        let mut sums = vec![0_u64; self.num_bins];
        for address in addresses.start..addresses.end.min(self.num_addresses) {
            for (sum, &c) in sums.iter_mut().zip(self.row(address)) {
                *sum += u64::from(c);
            }
        }
        sums
    }

    /// Sum of every count.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn stream(addresses: &[i64], timestamps: &[i64]) -> SpikeStream {
        SpikeStream::new(addresses.to_vec(), timestamps.to_vec()).unwrap()
    }

    #[test]
    fn test_half_open_bins() {
        let s = stream(&[0, 1, 1, 0, 2], &[0, 9, 10, 19, 20]);
        let m = aggregate(&s, 10, 3, true).unwrap();
        assert_eq!(m.num_bins(), 3);
        assert_eq!(m.column(0), vec![1, 1, 0]);
        assert_eq!(m.column(1), vec![1, 1, 0]);
        assert_eq!(m.column(2), vec![0, 0, 1]);
    }

    #[test]
    fn test_origin_follows_min_without_start_at_zero() {
        let s = stream(&[0, 0], &[1000, 1015]);
        let from_min = aggregate(&s, 10, 1, false).unwrap();
        assert_eq!(from_min.origin(), 1000);
        assert_eq!(from_min.row(0), &[1, 1]);

        let from_zero = aggregate(&s, 10, 1, true).unwrap();
        assert_eq!(from_zero.num_bins(), 102);
        assert_eq!(from_zero.get(0, 100), 1);
        assert_eq!(from_zero.get(0, 101), 1);
    }

    #[test]
    fn test_conservation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut timestamps: Vec<i64> = (0..1000).map(|_| rng.gen_range(0..1_000_000)).collect();
        timestamps.sort_unstable();
        let addresses: Vec<i64> = (0..1000).map(|_| rng.gen_range(0..64)).collect();
        let s = SpikeStream::new(addresses, timestamps).unwrap();

        for bin_size in [333, 1_000, 100_000, 999_999, 5_000_000] {
            let m = aggregate(&s, bin_size, 64, false).unwrap();
            assert_eq!(m.total(), 1000, "bin_size {bin_size}");
        }
        let ten_bins = aggregate(&s, 100_000, 64, true).unwrap();
        assert_eq!(ten_bins.num_bins(), 10);
        assert_eq!(ten_bins.total(), 1000);
    }

    #[test]
    fn test_errors() {
        let empty = SpikeStream::default();
        assert!(matches!(
            aggregate(&empty, 10, 4, true),
            Err(crate::Error::Usage(UsageError::EmptyStream { .. }))
        ));
        let s = stream(&[4], &[0]);
        assert!(matches!(
            aggregate(&s, 10, 4, true),
            Err(crate::Error::Usage(UsageError::AddressOutOfRange { address: 4, .. }))
        ));
        assert!(matches!(
            aggregate(&s, 0, 8, true),
            Err(crate::Error::Config(ConfigError::ZeroBinSize))
        ));
    }

    #[test]
    fn test_unsorted_input_is_rejected() {
        let s = stream(&[0, 1, 0], &[0, 30, 10]);
        assert!(matches!(
            aggregate(&s, 10, 2, true),
            Err(crate::Error::Usage(UsageError::InvalidParameter { operation: "aggregate", .. }))
        ));
        let m = aggregate(&s.time_ordered(), 10, 2, true).unwrap();
        assert_eq!(m.row(0), &[1, 1, 0, 0]);
        assert_eq!(m.row(1), &[0, 0, 0, 1]);
    }

    #[test]
    fn test_windows_cover_every_event_once() {
        let timestamps = [3, 3, 4, 50, 51, 52, 200];
        let windows = WindowedAggregator::new(25, false).unwrap().windows(&timestamps).unwrap();
        let ranges: Vec<_> = windows.collect();
        assert_eq!(ranges.len(), 8);
        assert_eq!(ranges[0], 0..3);
        assert_eq!(ranges[1], 3..6);
        assert_eq!(ranges[7], 6..7);
        assert_eq!(ranges.iter().map(ExactSizeIterator::len).sum::<usize>(), timestamps.len());
    }

    #[test]
    fn test_row_and_column_sums() {
        let s = stream(&[0, 1, 2, 3, 3], &[0, 0, 5, 12, 13]);
        let m = aggregate(&s, 10, 4, true).unwrap();
        assert_eq!(m.row_sums(), vec![1, 1, 1, 2]);
        assert_eq!(m.column_sums(0..2), vec![2, 0]);
        assert_eq!(m.column_sums(2..4), vec![1, 2]);
        assert_eq!(m.bin_start(1), 10);
    }
}
