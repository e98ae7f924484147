//! Structural validation
//!
//! Validation never mutates a stream and never fails by itself: every check
//! runs and the outcome is collected into a report. Callers that want strict
//! behaviour turn the report into a [`ValidationError`] with `into_result`.

use serde::Serialize;

use crate::config::{LocalizationConfig, RecordingConfig};
use crate::error::{Diagnostic, ValidationError};
use crate::types::{LocalizationStream, Population, PopulationStream, SpikeStream};

const COMPONENT: &str = "Validator";

fn first_negative(timestamps: &[i64]) -> Option<(usize, i64)> {
    timestamps.iter().copied().enumerate().find(|&(_, ts)| ts < 0)
}

fn first_disorder(timestamps: &[i64]) -> Option<(usize, i64, i64)> {
    timestamps
        .windows(2)
        .position(|w| w[1] < w[0])
        .map(|i| (i + 1, timestamps[i], timestamps[i + 1]))
}

// ============================================================================
// Spike Streams
// ============================================================================

/// Outcome of [`validate`]: three independent checks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Every timestamp is `>= 0`
    pub timestamps_nonnegative: bool,
    /// Timestamps are non-decreasing in storage order
    pub timestamps_ordered: bool,
    /// Every address lies in `[0, num_addresses)`
    pub addresses_in_range: bool,
    /// First violation of each failing check
    pub violations: Vec<ValidationError>,
    /// Every `(index, address)` outside the topology
    pub out_of_range: Vec<(usize, i64)>,
}

impl ValidationReport {
    /// Whether all three checks passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.timestamps_nonnegative && self.timestamps_ordered && self.addresses_in_range
    }

    /// Distinct out-of-range addresses in order of first appearance.
    #[must_use]
    pub fn offending_addresses(&self) -> Vec<i64> {
        let mut seen = Vec::new();
        for &(_, address) in &self.out_of_range {
            if !seen.contains(&address) {
                seen.push(address);
            }
        }
        seen
    }

    /// Tagged diagnostics, one per failing check.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.violations
            .iter()
            .map(|v| Diagnostic::new(COMPONENT, "check", v.kind(), v.to_string()))
            .collect()
    }

    /// Strict mode: fail with the first violation found.
    ///
    /// # Errors
    ///
    /// Returns the violation of the first failing check, in the order
    /// negative timestamp, timestamp order, address range.
    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.violations.into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }
}

/// Check timestamp sign, timestamp order and address range.
#[must_use]
pub fn validate(stream: &SpikeStream, config: &RecordingConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    let limit = config.num_addresses();

    let negative = first_negative(stream.timestamps());
    report.timestamps_nonnegative = negative.is_none();
    if let Some((index, timestamp)) = negative {
        report.violations.push(ValidationError::TimestampNegative { index, timestamp });
    }

    let disorder = first_disorder(stream.timestamps());
    report.timestamps_ordered = disorder.is_none();
    if let Some((index, previous, current)) = disorder {
        report.violations.push(ValidationError::TimestampOrder { index, previous, current });
    }

    report.out_of_range = stream
        .addresses()
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, address)| !config.contains_address(address))
        .collect();
    report.addresses_in_range = report.out_of_range.is_empty();
    if let Some(&(index, address)) = report.out_of_range.first() {
        report.violations.push(ValidationError::AddressRange { index, address, limit });
    }

    report
}

// ============================================================================
// Localization Streams
// ============================================================================

/// Checks on one localization population.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PopulationReport {
    /// Every timestamp is `>= 0`
    pub timestamps_nonnegative: bool,
    /// Timestamps are non-decreasing
    pub timestamps_ordered: bool,
    /// Every channel lies in the configured inclusive range
    pub channels_in_range: bool,
    /// Every neuron id is below the configured population size
    pub neuron_ids_in_range: bool,
    /// First violation of each failing check
    pub violations: Vec<ValidationError>,
}

impl PopulationReport {
    /// Whether all four checks passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.timestamps_nonnegative
            && self.timestamps_ordered
            && self.channels_in_range
            && self.neuron_ids_in_range
    }
}

/// Outcome of [`validate_localization`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LocalizationReport {
    /// MSO checks
    pub mso: PopulationReport,
    /// LSO checks
    pub lso: PopulationReport,
}

impl LocalizationReport {
    /// Whether both populations passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.mso.is_valid() && self.lso.is_valid()
    }

    /// Tagged diagnostics for both populations.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.mso
            .violations
            .iter()
            .chain(&self.lso.violations)
            .map(|v| Diagnostic::new(COMPONENT, "check_localization", v.kind(), v.to_string()))
            .collect()
    }

    /// Strict mode: fail with the first MSO violation, then the first LSO one.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.mso.violations.into_iter().chain(self.lso.violations).next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }
}

fn validate_population(
    stream: &PopulationStream,
    config: &LocalizationConfig,
    population: Population,
) -> PopulationReport {
    let bounds = config.bounds(population);
    let mut report = PopulationReport::default();

    let negative = first_negative(stream.timestamps());
    report.timestamps_nonnegative = negative.is_none();
    if let Some((index, timestamp)) = negative {
        report.violations.push(ValidationError::TimestampNegative { index, timestamp });
    }

    let disorder = first_disorder(stream.timestamps());
    report.timestamps_ordered = disorder.is_none();
    if let Some((index, previous, current)) = disorder {
        report.violations.push(ValidationError::TimestampOrder { index, previous, current });
    }

    let bad_channel = stream
        .channels()
        .iter()
        .position(|&channel| !bounds.contains_channel(channel));
    report.channels_in_range = bad_channel.is_none();
    if let Some(index) = bad_channel {
        let channel = stream.channels()[index];
        report.violations.push(ValidationError::ChannelRange { population, index, channel });
    }

    let bad_neuron = stream
        .neuron_ids()
        .iter()
        .position(|&neuron_id| !bounds.contains_neuron(neuron_id));
    report.neuron_ids_in_range = bad_neuron.is_none();
    if let Some(index) = bad_neuron {
        let neuron_id = stream.neuron_ids()[index];
        report.violations.push(ValidationError::NeuronIdRange { population, index, neuron_id });
    }

    report
}

/// Check both localization populations against their bounds.
#[must_use]
pub fn validate_localization(
    stream: &LocalizationStream,
    config: &LocalizationConfig,
) -> LocalizationReport {
    LocalizationReport {
        mso: validate_population(&stream.mso, config, Population::Mso),
        lso: validate_population(&stream.lso, config, Population::Lso),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonoStereo, OnOffBoth, PopulationBounds};
    use crate::error::ErrorKind;

    fn two_channel_config() -> RecordingConfig {
        RecordingConfig::builder(2)
            .on_off_both(OnOffBoth::Both)
            .mono_stereo(MonoStereo::Mono)
            .build()
            .unwrap()
    }

    #[test]
    fn test_known_bad_input() {
        let stream = SpikeStream::new(vec![0, 5, -1], vec![10, 5, 20]).unwrap();
        let report = validate(&stream, &two_channel_config());

        assert!(report.timestamps_nonnegative);
        assert!(!report.timestamps_ordered);
        assert!(!report.addresses_in_range);
        assert_eq!(report.offending_addresses(), vec![5, -1]);
        assert_eq!(report.out_of_range, vec![(1, 5), (2, -1)]);

        let kinds: Vec<_> = report.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::TimestampOrder, ErrorKind::AddressRange]);
        assert!(report.diagnostics()[0].to_string().starts_with("[Validator.check] > TimestampOrderError"));
    }

    #[test]
    fn test_negative_timestamps_distinct_from_order() {
        let stream = SpikeStream::new(vec![0, 1], vec![-3, 4]).unwrap();
        let report = validate(&stream, &two_channel_config());
        assert!(!report.timestamps_nonnegative);
        assert!(report.timestamps_ordered);
        assert_eq!(
            report.into_result(),
            Err(ValidationError::TimestampNegative { index: 0, timestamp: -3 })
        );
    }

    #[test]
    fn test_valid_stream() {
        let stream = SpikeStream::new(vec![0, 3, 3], vec![0, 0, 7]).unwrap();
        let report = validate(&stream, &two_channel_config());
        assert!(report.is_valid());
        assert!(report.diagnostics().is_empty());
        assert_eq!(report.into_result(), Ok(()));
    }

    #[test]
    fn test_stereo_doubles_range() {
        let stream = SpikeStream::new(vec![7], vec![0]).unwrap();
        let mono = validate(&stream, &two_channel_config());
        let stereo = validate(&stream, &two_channel_config().as_stereo());
        assert!(!mono.addresses_in_range);
        assert!(stereo.addresses_in_range);
    }

    #[test]
    fn test_localization_checks() {
        let config = LocalizationConfig::new(
            PopulationBounds::new(2, 5, 4),
            PopulationBounds::new(0, 3, 2),
        )
        .unwrap();
        let mut stream = LocalizationStream::default();
        stream.mso.push(0, 2, 0);
        stream.mso.push(4, 3, 10);
        stream.lso.push(1, 9, 5);
        stream.lso.push(0, 0, 1);

        let report = validate_localization(&stream, &config);
        assert!(report.mso.channels_in_range);
        assert!(!report.mso.neuron_ids_in_range);
        assert!(!report.lso.channels_in_range);
        assert!(!report.lso.timestamps_ordered);
        assert!(!report.is_valid());
        assert_eq!(report.diagnostics().len(), 3);
        assert_eq!(
            report.into_result(),
            Err(ValidationError::NeuronIdRange { population: Population::Mso, index: 1, neuron_id: 4 })
        );
    }
}
