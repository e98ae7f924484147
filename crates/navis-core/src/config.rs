//! Recording and localization configuration
//!
//! Both records are passed by reference to every operation and never mutated
//! by the core. A transform that changes the stream topology (mono to stereo,
//! phase-lock) is paired with a helper here that derives the configuration
//! describing its output.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Population;

// ============================================================================
// Enumerations
// ============================================================================

/// Width of the address field in an AEDAT record.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AddressSize {
    /// 16-bit addresses
    #[default]
    Two,
    /// 32-bit addresses
    Four,
}

impl AddressSize {
    /// Width in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Width in bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Two => 16,
            Self::Four => 32,
        }
    }

    /// Bytes per record: address plus the 4-byte timestamp.
    #[inline]
    #[must_use]
    pub const fn record_size(self) -> usize {
        self.bytes() + 4
    }

    /// Largest address representable at this width.
    #[inline]
    #[must_use]
    pub const fn max_address(self) -> i64 {
        match self {
            Self::Two => u16::MAX as i64,
            Self::Four => u32::MAX as i64,
        }
    }
}

impl TryFrom<u8> for AddressSize {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            got => Err(ConfigError::InvalidAddressSize { got }),
        }
    }
}

impl From<AddressSize> for u8 {
    fn from(size: AddressSize) -> Self {
        match size {
            AddressSize::Two => 2,
            AddressSize::Four => 4,
        }
    }
}

/// Number of ears in the recording.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonoStereo {
    /// Single cochlea
    #[default]
    Mono,
    /// Left and right cochleae, right in the upper half of the address space
    Stereo,
}

impl MonoStereo {
    /// Address-space multiplier (1 or 2).
    #[inline]
    #[must_use]
    pub const fn factor(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    /// Whether this is a stereo recording.
    #[inline]
    #[must_use]
    pub const fn is_stereo(self) -> bool {
        matches!(self, Self::Stereo)
    }
}

/// Polarity layout of each channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnOffBoth {
    /// One event stream per channel
    Single,
    /// ON and OFF interleaved, `address = 2 * channel + polarity`
    #[default]
    Both,
}

impl OnOffBoth {
    /// Address-space multiplier (1 or 2).
    #[inline]
    #[must_use]
    pub const fn factor(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Both => 2,
        }
    }

    /// Whether ON and OFF addresses are both present.
    #[inline]
    #[must_use]
    pub const fn is_both(self) -> bool {
        matches!(self, Self::Both)
    }
}

// ============================================================================
// Recording Configuration
// ============================================================================

/// Default raw tick length in microseconds.
pub const DEFAULT_TIMESTAMP_TICK: f64 = 0.2;

/// Default aggregation window in microseconds.
pub const DEFAULT_BIN_SIZE: u64 = 20_000;

/// Topology and time base of a recording.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Frequency channels per ear
    pub num_channels: u32,
    /// Mono or stereo
    pub mono_stereo: MonoStereo,
    /// AEDAT address width
    pub address_size: AddressSize,
    /// Microseconds per raw timestamp tick
    pub timestamp_tick: f64,
    /// Aggregation window in microseconds
    pub bin_size: u64,
    /// Single polarity or ON+OFF
    pub on_off_both: OnOffBoth,
    /// Zero-base timestamps when normalizing
    pub reset_timestamp: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            num_channels: 64,
            mono_stereo: MonoStereo::Mono,
            address_size: AddressSize::Two,
            timestamp_tick: DEFAULT_TIMESTAMP_TICK,
            bin_size: DEFAULT_BIN_SIZE,
            on_off_both: OnOffBoth::Both,
            reset_timestamp: true,
        }
    }
}

impl RecordingConfig {
    /// Configuration with default time base and polarity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroChannels`] if `num_channels` is zero.
    pub fn new(num_channels: u32, mono_stereo: MonoStereo) -> Result<Self, ConfigError> {
        Self::builder(num_channels).mono_stereo(mono_stereo).build()
    }

    /// Start building a configuration.
    #[must_use]
    pub fn builder(num_channels: u32) -> RecordingConfigBuilder {
        RecordingConfigBuilder { config: Self { num_channels, ..Self::default() } }
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_channels == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        if !self.timestamp_tick.is_finite() || self.timestamp_tick <= 0.0 {
            return Err(ConfigError::InvalidTimestampTick { tick: self.timestamp_tick });
        }
        if self.bin_size == 0 {
            return Err(ConfigError::ZeroBinSize);
        }
        Ok(())
    }

    /// Addresses belonging to one ear: `num_channels * on_off_both_factor`.
    #[inline]
    #[must_use]
    pub const fn addresses_per_ear(&self) -> usize {
        self.num_channels as usize * self.on_off_both.factor()
    }

    /// Size of the full address space.
    #[inline]
    #[must_use]
    pub const fn num_addresses(&self) -> usize {
        self.addresses_per_ear() * self.mono_stereo.factor()
    }

    /// Whether `address` belongs to the declared topology.
    #[inline]
    #[must_use]
    pub const fn contains_address(&self, address: i64) -> bool {
        address >= 0 && (address as u64) < self.num_addresses() as u64
    }

    /// Topology produced by a mono to stereo merge.
    #[must_use]
    pub const fn as_stereo(&self) -> Self {
        let mut config = *self;
        config.mono_stereo = MonoStereo::Stereo;
        config
    }

    /// Topology produced by extracting one ear.
    #[must_use]
    pub const fn as_mono(&self) -> Self {
        let mut config = *self;
        config.mono_stereo = MonoStereo::Mono;
        config
    }

    /// Topology produced by phase-locking (channel id only).
    #[must_use]
    pub const fn as_single_polarity(&self) -> Self {
        let mut config = *self;
        config.on_off_both = OnOffBoth::Single;
        config
    }

    /// Configuration for a stream that still holds raw device ticks.
    ///
    /// Ticks map one to one onto encoded timestamps, so saving an
    /// unnormalized stream writes its ticks back unchanged.
    #[must_use]
    pub const fn as_raw_ticks(&self) -> Self {
        let mut config = *self;
        config.timestamp_tick = 1.0;
        config.reset_timestamp = false;
        config
    }
}

/// Builder for [`RecordingConfig`].
#[derive(Clone, Debug)]
pub struct RecordingConfigBuilder {
    config: RecordingConfig,
}

impl RecordingConfigBuilder {
    /// Set mono or stereo.
    #[must_use]
    pub fn mono_stereo(mut self, mono_stereo: MonoStereo) -> Self {
        self.config.mono_stereo = mono_stereo;
        self
    }

    /// Set the AEDAT address width.
    #[must_use]
    pub fn address_size(mut self, address_size: AddressSize) -> Self {
        self.config.address_size = address_size;
        self
    }

    /// Set microseconds per raw tick.
    #[must_use]
    pub fn timestamp_tick(mut self, tick: f64) -> Self {
        self.config.timestamp_tick = tick;
        self
    }

    /// Set the aggregation window.
    #[must_use]
    pub fn bin_size(mut self, bin_size: u64) -> Self {
        self.config.bin_size = bin_size;
        self
    }

    /// Set the polarity layout.
    #[must_use]
    pub fn on_off_both(mut self, on_off_both: OnOffBoth) -> Self {
        self.config.on_off_both = on_off_both;
        self
    }

    /// Enable or disable zero-basing.
    #[must_use]
    pub fn reset_timestamp(mut self, reset: bool) -> Self {
        self.config.reset_timestamp = reset;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn build(self) -> Result<RecordingConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Localization Configuration
// ============================================================================

/// Channel range and size of one localization population.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationBounds {
    /// First frequency channel (inclusive)
    pub start_channel: u32,
    /// Last frequency channel (inclusive)
    pub end_channel: u32,
    /// Neurons per frequency channel
    pub num_neurons_channel: u32,
}

impl PopulationBounds {
    /// Create bounds for one population.
    #[must_use]
    pub const fn new(start_channel: u32, end_channel: u32, num_neurons_channel: u32) -> Self {
        Self { start_channel, end_channel, num_neurons_channel }
    }

    /// Number of channels covered by the range.
    #[must_use]
    pub const fn num_channels(&self) -> usize {
        (self.end_channel.saturating_sub(self.start_channel) as u64 + 1) as usize
    }

    /// Whether `channel` lies in the inclusive range.
    #[must_use]
    pub const fn contains_channel(&self, channel: i64) -> bool {
        channel >= self.start_channel as i64 && channel <= self.end_channel as i64
    }

    /// Whether `neuron_id` is below the population size.
    #[must_use]
    pub const fn contains_neuron(&self, neuron_id: i64) -> bool {
        neuron_id >= 0 && neuron_id < self.num_neurons_channel as i64
    }

    fn validate(&self, population: Population) -> Result<(), ConfigError> {
        // The inclusive channel count must fit in a u32.
        if self.start_channel > self.end_channel
            || (self.end_channel - self.start_channel).checked_add(1).is_none()
        {
            return Err(ConfigError::InvalidChannelRange {
                population,
                start: self.start_channel,
                end: self.end_channel,
            });
        }
        if self.num_neurons_channel == 0 {
            return Err(ConfigError::ZeroNeuronsPerChannel { population });
        }
        Ok(())
    }
}

/// Bounds for the MSO and LSO populations of a dual-model recording.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationConfig {
    /// Medial superior olive
    pub mso: PopulationBounds,
    /// Lateral superior olive
    pub lso: PopulationBounds,
}

impl LocalizationConfig {
    /// Validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChannelRange`] or
    /// [`ConfigError::ZeroNeuronsPerChannel`].
    pub fn new(mso: PopulationBounds, lso: PopulationBounds) -> Result<Self, ConfigError> {
        let config = Self { mso, lso };
        config.validate()?;
        Ok(config)
    }

    /// Check both populations.
    ///
    /// # Errors
    ///
    /// Returns the first invalid population found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mso.validate(Population::Mso)?;
        self.lso.validate(Population::Lso)
    }

    /// Bounds of one population.
    #[must_use]
    pub const fn bounds(&self, population: Population) -> &PopulationBounds {
        match population {
            Population::Mso => &self.mso,
            Population::Lso => &self.lso,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_size_rejects_other_widths() {
        assert_eq!(AddressSize::try_from(2), Ok(AddressSize::Two));
        assert_eq!(AddressSize::try_from(4), Ok(AddressSize::Four));
        assert_eq!(
            AddressSize::try_from(3),
            Err(ConfigError::InvalidAddressSize { got: 3 })
        );
    }

    #[test]
    fn test_num_addresses() {
        let config = RecordingConfig::builder(2).on_off_both(OnOffBoth::Both).build().unwrap();
        assert_eq!(config.num_addresses(), 4);
        assert_eq!(config.as_stereo().num_addresses(), 8);
        assert_eq!(config.as_single_polarity().num_addresses(), 2);
        assert!(config.contains_address(3));
        assert!(!config.contains_address(4));
        assert!(!config.contains_address(-1));
    }

    #[test]
    fn test_raw_tick_config() {
        let config = RecordingConfig::default();
        let raw = config.as_raw_ticks();
        assert!((raw.timestamp_tick - 1.0).abs() < f64::EPSILON);
        assert!(!raw.reset_timestamp);
        assert_eq!(raw.num_addresses(), config.num_addresses());
        assert_eq!(raw.address_size, config.address_size);
        assert!(raw.validate().is_ok());
    }

    #[test]
    fn test_builder_validates() {
        assert_eq!(RecordingConfig::new(0, MonoStereo::Mono), Err(ConfigError::ZeroChannels));
        assert!(matches!(
            RecordingConfig::builder(4).timestamp_tick(0.0).build(),
            Err(ConfigError::InvalidTimestampTick { .. })
        ));
        assert_eq!(
            RecordingConfig::builder(4).bin_size(0).build(),
            Err(ConfigError::ZeroBinSize)
        );
    }

    #[test]
    fn test_defaults() {
        let config = RecordingConfig::new(64, MonoStereo::Stereo).unwrap();
        assert_eq!(config.address_size, AddressSize::Two);
        assert!((config.timestamp_tick - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.bin_size, 20_000);
        assert!(config.on_off_both.is_both());
        assert!(config.reset_timestamp);
    }

    #[test]
    fn test_json_roundtrip_and_partial_fields() {
        let config = RecordingConfig::builder(32)
            .mono_stereo(MonoStereo::Stereo)
            .address_size(AddressSize::Four)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"address_size\":4"));
        let parsed: RecordingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let partial: RecordingConfig =
            serde_json::from_str(r#"{"num_channels": 16, "mono_stereo": "stereo"}"#).unwrap();
        assert_eq!(partial.num_channels, 16);
        assert_eq!(partial.bin_size, DEFAULT_BIN_SIZE);

        let bad: Result<RecordingConfig, _> = serde_json::from_str(r#"{"address_size": 3}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_localization_bounds() {
        let bounds = PopulationBounds::new(0, 15, 16);
        assert_eq!(bounds.num_channels(), 16);
        assert!(bounds.contains_channel(15));
        assert!(!bounds.contains_channel(16));
        assert!(bounds.contains_neuron(0));
        assert!(!bounds.contains_neuron(16));

        let err = LocalizationConfig::new(PopulationBounds::new(5, 2, 4), bounds);
        assert!(matches!(
            err,
            Err(ConfigError::InvalidChannelRange { population: Population::Mso, .. })
        ));
        let err = LocalizationConfig::new(bounds, PopulationBounds::new(0, 1, 0));
        assert_eq!(err, Err(ConfigError::ZeroNeuronsPerChannel { population: Population::Lso }));
    }

    #[test]
    fn test_full_width_channel_range() {
        let widest = PopulationBounds::new(0, u32::MAX, 1);
        assert_eq!(widest.num_channels(), u32::MAX as usize + 1);
        let err = LocalizationConfig::new(PopulationBounds::new(0, 15, 16), widest);
        assert!(matches!(
            err,
            Err(ConfigError::InvalidChannelRange { population: Population::Lso, end: u32::MAX, .. })
        ));

        let top = PopulationBounds::new(1, u32::MAX, 1);
        assert_eq!(top.num_channels(), u32::MAX as usize);
        assert!(LocalizationConfig::new(top, top).is_ok());
    }
}
