//! Error types for the NAVIS event-stream core
//!
//! Problems are split by how they propagate:
//! - [`ConfigError`] and [`UsageError`] abort the operation that raised them.
//! - Validation findings are collected into reports made of [`Diagnostic`]
//!   entries and are only turned into a [`ValidationError`] when the caller
//!   asks for strict behaviour.
//! - Truncated records and dropped localization events are tallied by the
//!   decoders and surfaced as warnings.

use core::fmt;

use serde::Serialize;

use crate::types::Population;

// ============================================================================
// Classification
// ============================================================================

/// Closed classification of every problem the core can report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Invalid configuration value or combination
    Configuration,
    /// A timestamp below zero
    TimestampNegative,
    /// A timestamp lower than its predecessor
    TimestampOrder,
    /// An address outside the declared channel topology
    AddressRange,
    /// A localization channel outside the configured population range
    ChannelRange,
    /// A localization neuron id outside the configured population size
    NeuronIdRange,
    /// Operation invoked on an incompatible stream topology
    Usage,
    /// Trailing partial record discarded at end of input
    TruncatedRecord,
    /// Localization events discarded during decode
    DroppedEvent,
    /// Text line that did not match the expected layout
    MalformedLine,
}

impl ErrorKind {
    /// Name used in tagged diagnostic strings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::TimestampNegative => "TimestampNegativeError",
            Self::TimestampOrder => "TimestampOrderError",
            Self::AddressRange => "AddressRangeError",
            Self::ChannelRange => "ChannelRangeError",
            Self::NeuronIdRange => "NeuronIdRangeError",
            Self::Usage => "UsageError",
            Self::TruncatedRecord => "TruncatedRecordWarning",
            Self::DroppedEvent => "DroppedEventWarning",
            Self::MalformedLine => "MalformedLineWarning",
        }
    }

    /// Whether this kind is non-fatal by definition.
    #[must_use]
    pub const fn is_warning(self) -> bool {
        matches!(self, Self::TruncatedRecord | Self::DroppedEvent | Self::MalformedLine)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified message tagged with the component and operation that produced it.
///
/// Renders as `[Component.operation] > KindName: message`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Component that produced the diagnostic (e.g. `"Validator"`)
    pub component: &'static str,
    /// Operation within the component (e.g. `"check"`)
    pub operation: &'static str,
    /// Classification callers can branch on
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        component: &'static str,
        operation: &'static str,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self { component, operation, kind, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}.{}] > {}: {}", self.component, self.operation, self.kind, self.message)
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Invalid recording or localization configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConfigError {
    /// Address width other than 2 or 4 bytes
    InvalidAddressSize {
        /// Requested width in bytes
        got: u8,
    },
    /// Channel count of zero
    ZeroChannels,
    /// Timestamp tick that is not a finite positive number
    InvalidTimestampTick {
        /// Requested tick
        tick: f64,
    },
    /// Aggregation bin width of zero
    ZeroBinSize,
    /// Localization channel range with start after end, or too wide to count
    InvalidChannelRange {
        /// Population the range belongs to
        population: Population,
        /// First channel (inclusive)
        start: u32,
        /// Last channel (inclusive)
        end: u32,
    },
    /// Localization population with no neurons per channel
    ZeroNeuronsPerChannel {
        /// Population with the empty size
        population: Population,
    },
    /// Unrecognised file format name
    UnknownFormat {
        /// The name that failed to parse
        name: String,
    },
}

impl ConfigError {
    /// Always [`ErrorKind::Configuration`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddressSize { got } => {
                write!(f, "Only address sizes of 2 and 4 bytes are supported, got {got}")
            }
            Self::ZeroChannels => write!(f, "Number of channels must be greater than zero"),
            Self::InvalidTimestampTick { tick } => {
                write!(f, "Timestamp tick must be a finite positive number, got {tick}")
            }
            Self::ZeroBinSize => write!(f, "Bin size must be greater than zero"),
            Self::InvalidChannelRange { population, start, end } => {
                write!(f, "{population} channel range {start}..={end} is invalid")
            }
            Self::ZeroNeuronsPerChannel { population } => {
                write!(f, "{population} population must have at least one neuron per channel")
            }
            Self::UnknownFormat { name } => write!(f, "Unknown file format '{name}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Usage Errors
// ============================================================================

/// Operation invoked on a stream or topology it does not support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UsageError {
    /// Operation needs ON and OFF addresses
    RequiresBothPolarities {
        /// Operation name
        operation: &'static str,
    },
    /// Operation needs a stereo recording
    RequiresStereo {
        /// Operation name
        operation: &'static str,
    },
    /// Operation needs a mono recording
    RequiresMono {
        /// Operation name
        operation: &'static str,
    },
    /// Operation needs at least one event
    EmptyStream {
        /// Operation name
        operation: &'static str,
    },
    /// Channel extraction called with no addresses
    EmptyAddressSet,
    /// Time range whose start lies after its end
    InvalidTimeRange {
        /// Range start
        init: i64,
        /// Range end
        end: i64,
    },
    /// Address outside the range the operation was sized for
    AddressOutOfRange {
        /// Operation name
        operation: &'static str,
        /// Offending address
        address: i64,
        /// Exclusive upper bound
        limit: usize,
    },
    /// Timestamp the operation cannot represent
    TimestampOutOfRange {
        /// Operation name
        operation: &'static str,
        /// Offending timestamp
        timestamp: i64,
    },
    /// Parameter outside its valid domain
    InvalidParameter {
        /// Operation name
        operation: &'static str,
        /// What is wrong
        reason: &'static str,
    },
}

impl UsageError {
    /// Always [`ErrorKind::Usage`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Usage
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequiresBothPolarities { operation } => write!(
                f,
                "{operation} can only be applied to streams with both ON and OFF addresses"
            ),
            Self::RequiresStereo { operation } => {
                write!(f, "{operation} is only available for stereo recordings")
            }
            Self::RequiresMono { operation } => {
                write!(f, "{operation} cannot be performed over a stereo recording")
            }
            Self::EmptyStream { operation } => write!(f, "{operation} needs at least one event"),
            Self::EmptyAddressSet => write!(f, "No addresses were requested for extraction"),
            Self::InvalidTimeRange { init, end } => {
                write!(f, "Time range start {init} lies after its end {end}")
            }
            Self::AddressOutOfRange { operation, address, limit } => {
                write!(f, "{operation}: address {address} outside [0, {limit})")
            }
            Self::TimestampOutOfRange { operation, timestamp } => {
                write!(f, "{operation}: timestamp {timestamp} cannot be represented")
            }
            Self::InvalidParameter { operation, reason } => write!(f, "{operation}: {reason}"),
        }
    }
}

impl std::error::Error for UsageError {}

// ============================================================================
// Stream Construction Errors
// ============================================================================

/// Violation of the parallel-array invariant while building a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamError {
    /// Address and timestamp arrays differ in length
    LengthMismatch {
        /// Number of addresses
        addresses: usize,
        /// Number of timestamps
        timestamps: usize,
    },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { addresses, timestamps } => write!(
                f,
                "Addresses and timestamps differ in length: {addresses} vs {timestamps}"
            ),
        }
    }
}

impl std::error::Error for StreamError {}

// ============================================================================
// Validation Errors (strict mode)
// ============================================================================

/// First structural violation found, raised only by strict validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationError {
    /// A negative timestamp
    TimestampNegative {
        /// Event index
        index: usize,
        /// Offending timestamp
        timestamp: i64,
    },
    /// A timestamp lower than the one before it
    TimestampOrder {
        /// Event index
        index: usize,
        /// Timestamp of the previous event
        previous: i64,
        /// Timestamp of this event
        current: i64,
    },
    /// An address outside the topology
    AddressRange {
        /// Event index
        index: usize,
        /// Offending address
        address: i64,
        /// Exclusive upper bound
        limit: usize,
    },
    /// A localization channel outside its population range
    ChannelRange {
        /// Population the event belongs to
        population: Population,
        /// Event index
        index: usize,
        /// Offending channel
        channel: i64,
    },
    /// A localization neuron id outside its population size
    NeuronIdRange {
        /// Population the event belongs to
        population: Population,
        /// Event index
        index: usize,
        /// Offending neuron id
        neuron_id: i64,
    },
}

impl ValidationError {
    /// Classification of this violation.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TimestampNegative { .. } => ErrorKind::TimestampNegative,
            Self::TimestampOrder { .. } => ErrorKind::TimestampOrder,
            Self::AddressRange { .. } => ErrorKind::AddressRange,
            Self::ChannelRange { .. } => ErrorKind::ChannelRange,
            Self::NeuronIdRange { .. } => ErrorKind::NeuronIdRange,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimestampNegative { index, timestamp } => {
                write!(f, "Event {index} has negative timestamp {timestamp}")
            }
            Self::TimestampOrder { index, previous, current } => {
                write!(f, "Event {index} has timestamp {current} lower than its predecessor {previous}")
            }
            Self::AddressRange { index, address, limit } => {
                write!(f, "Event {index} has address {address} outside [0, {limit})")
            }
            Self::ChannelRange { population, index, channel } => {
                write!(f, "{population} event {index} has out-of-range channel {channel}")
            }
            Self::NeuronIdRange { population, index, neuron_id } => {
                write!(f, "{population} event {index} has out-of-range neuron id {neuron_id}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Umbrella Error
// ============================================================================

/// Any error raised by the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Error {
    /// Invalid configuration
    Config(ConfigError),
    /// Incompatible operation
    Usage(UsageError),
    /// Broken parallel-array invariant
    Stream(StreamError),
    /// Strict validation failure
    Validation(ValidationError),
}

impl Error {
    /// Classification of the wrapped error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(e) => e.kind(),
            Self::Usage(e) => e.kind(),
            Self::Stream(_) => ErrorKind::Usage,
            Self::Validation(e) => e.kind(),
        }
    }

    /// Tag this error with the component and operation that raised it.
    #[must_use]
    pub fn to_diagnostic(&self, component: &'static str, operation: &'static str) -> Diagnostic {
        Diagnostic::new(component, operation, self.kind(), self.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Usage(e) => e.fmt(f),
            Self::Stream(e) => e.fmt(f),
            Self::Validation(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Usage(e) => Some(e),
            Self::Stream(e) => Some(e),
            Self::Validation(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<UsageError> for Error {
    fn from(e: UsageError) -> Self {
        Self::Usage(e)
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

/// Result alias for core operations.
pub type Result<T> = core::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_tagging() {
        let diag = Diagnostic::new(
            "Validator",
            "check",
            ErrorKind::TimestampOrder,
            "event 3 goes back in time",
        );
        assert_eq!(
            diag.to_string(),
            "[Validator.check] > TimestampOrderError: event 3 goes back in time"
        );
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let negative = ValidationError::TimestampNegative { index: 0, timestamp: -1 };
        let order = ValidationError::TimestampOrder { index: 1, previous: 5, current: 2 };
        let range = ValidationError::AddressRange { index: 2, address: 9, limit: 4 };

        assert_eq!(negative.kind(), ErrorKind::TimestampNegative);
        assert_eq!(order.kind(), ErrorKind::TimestampOrder);
        assert_eq!(range.kind(), ErrorKind::AddressRange);
    }

    #[test]
    fn test_usage_error_conversion() {
        let err: Error = UsageError::RequiresStereo { operation: "disparity" }.into();
        assert_eq!(err.kind(), ErrorKind::Usage);
        let diag = err.to_diagnostic("Views", "disparity");
        assert!(diag.to_string().starts_with("[Views.disparity] > UsageError:"));
    }

    #[test]
    fn test_warning_kinds() {
        assert!(ErrorKind::TruncatedRecord.is_warning());
        assert!(ErrorKind::DroppedEvent.is_warning());
        assert!(!ErrorKind::AddressRange.is_warning());
    }
}
