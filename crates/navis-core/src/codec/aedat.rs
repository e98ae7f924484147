//! AEDAT binary codec
//!
//! # Layout
//!
//! ```text
//! [# header line\n]*  [address (2|4 bytes BE) | timestamp (4 bytes BE)]*
//! ```
//!
//! The header is any run of lines beginning with `#`. Records hold raw ticks;
//! conversion to microseconds is left to [`crate::normalize`]. A trailing
//! partial record is discarded and reported through [`DecodeReport`].
//!
//! # Localization words
//!
//! With `W = 8 * address_size` bits per word:
//!
//! | bits        | field                                   |
//! |-------------|-----------------------------------------|
//! | `W-1`       | model (0 auditory, 1 localization)      |
//! | `W-2`       | population (0 MSO, 1 LSO)               |
//! | `W-8..W-2`  | neuron id (6 bits)                      |
//! | `1..8`      | frequency channel (7 bits)              |
//! | `0`         | polarity (ignored for localization)     |

use serde::{Deserialize, Serialize};

use super::{Encoded, LocalizationDecode, OutputFormat, StreamEncoder};
use crate::config::{AddressSize, LocalizationConfig, RecordingConfig};
use crate::error::{Diagnostic, ErrorKind, Result, UsageError};
use crate::normalize::micros_to_ticks;
use crate::types::{Population, SpikeEvent, SpikeStream};

/// Width of the neuron-id field.
pub const NEURON_ID_BITS: u32 = 6;

/// Width of the frequency-channel field.
pub const CHANNEL_BITS: u32 = 7;

const NEURON_ID_MASK: u32 = (1 << NEURON_ID_BITS) - 1;
const CHANNEL_MASK: u32 = (1 << CHANNEL_BITS) - 1;

// ============================================================================
// Decode
// ============================================================================

/// Framing facts gathered while decoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeReport {
    /// Bytes consumed by the `#` header
    pub header_len: usize,
    /// Complete records decoded
    pub records: usize,
    /// Bytes of the discarded partial record
    pub trailing_bytes: usize,
}

impl DecodeReport {
    /// Warning for a discarded partial record, if any.
    #[must_use]
    pub fn truncation_warning(&self) -> Option<Diagnostic> {
        (self.trailing_bytes > 0).then(|| {
            Diagnostic::new(
                "Aedat",
                "decode",
                ErrorKind::TruncatedRecord,
                format!(
                    "discarded {} trailing bytes after {} records",
                    self.trailing_bytes, self.records
                ),
            )
        })
    }
}

/// Length of the leading `#` header.
///
/// Scanning stops at the first line that does not start with `#`. A header
/// line with no terminating newline runs to the end of the input.
#[must_use]
pub fn header_len(bytes: &[u8]) -> usize {
    let mut pos = 0;
    while bytes.get(pos) == Some(&b'#') {
        match bytes[pos..].iter().position(|&b| b == b'\n') {
            Some(newline) => pos += newline + 1,
            None => return bytes.len(),
        }
    }
    pos
}

fn records(bytes: &[u8], address_size: AddressSize) -> (impl Iterator<Item = (u32, u32)> + '_, DecodeReport) {
    let header_len = header_len(bytes);
    let body = &bytes[header_len..];
    let record_size = address_size.record_size();
    let report = DecodeReport {
        header_len,
        records: body.len() / record_size,
        trailing_bytes: body.len() % record_size,
    };
    let iter = body.chunks_exact(record_size).map(move |record| {
        let (address, timestamp) = record.split_at(address_size.bytes());
        let address = match address_size {
            AddressSize::Two => u32::from(u16::from_be_bytes([address[0], address[1]])),
            AddressSize::Four => u32::from_be_bytes([address[0], address[1], address[2], address[3]]),
        };
        let timestamp = u32::from_be_bytes([timestamp[0], timestamp[1], timestamp[2], timestamp[3]]);
        (address, timestamp)
    });
    (iter, report)
}

/// Decode an AEDAT byte buffer into a stream of raw-tick timestamps.
#[must_use]
pub fn decode(bytes: &[u8], address_size: AddressSize) -> SpikeStream {
    decode_with_report(bytes, address_size).0
}

/// Decode and also return framing facts.
#[must_use]
pub fn decode_with_report(bytes: &[u8], address_size: AddressSize) -> (SpikeStream, DecodeReport) {
    let (iter, report) = records(bytes, address_size);
    let mut stream = SpikeStream::with_capacity(report.records);
    stream.extend(iter.map(|(address, timestamp)| {
        SpikeEvent::new(i64::from(address), i64::from(timestamp))
    }));
    (stream, report)
}

// ============================================================================
// Localization Words
// ============================================================================

/// Fields of a localization-model address word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LocalizationWord {
    /// MSO or LSO
    pub population: Population,
    /// Neuron id within the channel
    pub neuron_id: u32,
    /// Frequency channel
    pub channel: u32,
}

impl LocalizationWord {
    /// Whether `word` originates from the localization model.
    #[inline]
    #[must_use]
    pub const fn is_localization(word: u32, address_size: AddressSize) -> bool {
        (word >> (address_size.bits() - 1)) & 1 == 1
    }

    /// Split a localization word into its fields.
    #[must_use]
    pub const fn unpack(word: u32, address_size: AddressSize) -> Self {
        let bits = address_size.bits();
        Self {
            population: Population::from_bit((word >> (bits - 2)) & 1 == 1),
            neuron_id: (word >> (bits - 8)) & NEURON_ID_MASK,
            channel: (word >> 1) & CHANNEL_MASK,
        }
    }

    /// Build a localization word. Fields wider than their slot are masked.
    #[must_use]
    pub const fn pack(&self, address_size: AddressSize) -> u32 {
        let bits = address_size.bits();
        let population = match self.population {
            Population::Mso => 0,
            Population::Lso => 1,
        };
        (1 << (bits - 1))
            | (population << (bits - 2))
            | ((self.neuron_id & NEURON_ID_MASK) << (bits - 8))
            | ((self.channel & CHANNEL_MASK) << 1)
    }
}

/// Decode a dual-model recording into audio and localization streams.
///
/// Localization events whose neuron id or channel fall outside `bounds` are
/// dropped and counted.
#[must_use]
pub fn decode_localization(
    bytes: &[u8],
    address_size: AddressSize,
    bounds: &LocalizationConfig,
) -> LocalizationDecode {
    decode_localization_with_report(bytes, address_size, bounds).0
}

/// Localization decode that also returns framing facts.
#[must_use]
pub fn decode_localization_with_report(
    bytes: &[u8],
    address_size: AddressSize,
    bounds: &LocalizationConfig,
) -> (LocalizationDecode, DecodeReport) {
    let (iter, report) = records(bytes, address_size);
    let mut out = LocalizationDecode::default();

    for (word, timestamp) in iter {
        let timestamp = i64::from(timestamp);
        if !LocalizationWord::is_localization(word, address_size) {
            out.audio.push(SpikeEvent::new(i64::from(word), timestamp));
            continue;
        }
        let fields = LocalizationWord::unpack(word, address_size);
        route_localization_event(
            &mut out,
            bounds,
            fields.population,
            i64::from(fields.neuron_id),
            i64::from(fields.channel),
            timestamp,
        );
    }
    (out, report)
}

/// Append a localization event or count it as dropped.
pub(crate) fn route_localization_event(
    out: &mut LocalizationDecode,
    bounds: &LocalizationConfig,
    population: Population,
    neuron_id: i64,
    channel: i64,
    timestamp: i64,
) {
    let limits = bounds.bounds(population);
    if limits.contains_neuron(neuron_id) && limits.contains_channel(channel) {
        out.localization.population_mut(population).push(neuron_id, channel, timestamp);
    } else {
        match population {
            Population::Mso => out.dropped.mso += 1,
            Population::Lso => out.dropped.lso += 1,
        }
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Encode a stream of microsecond timestamps as AEDAT records.
///
/// Each timestamp is written as `floor(ts / timestamp_tick)` raw ticks.
///
/// # Errors
///
/// Returns [`UsageError::AddressOutOfRange`] for an address that does not fit
/// the configured width and [`UsageError::TimestampOutOfRange`] for a tick
/// count outside `u32`.
pub fn encode(stream: &SpikeStream, config: &RecordingConfig) -> Result<Vec<u8>> {
    let size = config.address_size;
    let mut out = Vec::with_capacity(stream.len() * size.record_size());

    for event in stream.iter() {
        if event.address < 0 || event.address > size.max_address() {
            return Err(UsageError::AddressOutOfRange {
                operation: "encode_aedat",
                address: event.address,
                limit: (size.max_address() + 1) as usize,
            }
            .into());
        }
        let ticks = micros_to_ticks(event.timestamp, config.timestamp_tick);
        let ticks = u32::try_from(ticks).map_err(|_| UsageError::TimestampOutOfRange {
            operation: "encode_aedat",
            timestamp: event.timestamp,
        })?;

        match size {
            AddressSize::Two => out.extend_from_slice(&(event.address as u16).to_be_bytes()),
            AddressSize::Four => out.extend_from_slice(&(event.address as u32).to_be_bytes()),
        }
        out.extend_from_slice(&ticks.to_be_bytes());
    }
    Ok(out)
}

/// [`StreamEncoder`] for [`OutputFormat::Aedat`].
#[derive(Copy, Clone, Debug, Default)]
pub struct AedatEncoder;

impl StreamEncoder for AedatEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Aedat
    }

    fn encode(&self, stream: &SpikeStream, config: &RecordingConfig) -> Result<Encoded> {
        encode(stream, config).map(Encoded::Single)
    }
}

// ============================================================================
// Tests
// ============================================================================
