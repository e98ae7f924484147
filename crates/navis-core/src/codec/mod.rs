//! Byte and text codecs for spike streams
//!
//! - [`aedat`]: fixed-width big-endian binary records behind an optional `#` header
//! - [`text`]: CSV, split TXT, relative-timestamp TXT and ZynqGrabber lines
//!
//! Encoding is dispatched through [`OutputFormat::encoder`], a closed table
//! from format to [`StreamEncoder`] implementation.

pub mod aedat;
pub mod text;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::RecordingConfig;
use crate::error::{ConfigError, Diagnostic, ErrorKind, Result};
use crate::types::{LocalizationStream, SpikeStream};

// ============================================================================
// Localization Decode Output
// ============================================================================

/// Localization events discarded for failing their range checks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedEvents {
    /// Dropped MSO events
    pub mso: usize,
    /// Dropped LSO events
    pub lso: usize,
}

impl DroppedEvents {
    /// Total dropped events.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.mso + self.lso
    }

    /// Aggregate warning for dropped localization events, if any.
    #[must_use]
    pub fn warning(&self) -> Option<Diagnostic> {
        (self.total() > 0).then(|| {
            Diagnostic::new(
                "Localization",
                "decode",
                ErrorKind::DroppedEvent,
                format!("dropped {} MSO and {} LSO events out of range", self.mso, self.lso),
            )
        })
    }
}

/// Audio and localization streams decoded from one dual-model recording.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalizationDecode {
    /// Auditory-model events
    pub audio: SpikeStream,
    /// MSO and LSO events that passed their range checks
    pub localization: LocalizationStream,
    /// Per-population drop counts
    pub dropped: DroppedEvents,
    /// Text lines that did not match the layout (always 0 for binary input)
    pub skipped_lines: usize,
}

// ============================================================================
// Output Formats
// ============================================================================

/// Serialization targets for a spike stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Binary AEDAT
    Aedat,
    /// `address,timestamp` lines
    Csv,
    /// Split `_addrs.txt` / `_tss.txt` files
    Txt,
    /// Split files with timestamps relative to the previous event
    TxtRelative,
}

impl OutputFormat {
    /// Every format in dispatch-table order.
    pub const ALL: [Self; 4] = [Self::Aedat, Self::Csv, Self::Txt, Self::TxtRelative];

    /// Canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aedat => "aedat",
            Self::Csv => "csv",
            Self::Txt => "txt",
            Self::TxtRelative => "txt_rel",
        }
    }

    /// Encoder implementing this format.
    #[must_use]
    pub fn encoder(self) -> &'static dyn StreamEncoder {
        match self {
            Self::Aedat => &aedat::AedatEncoder,
            Self::Csv => &text::CsvEncoder,
            Self::Txt => &text::TxtEncoder,
            Self::TxtRelative => &text::TxtRelativeEncoder,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match name.as_str() {
            "aedat" => Ok(Self::Aedat),
            "csv" => Ok(Self::Csv),
            "txt" => Ok(Self::Txt),
            "txt_rel" | "txt-rel" | "txt_relative" | "txt-relative" => Ok(Self::TxtRelative),
            _ => Err(ConfigError::UnknownFormat { name: s.to_string() }),
        }
    }
}

// ============================================================================
// Encoder Dispatch
// ============================================================================

/// Encoded representation of a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Encoded {
    /// One output file
    Single(Vec<u8>),
    /// Separate address and timestamp files
    Split {
        /// Address file contents
        addresses: Vec<u8>,
        /// Timestamp file contents
        timestamps: Vec<u8>,
    },
}

/// A serializer for one [`OutputFormat`].
pub trait StreamEncoder: Sync {
    /// Format implemented by this encoder.
    fn format(&self) -> OutputFormat;

    /// Encode `stream` under `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in the format.
    fn encode(&self, stream: &SpikeStream, config: &RecordingConfig) -> Result<Encoded>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_aliases() {
        for alias in ["aedat", ".aedat", "AEDAT", ".AEDAT"] {
            assert_eq!(alias.parse::<OutputFormat>().unwrap(), OutputFormat::Aedat);
        }
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!(".txt".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert_eq!("txt_rel".parse::<OutputFormat>().unwrap(), OutputFormat::TxtRelative);
        assert!(matches!(
            "wav".parse::<OutputFormat>(),
            Err(ConfigError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_dispatch_table_is_consistent() {
        for format in OutputFormat::ALL {
            assert_eq!(format.encoder().format(), format);
            assert_eq!(format.name().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_dispatch_selects_matching_encoder() {
        let stream = SpikeStream::new(vec![1, 2], vec![0, 10]).unwrap();
        let config = RecordingConfig::builder(4).timestamp_tick(1.0).build().unwrap();

        let aedat = OutputFormat::Aedat.encoder().encode(&stream, &config).unwrap();
        assert!(matches!(aedat, Encoded::Single(ref bytes) if bytes.len() == 12));

        let txt = OutputFormat::Txt.encoder().encode(&stream, &config).unwrap();
        assert!(matches!(txt, Encoded::Split { .. }));
    }
}
