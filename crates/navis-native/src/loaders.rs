//! File loaders
//!
//! Thin wrappers that read a file, hand the bytes or text to the matching
//! `navis_core::codec` decoder and log what the decoder reports. Loaders return
//! raw timestamps; call `navis_core::normalize` afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use navis_native::loaders::load_aedat;
//!
//! let mut stream = load_aedat("recording.aedat", &config)?;
//! navis_core::normalize::normalize(&mut stream, &config);
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use navis_core::codec::{aedat, text, LocalizationDecode};
use navis_core::{ConfigError, LocalizationConfig, RecordingConfig, SpikeStream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::savers::txt_paths;

// ============================================================================
// Input Formats
// ============================================================================

/// On-disk layout of a recording.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// Binary AEDAT
    Aedat,
    /// `address,timestamp` rows
    Csv,
    /// `<base>_addrs.txt` and `<base>_tss.txt`
    Txt,
    /// As [`InputFormat::Txt`] with timestamps stored as deltas
    TxtRelative,
}

impl InputFormat {
    /// Infer the format from a file extension.
    ///
    /// A path ending in `_addrs.txt` or `_tss.txt` is taken as one half of a
    /// TXT pair.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "aedat" => Some(Self::Aedat),
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aedat => "aedat",
            Self::Csv => "csv",
            Self::Txt => "txt",
            Self::TxtRelative => "txt_rel",
        })
    }
}

impl FromStr for InputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Output and input formats share their names.
        Ok(match s.parse::<navis_core::OutputFormat>()? {
            navis_core::OutputFormat::Aedat => Self::Aedat,
            navis_core::OutputFormat::Csv => Self::Csv,
            navis_core::OutputFormat::Txt => Self::Txt,
            navis_core::OutputFormat::TxtRelative => Self::TxtRelative,
        })
    }
}

// ============================================================================
// File Access
// ============================================================================

fn read_bytes(path: &Path) -> LoadResult<Vec<u8>> {
    let bytes =
        fs::read(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

fn read_text(path: &Path) -> LoadResult<String> {
    String::from_utf8(read_bytes(path)?).map_err(|_| LoadError::NotText { path: path.to_path_buf() })
}

fn log_report(path: &Path, report: &aedat::DecodeReport) {
    debug!(
        path = %path.display(),
        header_len = report.header_len,
        records = report.records,
        "Decoded AEDAT"
    );
    if let Some(diagnostic) = report.truncation_warning() {
        warn!(path = %path.display(), "{diagnostic}");
    }
}

fn log_text(path: &Path, decoded: &text::TextDecode, operation: &'static str) {
    info!(path = %path.display(), events = decoded.stream.len(), "Loaded {operation}");
    if let Some(diagnostic) = decoded.warning(operation) {
        warn!(path = %path.display(), "{diagnostic}");
    }
}

fn log_localization(path: &Path, decoded: &LocalizationDecode) {
    info!(
        path = %path.display(),
        audio = decoded.audio.len(),
        mso = decoded.localization.mso.len(),
        lso = decoded.localization.lso.len(),
        "Loaded dual-model recording"
    );
    if let Some(diagnostic) = decoded.dropped.warning() {
        warn!(path = %path.display(), "{diagnostic}");
    }
    if decoded.skipped_lines > 0 {
        warn!(path = %path.display(), skipped = decoded.skipped_lines, "Skipped malformed lines");
    }
}

// ============================================================================
// Loaders
// ============================================================================

/// Load a binary AEDAT recording.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file cannot be read.
pub fn load_aedat(path: impl AsRef<Path>, config: &RecordingConfig) -> LoadResult<SpikeStream> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    let (stream, report) = aedat::decode_with_report(&bytes, config.address_size);
    log_report(path, &report);
    info!(path = %path.display(), events = stream.len(), "Loaded AEDAT");
    Ok(stream)
}

/// Load a binary AEDAT recording holding auditory and localization events.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file cannot be read.
pub fn load_aedat_localization(
    path: impl AsRef<Path>,
    config: &RecordingConfig,
    bounds: &LocalizationConfig,
) -> LoadResult<LocalizationDecode> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    let (decoded, report) = aedat::decode_localization_with_report(&bytes, config.address_size, bounds);
    log_report(path, &report);
    log_localization(path, &decoded);
    Ok(decoded)
}

/// Load `address<delimiter>timestamp` rows.
///
/// # Errors
///
/// Returns an error if the file cannot be read as text.
pub fn load_csv(path: impl AsRef<Path>, delimiter: &str) -> LoadResult<SpikeStream> {
    let path = path.as_ref();
    let decoded = text::decode_csv(&read_text(path)?, delimiter);
    log_text(path, &decoded, "decode_csv");
    Ok(decoded.stream)
}

/// Load five-column CSV rows carrying audio and localization events.
///
/// # Errors
///
/// Returns an error if the file cannot be read as text.
pub fn load_csv_localization(
    path: impl AsRef<Path>,
    delimiter: &str,
    bounds: &LocalizationConfig,
) -> LoadResult<LocalizationDecode> {
    let path = path.as_ref();
    let decoded = text::decode_csv_localization(&read_text(path)?, delimiter, bounds);
    log_localization(path, &decoded);
    Ok(decoded)
}

/// Load a pair of address and absolute-timestamp text files.
///
/// # Errors
///
/// Returns an error if either file cannot be read as text.
pub fn load_txt(
    addresses: impl AsRef<Path>,
    timestamps: impl AsRef<Path>,
) -> LoadResult<SpikeStream> {
    let addresses = addresses.as_ref();
    let decoded = text::decode_txt(&read_text(addresses)?, &read_text(timestamps.as_ref())?);
    log_text(addresses, &decoded, "decode_txt");
    Ok(decoded.stream)
}

/// Load a pair of address and delta-timestamp text files.
///
/// # Errors
///
/// Returns an error if either file cannot be read as text.
pub fn load_txt_relative(
    addresses: impl AsRef<Path>,
    timestamps: impl AsRef<Path>,
) -> LoadResult<SpikeStream> {
    let addresses = addresses.as_ref();
    let decoded =
        text::decode_txt_relative(&read_text(addresses)?, &read_text(timestamps.as_ref())?);
    log_text(addresses, &decoded, "decode_txt_relative");
    Ok(decoded.stream)
}

/// Load a ZynqGrabber text dump.
///
/// # Errors
///
/// Returns an error if the file cannot be read as text.
pub fn load_zynq_grabber(
    path: impl AsRef<Path>,
    config: &RecordingConfig,
    bounds: &LocalizationConfig,
) -> LoadResult<LocalizationDecode> {
    let path = path.as_ref();
    let decoded = text::decode_zynq_grabber(&read_text(path)?, config, bounds);
    log_localization(path, &decoded);
    Ok(decoded)
}

/// Resolve the two files of a TXT recording.
///
/// `path` may be the shared base name or either file of the pair.
#[must_use]
pub fn resolve_txt_pair(path: &Path) -> (PathBuf, PathBuf) {
    let name = path.to_string_lossy();
    let base = name
        .strip_suffix("_addrs.txt")
        .or_else(|| name.strip_suffix("_tss.txt"))
        .unwrap_or(&*name);
    txt_paths(Path::new(base))
}

/// Load an auditory recording in any single-stream format.
///
/// CSV input uses the `","` delimiter.
///
/// # Errors
///
/// Returns an error if the files cannot be read.
pub fn load_any(
    path: impl AsRef<Path>,
    format: InputFormat,
    config: &RecordingConfig,
) -> LoadResult<SpikeStream> {
    let path = path.as_ref();
    debug!(path = %path.display(), %format, "Loading recording");
    match format {
        InputFormat::Aedat => load_aedat(path, config),
        InputFormat::Csv => load_csv(path, text::DEFAULT_DELIMITER),
        InputFormat::Txt => {
            let (addresses, timestamps) = resolve_txt_pair(path);
            load_txt(addresses, timestamps)
        }
        InputFormat::TxtRelative => {
            let (addresses, timestamps) = resolve_txt_pair(path);
            load_txt_relative(addresses, timestamps)
        }
    }
}

/// [`load_any`] with the format inferred by [`InputFormat::from_path`].
///
/// # Errors
///
/// Returns [`LoadError::UnknownFormat`] if the extension is not recognized.
pub fn load_inferred(path: impl AsRef<Path>, config: &RecordingConfig) -> LoadResult<SpikeStream> {
    let path = path.as_ref();
    let format = InputFormat::from_path(path)
        .ok_or_else(|| LoadError::UnknownFormat { path: path.to_path_buf() })?;
    load_any(path, format, config)
}
