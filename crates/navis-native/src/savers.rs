//! File savers
//!
//! Every saver takes a base path and appends its own suffix, so one base name
//! can hold a recording in several formats side by side.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use navis_core::codec::{aedat, text};
use navis_core::{Encoded, OutputFormat, RecordingConfig, SpikeStream};
use tracing::info;

use crate::error::{SaveError, SaveResult};

/// `base` with `suffix` appended to its final component.
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Address and timestamp file names of a TXT pair rooted at `base`.
#[must_use]
pub fn txt_paths(base: &Path) -> (PathBuf, PathBuf) {
    (with_suffix(base, "_addrs.txt"), with_suffix(base, "_tss.txt"))
}

fn write_file(path: &Path, contents: &[u8]) -> SaveResult<()> {
    fs::write(path, contents).map_err(|source| SaveError::Io { path: path.to_path_buf(), source })
}

fn write_pair(base: &Path, addresses: &[u8], timestamps: &[u8]) -> SaveResult<Vec<PathBuf>> {
    let (address_path, timestamp_path) = txt_paths(base);
    write_file(&address_path, addresses)?;
    write_file(&timestamp_path, timestamps)?;
    Ok(vec![address_path, timestamp_path])
}

/// Write `<base>.aedat`.
///
/// # Errors
///
/// Fails if an address or timestamp does not fit the configured record
/// layout, or on I/O errors.
pub fn save_aedat(
    stream: &SpikeStream,
    base: impl AsRef<Path>,
    config: &RecordingConfig,
) -> SaveResult<PathBuf> {
    let path = with_suffix(base.as_ref(), ".aedat");
    write_file(&path, &aedat::encode(stream, config)?)?;
    info!(path = %path.display(), events = stream.len(), "Saved AEDAT");
    Ok(path)
}

/// Write `<base>.csv`.
///
/// # Errors
///
/// Fails on I/O errors.
pub fn save_csv(
    stream: &SpikeStream,
    base: impl AsRef<Path>,
    delimiter: &str,
) -> SaveResult<PathBuf> {
    let path = with_suffix(base.as_ref(), ".csv");
    write_file(&path, text::encode_csv(stream, delimiter).as_bytes())?;
    info!(path = %path.display(), events = stream.len(), "Saved CSV");
    Ok(path)
}

/// Write `<base>_addrs.txt` and `<base>_tss.txt` with absolute timestamps.
///
/// # Errors
///
/// Fails on I/O errors.
pub fn save_txt(stream: &SpikeStream, base: impl AsRef<Path>) -> SaveResult<Vec<PathBuf>> {
    let (addresses, timestamps) = text::encode_txt(stream);
    let paths = write_pair(base.as_ref(), addresses.as_bytes(), timestamps.as_bytes())?;
    info!(base = %base.as_ref().display(), events = stream.len(), "Saved TXT");
    Ok(paths)
}

/// Write `<base>_addrs.txt` and `<base>_tss.txt` with timestamp deltas.
///
/// # Errors
///
/// Fails on I/O errors.
pub fn save_txt_relative(stream: &SpikeStream, base: impl AsRef<Path>) -> SaveResult<Vec<PathBuf>> {
    let (addresses, timestamps) = text::encode_txt_relative(stream);
    let paths = write_pair(base.as_ref(), addresses.as_bytes(), timestamps.as_bytes())?;
    info!(base = %base.as_ref().display(), events = stream.len(), "Saved relative TXT");
    Ok(paths)
}

/// Write `stream` in `format` and return every file written.
///
/// # Errors
///
/// Fails if the encoder rejects the stream, or on I/O errors.
pub fn save_as(
    stream: &SpikeStream,
    base: impl AsRef<Path>,
    format: OutputFormat,
    config: &RecordingConfig,
) -> SaveResult<Vec<PathBuf>> {
    let base = base.as_ref();
    let paths = match format.encoder().encode(stream, config)? {
        Encoded::Single(bytes) => {
            let path = with_suffix(base, &format!(".{}", format.name()));
            write_file(&path, &bytes)?;
            vec![path]
        }
        Encoded::Split { addresses, timestamps } => write_pair(base, &addresses, &timestamps)?,
    };
    info!(base = %base.display(), %format, files = paths.len(), "Saved recording");
    Ok(paths)
}
