//! JSON configuration files
//!
//! Deserialization skips the validated constructors, so every loader here
//! calls `validate()` before handing the record out.

use std::fs;
use std::path::Path;

use navis_core::{LocalizationConfig, RecordingConfig};
use tracing::debug;

use crate::error::{LoadError, LoadResult};

fn read_json(path: &Path) -> LoadResult<String> {
    fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })
}

/// Parse and validate a [`RecordingConfig`] from JSON text.
///
/// # Errors
///
/// Returns [`LoadError::Json`] or [`LoadError::Config`].
pub fn parse_recording_config(json: &str) -> LoadResult<RecordingConfig> {
    let config: RecordingConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Parse and validate a [`LocalizationConfig`] from JSON text.
///
/// # Errors
///
/// Returns [`LoadError::Json`] or [`LoadError::Config`].
pub fn parse_localization_config(json: &str) -> LoadResult<LocalizationConfig> {
    let config: LocalizationConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load a [`RecordingConfig`] from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_recording_config(path: impl AsRef<Path>) -> LoadResult<RecordingConfig> {
    let path = path.as_ref();
    let config = parse_recording_config(&read_json(path)?)?;
    debug!(path = %path.display(), ?config, "Loaded recording config");
    Ok(config)
}

/// Load a [`LocalizationConfig`] from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_localization_config(path: impl AsRef<Path>) -> LoadResult<LocalizationConfig> {
    let path = path.as_ref();
    let config = parse_localization_config(&read_json(path)?)?;
    debug!(path = %path.display(), ?config, "Loaded localization config");
    Ok(config)
}
