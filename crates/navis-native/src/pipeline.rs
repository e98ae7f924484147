//! Batch analysis pipeline
//!
//! Runs a recording through load, normalize, validate and the windowed views
//! in one call, logging each stage. Validation failures are logged and kept
//! in the result; they only abort the run when a view cannot be computed.

use std::path::Path;

use navis_core::normalize::{normalize, Normalization};
use navis_core::validate::validate;
use navis_core::views::{self, AverageActivity, DisparityMatrix};
use navis_core::{ActivityMatrix, RecordingConfig, SpikeStream, StreamSummary, ValidationReport};
use tracing::{debug, info, warn};

use crate::error::PipelineResult;
use crate::loaders::{load_any, InputFormat};

/// Everything derived from one recording.
#[derive(Clone, Debug)]
pub struct Analysis {
    /// Normalized stream
    pub stream: SpikeStream,
    /// What normalization did
    pub normalization: Normalization,
    /// Structural checks on the normalized stream
    pub validation: ValidationReport,
    /// Event count and time span
    pub summary: StreamSummary,
    /// Per-address, per-bin counts
    pub sonogram: ActivityMatrix,
    /// Per-address totals
    pub histogram: Vec<u64>,
    /// Per-ear events per bin
    pub average_activity: AverageActivity,
    /// Left/right disparity, stereo recordings only
    pub disparity: Option<DisparityMatrix>,
}

/// Run an already loaded stream through the pipeline.
///
/// Bins start at the first event, which is time 0 after a resetting
/// normalization. The stream is aggregated once and every view is reduced
/// from that sonogram.
///
/// # Errors
///
/// Fails if the stream is empty or holds addresses outside the topology.
pub fn analyze_stream(mut stream: SpikeStream, config: &RecordingConfig) -> PipelineResult<Analysis> {
    let normalization = normalize(&mut stream, config);
    debug!(?normalization, "Normalized timestamps");

    let validation = validate(&stream, config);
    if validation.is_valid() {
        debug!("Validation passed");
    } else {
        for diagnostic in validation.diagnostics() {
            warn!("{diagnostic}");
        }
    }

    let summary = stream.summary();
    info!("{summary}");

    let sonogram = views::sonogram(&stream, config, false)?;
    let histogram = sonogram.row_sums();
    let average_activity = views::average_activity_from(&sonogram, config);
    let disparity = if config.mono_stereo.is_stereo() {
        Some(views::disparity_from(&sonogram, config)?)
    } else {
        None
    };
    debug!(
        bins = sonogram.num_bins(),
        addresses = sonogram.num_addresses(),
        stereo = disparity.is_some(),
        "Computed views"
    );

    Ok(Analysis {
        stream,
        normalization,
        validation,
        summary,
        sonogram,
        histogram,
        average_activity,
        disparity,
    })
}

/// Load `path` as `format` and analyze it.
///
/// # Errors
///
/// Fails if the recording cannot be loaded or analyzed.
pub fn analyze(
    path: impl AsRef<Path>,
    format: InputFormat,
    config: &RecordingConfig,
) -> PipelineResult<Analysis> {
    let path = path.as_ref();
    info!(path = %path.display(), %format, "Analyzing recording");
    let stream = load_any(path, format, config)?;
    analyze_stream(stream, config)
}
