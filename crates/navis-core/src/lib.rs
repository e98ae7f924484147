//! NAVIS Core - event-stream processing for neuromorphic auditory sensors
//!
//! This crate provides the data model, codecs and analysis algorithms for
//! Address-Event Representation (AEDAT) recordings. It works on byte slices
//! and in-memory streams only; file access lives in `navis-native`.
//!
//! # Modules
//!
//! - [`types`]: Spike streams, localization sub-streams, ear and population selectors
//! - [`config`]: Recording and localization configuration
//! - [`error`]: Error taxonomy and tagged diagnostics
//! - [`codec`]: AEDAT binary and text codecs, output-format dispatch
//! - [`normalize`]: Tick scaling and zero-basing of timestamps
//! - [`validate`]: Structural checks reported as independent booleans
//! - [`aggregate`]: The fixed-width windowed aggregator
//! - [`views`]: Sonogram, histogram, average activity, disparity, MSO views
//! - [`transform`]: Phase lock, mono/stereo, extraction, time split, noise segmenter
//! - [`generate`]: Synthetic sweep, shift and random streams
//!
//! # Example
//!
//! ```rust
//! use navis_core::codec::aedat;
//! use navis_core::config::{MonoStereo, RecordingConfig};
//! use navis_core::{normalize, validate, views};
//!
//! let config = RecordingConfig::new(2, MonoStereo::Mono).unwrap();
//!
//! // Two records: address 1 at tick 0, address 2 at tick 100000
//! let bytes = [0, 1, 0, 0, 0, 0, 0, 2, 0, 1, 0x86, 0xA0];
//! let mut stream = aedat::decode(&bytes, config.address_size);
//! normalize::normalize(&mut stream, &config);
//! assert_eq!(stream.timestamps(), &[0, 20_000]);
//!
//! assert!(validate::validate(&stream, &config).is_valid());
//! let sonogram = views::sonogram(&stream, &config, true).unwrap();
//! assert_eq!(sonogram.total(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod aggregate;
pub mod codec;
pub mod config;
pub mod error;
pub mod generate;
pub mod normalize;
pub mod transform;
pub mod types;
pub mod validate;
pub mod views;

// Re-export commonly used types at crate root
pub use aggregate::{aggregate, ActivityMatrix, WindowedAggregator};
pub use codec::{DroppedEvents, Encoded, LocalizationDecode, OutputFormat, StreamEncoder};
pub use config::{
    AddressSize, LocalizationConfig, MonoStereo, OnOffBoth, PopulationBounds, RecordingConfig,
};
pub use error::{
    ConfigError, Diagnostic, Error, ErrorKind, Result, StreamError, UsageError, ValidationError,
};
pub use normalize::Normalization;
pub use transform::PhaseLockMode;
pub use types::{
    LocalizationStream, Population, PopulationStream, Side, SpikeEvent, SpikeStream,
    StreamSummary, TimestampBounds,
};
pub use validate::{LocalizationReport, ValidationReport};
